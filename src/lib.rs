// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Order-tracking backend for a peer-to-peer WLD to COP exchange.
//!
//! Users prove personhood with World ID, get a quoted rate for selling WLD,
//! and create payout orders against Colombian bank rails. Operators drive
//! each order through its lifecycle from an admin dashboard.

pub mod api;
pub mod auth;
pub mod chain;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod orders;
pub mod rates;
pub mod state;
pub mod store;
