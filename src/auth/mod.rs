// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Admin authentication and authorization.
//!
//! A static PIN is exchanged at login for a signed, time-limited session
//! token carrying an administrative role claim. Every privileged endpoint
//! validates the token through the [`AdminOnly`] extractor; missing,
//! malformed, expired, or wrong-role tokens reject the request with 403 and
//! never crash the handler.

pub mod error;
pub mod extractor;
pub mod session;

pub use error::AuthError;
pub use extractor::AdminOnly;
pub use session::{AdminSession, SessionKeys, ADMIN_ROLE};
