// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Axum extractor for admin-only endpoints.
//!
//! Use the `AdminOnly` extractor in handlers to require a valid admin
//! session token:
//!
//! ```rust,ignore
//! async fn list_all_orders(AdminOnly(session): AdminOnly) -> impl IntoResponse {
//!     // session is a validated AdminSession
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::error::AuthError;
use super::session::AdminSession;
use crate::state::AppState;

/// Extractor that rejects requests lacking a valid admin session token.
pub struct AdminOnly(pub AdminSession);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let session = state.sessions.verify(token)?;
        Ok(AdminOnly(session))
    }
}
