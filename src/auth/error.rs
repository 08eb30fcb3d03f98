// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Authorization failure type.

use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Why a session token was rejected.
///
/// All variants map to 403: privileged operations answer not-authorized
/// uniformly, without leaking which check failed beyond the message.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingAuthHeader,

    #[error("invalid Authorization header")]
    InvalidAuthHeader,

    #[error("malformed session token")]
    MalformedToken,

    #[error("session token expired")]
    TokenExpired,

    #[error("invalid session token signature")]
    InvalidSignature,

    #[error("session token lacks the required role")]
    WrongRole,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::forbidden(self.to_string()).into_response()
    }
}
