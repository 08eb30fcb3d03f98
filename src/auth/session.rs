// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Signed admin session tokens.
//!
//! HS256 JWTs with a `role` claim, issued after PIN verification and
//! validated on every privileged request. The PIN itself is never carried
//! past login.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Role claim value required for privileged operations.
pub const ADMIN_ROLE: &str = "admin";

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

/// A validated admin session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub subject: String,
    pub expires_at: i64,
}

/// Session token issuing and verification keys.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issue a signed admin session token.
    ///
    /// Returns the token and its expiry as a Unix timestamp.
    pub fn issue_admin(&self) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let exp = now + self.ttl.as_secs() as i64;
        let claims = SessionClaims {
            sub: "admin".to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, exp))
    }

    /// Validate a session token and its role claim.
    pub fn verify(&self, token: &str) -> Result<AdminSession, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }
        })?;

        if data.claims.role != ADMIN_ROLE {
            return Err(AuthError::WrongRole);
        }

        Ok(AdminSession {
            subject: data.claims.sub,
            expires_at: data.claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("test-signing-key", Duration::from_secs(3600))
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys();
        let (token, exp) = keys.issue_admin().unwrap();

        let session = keys.verify(&token).unwrap();
        assert_eq!(session.subject, "admin");
        assert_eq!(session.expires_at, exp);
        assert!(exp > Utc::now().timestamp());
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let (token, _) = keys().issue_admin().unwrap();
        let other = SessionKeys::new("different-key", Duration::from_secs(3600));

        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // TTL in the past beyond the leeway window.
        let keys = SessionKeys::new("test-signing-key", Duration::ZERO);
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "admin".to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();

        assert!(matches!(keys.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn wrong_role_is_rejected() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "someone".to_string(),
            role: "viewer".to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).unwrap();

        assert!(matches!(keys.verify(&token), Err(AuthError::WrongRole)));
    }

    #[test]
    fn garbage_token_is_malformed() {
        assert!(matches!(
            keys().verify("not-a-jwt"),
            Err(AuthError::MalformedToken)
        ));
    }
}
