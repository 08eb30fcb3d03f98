// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! World ID proof-of-personhood verification.
//!
//! The verification protocol itself is opaque to this service: a proof
//! payload goes to the World ID developer-portal verifier, which answers
//! verified or not. The nullifier hash from a verified proof is the
//! identity handle that links all orders from one person.
//!
//! Simulation mode (explicit `SIMULATION` config flag, never inferred from
//! the environment) accepts structurally complete proofs without a network
//! call, for local development and tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::ApiError;

/// Timeout for calls to the verifier.
const VERIFIER_TIMEOUT: Duration = Duration::from_secs(3);

/// World ID proof payload as submitted by the client.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProofPayload {
    /// One-time-use identity handle from the proof.
    pub nullifier_hash: String,
    /// Merkle root of the identity set the proof was generated against.
    pub merkle_root: String,
    /// The zero-knowledge proof blob.
    pub proof: String,
    /// Verification level the proof asserts (`orb` or `device`).
    #[serde(default = "default_verification_level")]
    pub verification_level: String,
}

fn default_verification_level() -> String {
    "orb".to_string()
}

/// A successfully verified identity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifiedIdentity {
    /// Opaque identity handle linking this person's orders.
    pub nullifier: String,
    /// Verification level confirmed by the verifier.
    pub verification_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid identity proof: {0}")]
    InvalidProof(String),

    #[error("identity verifier is not configured (set WORLD_APP_ID)")]
    NotConfigured,

    #[error("identity verifier unreachable: {0}")]
    Unreachable(String),
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidProof(_) => ApiError::bad_request(err.to_string()),
            VerifyError::NotConfigured => ApiError::internal(err.to_string()),
            VerifyError::Unreachable(_) => ApiError::service_unavailable(err.to_string()),
        }
    }
}

enum VerifierMode {
    /// Accept structurally complete proofs without a network call.
    Simulation,
    /// No app id configured; verification always fails with a server error.
    Unconfigured,
    /// Verify against the World ID developer portal.
    WorldId {
        client: reqwest::Client,
        base_url: String,
        app_id: String,
        action: String,
    },
}

/// Client for the external identity verification gateway.
pub struct IdentityVerifier {
    mode: VerifierMode,
}

impl IdentityVerifier {
    pub fn from_config(config: &Config) -> Self {
        let mode = if config.simulation {
            VerifierMode::Simulation
        } else if let Some(app_id) = config.world_app_id.clone() {
            let client = reqwest::Client::builder()
                .timeout(VERIFIER_TIMEOUT)
                .build()
                .unwrap_or_default();
            VerifierMode::WorldId {
                client,
                base_url: config.verifier_url.trim_end_matches('/').to_string(),
                app_id,
                action: config.world_action.clone(),
            }
        } else {
            VerifierMode::Unconfigured
        };
        Self { mode }
    }

    /// Verify a proof and return the verified identity handle.
    pub async fn verify(&self, proof: &ProofPayload) -> Result<VerifiedIdentity, VerifyError> {
        if proof.nullifier_hash.trim().is_empty()
            || proof.merkle_root.trim().is_empty()
            || proof.proof.trim().is_empty()
        {
            return Err(VerifyError::InvalidProof("incomplete proof payload".to_string()));
        }

        match &self.mode {
            VerifierMode::Simulation => Ok(VerifiedIdentity {
                nullifier: proof.nullifier_hash.clone(),
                verification_level: proof.verification_level.clone(),
            }),
            VerifierMode::Unconfigured => Err(VerifyError::NotConfigured),
            VerifierMode::WorldId {
                client,
                base_url,
                app_id,
                action,
            } => {
                let url = format!("{base_url}/api/v2/verify/{app_id}");
                let response = client
                    .post(&url)
                    .json(&json!({
                        "nullifier_hash": proof.nullifier_hash,
                        "merkle_root": proof.merkle_root,
                        "proof": proof.proof,
                        "verification_level": proof.verification_level,
                        "action": action,
                    }))
                    .send()
                    .await
                    .map_err(|e| VerifyError::Unreachable(e.to_string()))?;

                if response.status().is_success() {
                    Ok(VerifiedIdentity {
                        nullifier: proof.nullifier_hash.clone(),
                        verification_level: proof.verification_level.clone(),
                    })
                } else if response.status().is_client_error() {
                    let detail = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "proof rejected".to_string());
                    warn!(detail = %detail, "identity proof rejected by verifier");
                    Err(VerifyError::InvalidProof(detail))
                } else {
                    Err(VerifyError::Unreachable(format!(
                        "verifier returned {}",
                        response.status()
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof(nullifier: &str) -> ProofPayload {
        ProofPayload {
            nullifier_hash: nullifier.to_string(),
            merkle_root: "0xroot".to_string(),
            proof: "0xproof".to_string(),
            verification_level: "orb".to_string(),
        }
    }

    fn simulation_verifier() -> IdentityVerifier {
        IdentityVerifier::from_config(&Config::for_tests())
    }

    #[tokio::test]
    async fn simulation_mode_accepts_complete_proofs() {
        let verifier = simulation_verifier();
        let identity = verifier.verify(&proof("0xn1")).await.unwrap();
        assert_eq!(identity.nullifier, "0xn1");
        assert_eq!(identity.verification_level, "orb");
    }

    #[tokio::test]
    async fn incomplete_proof_is_rejected_even_in_simulation() {
        let verifier = simulation_verifier();

        let mut p = proof("0xn1");
        p.merkle_root = String::new();
        assert!(matches!(
            verifier.verify(&p).await,
            Err(VerifyError::InvalidProof(_))
        ));

        let mut p = proof("  ");
        p.nullifier_hash = "  ".to_string();
        assert!(matches!(
            verifier.verify(&p).await,
            Err(VerifyError::InvalidProof(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_verifier_fails_closed() {
        let mut config = Config::for_tests();
        config.simulation = false;
        config.world_app_id = None;
        let verifier = IdentityVerifier::from_config(&config);

        assert!(matches!(
            verifier.verify(&proof("0xn1")).await,
            Err(VerifyError::NotConfigured)
        ));
    }
}
