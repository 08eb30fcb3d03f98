// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! World ID proof verification endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::identity::ProofPayload;
use crate::state::AppState;

/// Request body for identity verification.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyIdentityRequest {
    /// The World ID proof to verify.
    #[serde(flatten)]
    pub proof: ProofPayload,
    /// Optional wallet address to link to this identity for balance lookups.
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Response for a successful verification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifyIdentityResponse {
    pub verified: bool,
    /// Opaque identity handle carried on subsequent order requests.
    pub nullifier: String,
    pub verification_level: String,
    /// Wallet address linked to this identity, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_wallet: Option<String>,
}

/// Verify a World ID proof of personhood.
#[utoipa::path(
    post,
    path = "/v1/identity/verify",
    tag = "Identity",
    request_body = VerifyIdentityRequest,
    responses(
        (status = 200, description = "Proof verified", body = VerifyIdentityResponse),
        (status = 400, description = "Invalid or incomplete proof"),
        (status = 500, description = "Verifier misconfigured"),
        (status = 503, description = "Verifier unreachable")
    )
)]
pub async fn verify_identity(
    State(state): State<AppState>,
    Json(request): Json<VerifyIdentityRequest>,
) -> Result<Json<VerifyIdentityResponse>, ApiError> {
    let identity = state.verifier.verify(&request.proof).await?;

    let linked_wallet = match request
        .wallet_address
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
    {
        Some(wallet) => {
            state
                .store
                .link_identity(&identity.nullifier, wallet)
                .map_err(|e| ApiError::internal("failed to link wallet").with_detail(e.to_string()))?;
            Some(wallet.to_string())
        }
        None => state.store.wallet_for_identity(&identity.nullifier).map_err(|e| {
            ApiError::internal("failed to load linked wallet").with_detail(e.to_string())
        })?,
    };

    info!(verification_level = %identity.verification_level, "identity verified");
    Ok(Json(VerifyIdentityResponse {
        verified: true,
        nullifier: identity.nullifier,
        verification_level: identity.verification_level,
        linked_wallet,
    }))
}
