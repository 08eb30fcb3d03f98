// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Public exchange-rate endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::rates::RateSnapshot;
use crate::state::AppState;

/// Query params for the rate endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RateQuery {
    /// Bypass the cache and refetch both legs.
    #[serde(default)]
    pub refresh: bool,
}

/// Current WLD buy rate in COP.
///
/// Always answers: a failed refresh degrades to cached, stale, or
/// fallback data rather than an error.
#[utoipa::path(
    get,
    path = "/v1/rate",
    tag = "Rates",
    params(RateQuery),
    responses(
        (status = 200, description = "Current rate snapshot", body = RateSnapshot)
    )
)]
pub async fn get_rate(
    State(state): State<AppState>,
    Query(query): Query<RateQuery>,
) -> Json<RateSnapshot> {
    Json(state.rates.get_rate(query.refresh).await)
}
