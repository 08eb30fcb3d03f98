// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Public order endpoints: creation, lookup, and per-identity listing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::identity::ProofPayload;
use crate::models::Order;
use crate::orders::CreateOrderInput;
use crate::state::AppState;

/// Request body for creating an exchange order.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Payout rail (`nequi`, `daviplata`, or `bancolombia`).
    pub bank: String,
    /// Account holder name at the payout rail.
    pub account_holder: String,
    /// Account number at the payout rail.
    pub account_number: String,
    /// WLD amount the user is selling.
    pub amount_wld: f64,
    /// COP amount the user expects to receive.
    pub amount_cop: f64,
    /// World ID proof; verified before the order is accepted.
    pub identity_proof: ProofPayload,
}

/// List response for orders.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderListResponse {
    /// Orders, newest first.
    pub orders: Vec<Order>,
    /// Total count.
    pub total: usize,
}

/// Query params for listing orders.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct OrderListQuery {
    /// Identity handle whose orders to list.
    pub identity: Option<String>,
    /// Only orders created at or after this timestamp.
    pub since: Option<DateTime<Utc>>,
}

/// Create an exchange order.
///
/// The carried identity proof is verified first; the order is recorded
/// against the proof's nullifier.
#[utoipa::path(
    post,
    path = "/v1/orders",
    tag = "Orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = Order),
        (status = 400, description = "Invalid bank, amount, or identity proof"),
        (status = 429, description = "Daily order limit reached"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let identity = state.verifier.verify(&request.identity_proof).await?;

    let input = CreateOrderInput {
        bank: request.bank,
        account_holder: request.account_holder,
        account_number: request.account_number,
        amount_wld: request.amount_wld,
        amount_cop: request.amount_cop,
    };

    let order = state.lifecycle.create_order(&identity, &input)?;
    Ok(Json(order))
}

/// Get one order by id.
#[utoipa::path(
    get,
    path = "/v1/orders/{id}",
    tag = "Orders",
    params(
        ("id" = u64, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Order details", body = Order),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .store
        .get(id)
        .map_err(|e| match e {
            crate::store::StoreError::NotFound(id) => {
                ApiError::not_found(format!("order {id} not found"))
            }
            other => ApiError::internal("order storage failure").with_detail(other.to_string()),
        })?;
    Ok(Json(order))
}

/// List orders for an identity, newest first.
#[utoipa::path(
    get,
    path = "/v1/orders",
    tag = "Orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders for the identity", body = OrderListResponse),
        (status = 400, description = "Missing identity parameter")
    )
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let identity = query
        .identity
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .ok_or_else(|| ApiError::bad_request("`identity` query parameter is required"))?;

    let orders = state
        .store
        .list_by_identity(identity, query.since)
        .map_err(|e| ApiError::internal("order storage failure").with_detail(e.to_string()))?;

    Ok(Json(OrderListResponse {
        total: orders.len(),
        orders,
    }))
}
