// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Operator endpoints: login, full order listing, stats, and status changes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use super::orders::OrderListResponse;
use crate::auth::AdminOnly;
use crate::error::ApiError;
use crate::models::OrderStatus;
use crate::orders::StatusChange;
use crate::state::AppState;

/// Request body for admin login.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Operator PIN.
    pub pin: String,
}

/// Session token returned on successful login.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for subsequent admin requests.
    pub token: String,
    /// Token expiry as a Unix timestamp.
    pub expires_at: i64,
}

/// Request body for an order status change.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status (`pending`, `sent`, `asset_received`, `paid`, `rejected`).
    pub status: String,
    /// On-chain transaction hash of the WLD transfer, where known.
    #[serde(default)]
    pub onchain_reference: Option<String>,
    /// Allow a transition outside the default table. Logged as an anomaly.
    #[serde(default)]
    pub force: bool,
}

/// Per-status order counts.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct StatusCounts {
    pub pending: usize,
    pub sent: usize,
    pub asset_received: usize,
    pub paid: usize,
    pub rejected: usize,
}

/// Aggregate stats for the admin dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminStatsResponse {
    pub total_orders: usize,
    pub by_status: StatusCounts,
    /// Sum of WLD across non-rejected orders.
    pub total_wld: f64,
    /// Sum of COP across non-rejected orders.
    pub total_cop: f64,
    /// Sum of captured margin across paid orders.
    pub total_profit_cop: f64,
    /// WLD balance of the deposit address; absent when chain reads are
    /// disabled or the RPC call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_balance_wld: Option<String>,
}

/// Exchange an operator PIN for a session token.
#[utoipa::path(
    post,
    path = "/v1/admin/login",
    tag = "Admin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = LoginResponse),
        (status = 401, description = "Invalid PIN"),
        (status = 503, description = "Admin login not configured")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Some(expected) = state.config.admin_pin.as_deref() else {
        return Err(ApiError::service_unavailable(
            "admin login is not configured (set ADMIN_PIN)",
        ));
    };

    if request.pin != expected {
        warn!("admin login attempt with invalid PIN");
        return Err(ApiError::unauthorized("invalid PIN"));
    }

    let (token, expires_at) = state
        .sessions
        .issue_admin()
        .map_err(|e| ApiError::internal("failed to issue session token").with_detail(e.to_string()))?;

    Ok(Json(LoginResponse { token, expires_at }))
}

/// List all orders, newest first.
#[utoipa::path(
    get,
    path = "/v1/admin/orders",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All orders", body = OrderListResponse),
        (status = 403, description = "Not authorized")
    )
)]
pub async fn list_all_orders(
    AdminOnly(_session): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = state
        .store
        .list_all()
        .map_err(|e| ApiError::internal("order storage failure").with_detail(e.to_string()))?;

    Ok(Json(OrderListResponse {
        total: orders.len(),
        orders,
    }))
}

/// Aggregate order stats plus the deposit address balance.
#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Aggregate stats", body = AdminStatsResponse),
        (status = 403, description = "Not authorized")
    )
)]
pub async fn stats(
    AdminOnly(_session): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<AdminStatsResponse>, ApiError> {
    let orders = state
        .store
        .list_all()
        .map_err(|e| ApiError::internal("order storage failure").with_detail(e.to_string()))?;

    let mut by_status = StatusCounts::default();
    let mut total_wld = 0.0;
    let mut total_cop = 0.0;
    let mut total_profit_cop = 0.0;
    for order in &orders {
        match order.status {
            OrderStatus::Pending => by_status.pending += 1,
            OrderStatus::Sent => by_status.sent += 1,
            OrderStatus::AssetReceived => by_status.asset_received += 1,
            OrderStatus::Paid => by_status.paid += 1,
            OrderStatus::Rejected => by_status.rejected += 1,
        }
        if order.status != OrderStatus::Rejected {
            total_wld += order.amount_wld;
            total_cop += order.amount_cop;
        }
        if order.status == OrderStatus::Paid {
            total_profit_cop += order.profit_margin_cop.unwrap_or(0.0);
        }
    }

    // Best effort: a failing RPC must not take the dashboard down.
    let deposit_balance_wld = match &state.chain {
        Some(chain) => match chain.deposit_balance_wld().await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(error = %e, "deposit balance lookup failed");
                None
            }
        },
        None => None,
    };

    Ok(Json(AdminStatsResponse {
        total_orders: orders.len(),
        by_status,
        total_wld,
        total_cop,
        total_profit_cop,
        deposit_balance_wld,
    }))
}

/// Transition an order's status.
#[utoipa::path(
    put,
    path = "/v1/admin/orders/{id}/status",
    tag = "Admin",
    params(
        ("id" = u64, Path, description = "Order id")
    ),
    request_body = UpdateStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated order", body = crate::models::Order),
        (status = 400, description = "Unknown status or illegal transition"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn set_order_status(
    AdminOnly(_session): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<crate::models::Order>, ApiError> {
    let status = OrderStatus::parse(&request.status).ok_or_else(|| {
        ApiError::bad_request(format!("unknown status `{}`", request.status))
            .with_detail("expected one of: pending, sent, asset_received, paid, rejected")
    })?;

    // Best-effort receipt check; an RPC failure or a pending transaction is
    // reported but never blocks the operator.
    if status == OrderStatus::AssetReceived {
        if let (Some(chain), Some(reference)) = (&state.chain, request.onchain_reference.as_deref())
        {
            match chain.transfer_confirmed(reference).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(order_id = id, reference, "transfer not confirmed on chain")
                }
                Err(e) => warn!(order_id = id, error = %e, "transfer receipt lookup failed"),
            }
        }
    }

    let order = state.lifecycle.set_status(
        id,
        StatusChange {
            status,
            onchain_reference: request.onchain_reference,
            force: request.force,
        },
    )?;
    Ok(Json(order))
}
