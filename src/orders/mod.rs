// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Order lifecycle engine.
//!
//! Validates creation inputs, enforces the per-identity daily quota, computes
//! order economics, and governs status transitions. Transitions outside the
//! strict forward table require an explicit operator override and are logged
//! as anomalies.

pub mod business_day;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::identity::VerifiedIdentity;
use crate::models::{BankDestination, Order, OrderStatus, StatusEntry};
use crate::store::{OrderStore, StoreError};

/// Validated-at-the-edge creation input. The bank arrives as a raw string so
/// an unknown rail maps to a clean `InvalidBank` instead of a body-level
/// deserialization rejection.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub bank: String,
    pub account_holder: String,
    pub account_number: String,
    pub amount_wld: f64,
    pub amount_cop: f64,
}

/// A status mutation requested by an operator.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub onchain_reference: Option<String>,
    /// Allow a transition outside the strict table. Logged as an anomaly.
    pub force: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("unsupported bank destination `{0}`")]
    InvalidBank(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0}")]
    InvalidAmount(&'static str),

    #[error("minimum order is {minimum} WLD")]
    BelowMinimum { minimum: f64 },

    #[error("daily order limit of {limit} reached for this identity")]
    QuotaExceeded { limit: usize },

    #[error("transition {from} -> {to} is not allowed")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("an on-chain transaction reference is required to mark an order paid")]
    MissingOnchainReference,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match &err {
            OrderError::InvalidBank(_) => ApiError::bad_request(err.to_string())
                .with_detail(format!("supported: {}", BankDestination::ALL.join(", "))),
            OrderError::MissingField(_)
            | OrderError::InvalidAmount(_)
            | OrderError::BelowMinimum { .. }
            | OrderError::MissingOnchainReference => ApiError::bad_request(err.to_string()),
            OrderError::IllegalTransition { .. } => ApiError::bad_request(err.to_string())
                .with_detail("pass `force: true` to override the transition table"),
            OrderError::QuotaExceeded { .. } => ApiError::too_many_requests(err.to_string()),
            OrderError::Store(StoreError::NotFound(id)) => {
                ApiError::not_found(format!("order {id} not found"))
            }
            OrderError::Store(inner) => {
                ApiError::internal("order storage failure").with_detail(inner.to_string())
            }
        }
    }
}

/// Governs order creation and status transitions over the store.
pub struct LifecycleEngine {
    store: Arc<OrderStore>,
    margin_fraction: f64,
    min_order_wld: f64,
    daily_limit: usize,
    business_offset: FixedOffset,
    simulation: bool,
}

impl LifecycleEngine {
    pub fn new(store: Arc<OrderStore>, config: &Config) -> Self {
        Self {
            store,
            margin_fraction: config.margin_fraction,
            min_order_wld: config.min_order_wld,
            daily_limit: config.daily_order_limit,
            business_offset: config.business_offset(),
            simulation: config.simulation,
        }
    }

    /// Start of the current business-timezone calendar day, in UTC.
    ///
    /// The daily quota is a fixed-offset calendar-day window, not a sliding
    /// 24-hour window.
    pub fn quota_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.business_offset);
        local
            .with_time(NaiveTime::MIN)
            .single()
            // Fixed offsets have no DST, so midnight is never ambiguous.
            .expect("fixed-offset midnight is unambiguous")
            .with_timezone(&Utc)
    }

    /// Validate inputs, enforce the daily quota, and persist a new order.
    ///
    /// The store counter is only advanced after every validation has passed,
    /// so rejected requests never consume an id.
    pub fn create_order(
        &self,
        identity: &VerifiedIdentity,
        input: &CreateOrderInput,
    ) -> Result<Order, OrderError> {
        let bank = BankDestination::parse(&input.bank)
            .ok_or_else(|| OrderError::InvalidBank(input.bank.clone()))?;

        let account_holder = input.account_holder.trim();
        if account_holder.is_empty() {
            return Err(OrderError::MissingField("account_holder"));
        }
        let account_number = input.account_number.trim();
        if account_number.is_empty() {
            return Err(OrderError::MissingField("account_number"));
        }

        if !input.amount_wld.is_finite() {
            return Err(OrderError::InvalidAmount("amount_wld must be a finite number"));
        }
        if input.amount_wld < self.min_order_wld {
            return Err(OrderError::BelowMinimum {
                minimum: self.min_order_wld,
            });
        }
        if !input.amount_cop.is_finite() || input.amount_cop <= 0.0 {
            return Err(OrderError::InvalidAmount(
                "amount_cop must be a positive finite number",
            ));
        }

        let now = Utc::now();
        let window_start = self.quota_window_start(now);

        // The user receives amount_cop net of margin, so the captured margin
        // on the gross payout is margin/(1-margin) of the net amount.
        let profit_margin_cop =
            self.margin_fraction / (1.0 - self.margin_fraction) * input.amount_cop;

        let inventory_date =
            business_day::inventory_date(now.with_timezone(&self.business_offset));

        // Quota check and insert share one write transaction, so concurrent
        // creates for the same identity cannot all pass the check.
        let order = self
            .store
            .create_if_under_limit(&identity.nullifier, window_start, self.daily_limit, |id| {
                Order {
                    id,
                    nullifier: identity.nullifier.clone(),
                    bank,
                    account_holder: account_holder.to_string(),
                    account_number: account_number.to_string(),
                    amount_wld: input.amount_wld,
                    amount_cop: input.amount_cop,
                    status: OrderStatus::Pending,
                    status_history: vec![StatusEntry {
                        at: now,
                        status: OrderStatus::Pending,
                    }],
                    profit_margin_cop: Some(profit_margin_cop),
                    onchain_reference: None,
                    inventory_date,
                    created_at: now,
                    updated_at: now,
                }
            })?
            .ok_or(OrderError::QuotaExceeded {
                limit: self.daily_limit,
            })?;

        info!(
            order_id = order.id,
            bank = %order.bank,
            amount_wld = order.amount_wld,
            inventory_date = %order.inventory_date,
            "order created"
        );
        Ok(order)
    }

    /// Transition an order's status, appending to its history.
    ///
    /// Transitions outside the strict table fail unless `force` is set;
    /// forced illegal transitions are accepted but reported as anomalies.
    /// Entering `paid` requires an on-chain reference unless the simulation
    /// capability is enabled, in which case a placeholder is synthesized.
    pub fn set_status(&self, id: u64, change: StatusChange) -> Result<Order, OrderError> {
        let reference = change
            .onchain_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let now = Utc::now();
        let simulation = self.simulation;

        // Validation runs inside the write transaction, against the stored
        // state, so concurrent calls cannot both validate the same `from`.
        let order = self.store.try_update(id, |order| {
            if !order.status.can_transition_to(change.status) {
                if !change.force {
                    return Err(OrderError::IllegalTransition {
                        from: order.status,
                        to: change.status,
                    });
                }
                warn!(
                    order_id = id,
                    from = %order.status,
                    to = %change.status,
                    "anomaly: forced status transition outside the default table"
                );
            }

            let mut reference = reference;
            if change.status == OrderStatus::Paid
                && order.onchain_reference.is_none()
                && reference.is_none()
            {
                if simulation {
                    let placeholder = format!("SIM-{}", uuid::Uuid::new_v4());
                    info!(order_id = id, reference = %placeholder, "synthesized simulation payout reference");
                    reference = Some(placeholder);
                } else {
                    return Err(OrderError::MissingOnchainReference);
                }
            }

            order.status = change.status;
            order.status_history.push(StatusEntry {
                at: now,
                status: change.status,
            });
            if let Some(reference) = reference {
                order.onchain_reference = Some(reference);
            }
            Ok(())
        })?;

        info!(order_id = id, status = %order.status, "order status updated");
        Ok(order)
    }
}
