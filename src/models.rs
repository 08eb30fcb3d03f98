// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Core domain types: orders, payout rails, and the status lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of an exchange order.
///
/// ## Default transition table
///
/// - `pending` → `sent`, `rejected`
/// - `sent` → `asset_received`, `rejected`
/// - `asset_received` → `paid`, `rejected`
/// - `paid`, `rejected` → terminal
///
/// Operators may force a transition outside this table; forced illegal
/// transitions are recorded as anomalies rather than silently accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, waiting for the user to send WLD.
    Pending,
    /// User reports the WLD transfer as sent.
    Sent,
    /// WLD confirmed at the deposit address.
    AssetReceived,
    /// COP payout completed (terminal success).
    Paid,
    /// Order rejected (terminal failure).
    Rejected,
}

impl OrderStatus {
    /// Whether `next` is allowed by the strict forward-only table.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Rejected)
                | (Sent, AssetReceived)
                | (Sent, Rejected)
                | (AssetReceived, Paid)
                | (AssetReceived, Rejected)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Rejected)
    }

    /// Parse a status from its wire representation (case-insensitive).
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "sent" => Some(OrderStatus::Sent),
            "asset_received" => Some(OrderStatus::AssetReceived),
            "paid" => Some(OrderStatus::Paid),
            "rejected" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Sent => write!(f, "sent"),
            OrderStatus::AssetReceived => write!(f, "asset_received"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Supported Colombian payout rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BankDestination {
    Nequi,
    Daviplata,
    Bancolombia,
}

impl BankDestination {
    /// Parse a bank name from client input (case-insensitive).
    pub fn parse(s: &str) -> Option<BankDestination> {
        match s.trim().to_lowercase().as_str() {
            "nequi" => Some(BankDestination::Nequi),
            "daviplata" => Some(BankDestination::Daviplata),
            "bancolombia" => Some(BankDestination::Bancolombia),
            _ => None,
        }
    }

    /// All supported rails, for error messages.
    pub const ALL: [&'static str; 3] = ["nequi", "daviplata", "bancolombia"];
}

impl std::fmt::Display for BankDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BankDestination::Nequi => write!(f, "nequi"),
            BankDestination::Daviplata => write!(f, "daviplata"),
            BankDestination::Bancolombia => write!(f, "bancolombia"),
        }
    }
}

/// One entry in an order's append-only status history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusEntry {
    /// When the transition happened.
    pub at: DateTime<Utc>,
    /// The status transitioned into.
    pub status: OrderStatus,
}

/// A persisted exchange order.
///
/// The `id` is assigned exactly once from the store's atomic counter and
/// never reused. `status_history` is append-only; it has at least one entry
/// (the initial `pending`) from creation onward.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Monotonically increasing order id.
    pub id: u64,
    /// World ID nullifier linking all orders from one verified person.
    pub nullifier: String,
    /// Payout rail for the COP transfer.
    pub bank: BankDestination,
    /// Account holder name at the payout rail.
    pub account_holder: String,
    /// Account number at the payout rail.
    pub account_number: String,
    /// WLD amount the user is selling.
    pub amount_wld: f64,
    /// COP amount the user expects to receive.
    pub amount_cop: f64,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Append-only transition log, oldest first.
    pub status_history: Vec<StatusEntry>,
    /// COP margin captured for this order, computed once at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin_cop: Option<f64>,
    /// On-chain transaction hash of the WLD transfer, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_reference: Option<String>,
    /// Payout-batching date derived from the business-day cutover rule.
    pub inventory_date: NaiveDate,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_table_allows_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Sent));
        assert!(OrderStatus::Sent.can_transition_to(OrderStatus::AssetReceived));
        assert!(OrderStatus::AssetReceived.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Rejected));
        assert!(OrderStatus::Sent.can_transition_to(OrderStatus::Rejected));
        assert!(OrderStatus::AssetReceived.can_transition_to(OrderStatus::Rejected));
    }

    #[test]
    fn strict_table_blocks_backward_and_terminal_transitions() {
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Rejected.can_transition_to(OrderStatus::Sent));
        assert!(!OrderStatus::Sent.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Sent.is_terminal());
        assert!(!OrderStatus::AssetReceived.is_terminal());
    }

    #[test]
    fn status_parse_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Sent,
            OrderStatus::AssetReceived,
            OrderStatus::Paid,
            OrderStatus::Rejected,
        ] {
            assert_eq!(OrderStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(OrderStatus::parse("shipped"), None);
    }

    #[test]
    fn bank_parse_is_case_insensitive() {
        assert_eq!(BankDestination::parse("Nequi"), Some(BankDestination::Nequi));
        assert_eq!(
            BankDestination::parse(" BANCOLOMBIA "),
            Some(BankDestination::Bancolombia)
        );
        assert_eq!(BankDestination::parse("UnknownBank"), None);
    }
}
