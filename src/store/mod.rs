// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Embedded order database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `orders`: order id → serialized Order (JSON bytes)
//! - `order_identity_idx`: composite key (len|nullifier|!created_ts|id) → order id
//! - `meta`: key → u64 (the atomic order id counter)
//! - `identities`: nullifier → linked wallet address
//!
//! The id counter is advanced inside the same write transaction that inserts
//! the order. redb serializes write transactions, which makes the increment a
//! storage-layer atomic operation: ids are unique and monotonic under
//! concurrent callers, and the counter never moves for a rejected order.
//! All reads deserialize into owned copies; mutating a returned `Order`
//! cannot affect stored data.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::models::Order;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: order id → serialized Order (JSON bytes).
const ORDERS: TableDefinition<u64, &[u8]> = TableDefinition::new("orders");

/// Index: composite key → order id.
/// Key format: `len_be|nullifier|!created_ts_be|id_be` for descending-time
/// range scans.
const ORDER_IDENTITY_IDX: TableDefinition<&[u8], u64> =
    TableDefinition::new("order_identity_idx");

/// Metadata: key → u64 (e.g. `next_order_id`).
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Identity records: nullifier → linked wallet address.
const IDENTITIES: TableDefinition<&str, &str> = TableDefinition::new("identities");

const NEXT_ORDER_ID: &str = "next_order_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("order {0} not found")]
    NotFound(u64),

    #[error("order {0} already exists")]
    DuplicateId(u64),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the identity index.
///
/// Format: `handle_len_be_bytes | handle_bytes | inverted_timestamp_be_bytes
/// | id_be_bytes`
///
/// The length header keeps a handle from landing inside another handle's
/// range (the handle is client-supplied and may contain any byte). The
/// inverted timestamp ensures newest-first ordering when scanning forward.
fn make_identity_key(nullifier: &str, created_ts: i64, id: u64) -> Vec<u8> {
    let mut key = make_prefix(nullifier);
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!created_ts as u64).to_be_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Build a prefix key for range scanning all orders of an identity.
fn make_prefix(nullifier: &str) -> Vec<u8> {
    let bytes = nullifier.as_bytes();
    let mut prefix = Vec::with_capacity(4 + bytes.len() + 16);
    prefix.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    prefix.extend_from_slice(bytes);
    prefix
}

/// Build the upper bound for a range scan (prefix with 0xFF bytes appended).
fn make_prefix_end(nullifier: &str) -> Vec<u8> {
    let mut end = make_prefix(nullifier);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

// =============================================================================
// OrderStore
// =============================================================================

/// Durable order store with atomic id allocation.
pub struct OrderStore {
    db: Database,
}

impl OrderStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS)?;
            let _ = write_txn.open_table(ORDER_IDENTITY_IDX)?;
            let _ = write_txn.open_table(META)?;
            let _ = write_txn.open_table(IDENTITIES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Allocate the next order id and persist the order built from it, in a
    /// single write transaction.
    ///
    /// The closure receives the freshly allocated id and must return the
    /// complete record carrying that id.
    pub fn create_with(&self, build: impl FnOnce(u64) -> Order) -> StoreResult<Order> {
        let write_txn = self.db.begin_write()?;
        let order = {
            let mut meta = write_txn.open_table(META)?;
            let next = meta.get(NEXT_ORDER_ID)?.map(|v| v.value()).unwrap_or(0) + 1;
            meta.insert(NEXT_ORDER_ID, next)?;

            let order = build(next);
            debug_assert_eq!(order.id, next);

            let mut orders = write_txn.open_table(ORDERS)?;
            if orders.get(order.id)?.is_some() {
                return Err(StoreError::DuplicateId(order.id));
            }
            let json = serde_json::to_vec(&order)?;
            orders.insert(order.id, json.as_slice())?;

            let mut idx = write_txn.open_table(ORDER_IDENTITY_IDX)?;
            let key = make_identity_key(&order.nullifier, order.created_at.timestamp(), order.id);
            idx.insert(key.as_slice(), order.id)?;

            order
        };
        write_txn.commit()?;
        Ok(order)
    }

    /// Atomically check an identity's recent order count and, while under
    /// `limit`, allocate the next id and persist the order built from it.
    ///
    /// Count and insert share one write transaction. redb serializes write
    /// transactions, so concurrent callers for the same identity cannot all
    /// observe the old count and slip past the limit. Returns `Ok(None)`
    /// when the limit is already reached; no id is consumed in that case.
    pub fn create_if_under_limit(
        &self,
        nullifier: &str,
        since: DateTime<Utc>,
        limit: usize,
        build: impl FnOnce(u64) -> Order,
    ) -> StoreResult<Option<Order>> {
        let write_txn = self.db.begin_write()?;
        let order = {
            let mut orders = write_txn.open_table(ORDERS)?;
            let mut idx = write_txn.open_table(ORDER_IDENTITY_IDX)?;

            let prefix = make_prefix(nullifier);
            let prefix_end = make_prefix_end(nullifier);
            let mut recent = 0usize;
            for entry in idx.range(prefix.as_slice()..prefix_end.as_slice())? {
                let entry = entry?;
                let Some(value) = orders.get(entry.1.value())? else {
                    continue;
                };
                let existing: Order = serde_json::from_slice(value.value())?;
                // Keys are newest-first, so the first older record ends the scan.
                if existing.created_at < since {
                    break;
                }
                recent += 1;
            }
            if recent >= limit {
                // Dropping the uncommitted transaction leaves the counter alone.
                return Ok(None);
            }

            let mut meta = write_txn.open_table(META)?;
            let next = meta.get(NEXT_ORDER_ID)?.map(|v| v.value()).unwrap_or(0) + 1;
            meta.insert(NEXT_ORDER_ID, next)?;

            let order = build(next);
            debug_assert_eq!(order.id, next);

            let json = serde_json::to_vec(&order)?;
            orders.insert(order.id, json.as_slice())?;
            let key = make_identity_key(&order.nullifier, order.created_at.timestamp(), order.id);
            idx.insert(key.as_slice(), order.id)?;
            order
        };
        write_txn.commit()?;
        Ok(Some(order))
    }

    /// Look up a single order by id.
    pub fn get(&self, id: u64) -> StoreResult<Order> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;
        match table.get(id)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Err(StoreError::NotFound(id)),
        }
    }

    /// List every order, newest first.
    pub fn list_all(&self) -> StoreResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS)?;

        let mut orders = Vec::new();
        // Ids are monotonic, so reverse key order is newest-first.
        for entry in table.iter()?.rev() {
            let entry = entry?;
            orders.push(serde_json::from_slice(entry.1.value())?);
        }
        Ok(orders)
    }

    /// List orders for an identity, newest first, optionally only those
    /// created at or after `since`.
    pub fn list_by_identity(
        &self,
        nullifier: &str,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(ORDER_IDENTITY_IDX)?;
        let orders_table = read_txn.open_table(ORDERS)?;

        let prefix = make_prefix(nullifier);
        let prefix_end = make_prefix_end(nullifier);

        let mut orders = Vec::new();
        for entry in idx.range(prefix.as_slice()..prefix_end.as_slice())? {
            let entry = entry?;
            let id = entry.1.value();
            let Some(value) = orders_table.get(id)? else {
                continue;
            };
            let order: Order = serde_json::from_slice(value.value())?;
            if let Some(since) = since {
                // Keys are newest-first, so the first older record ends the scan.
                if order.created_at < since {
                    break;
                }
            }
            orders.push(order);
        }
        Ok(orders)
    }

    /// Count orders for an identity created at or after `since`.
    pub fn count_since(&self, nullifier: &str, since: DateTime<Utc>) -> StoreResult<usize> {
        Ok(self.list_by_identity(nullifier, Some(since))?.len())
    }

    /// Apply a fallible mutation to an order and refresh `updated_at`.
    ///
    /// The mutation sees the stored state inside the write transaction, so a
    /// validate-then-mutate closure is atomic with respect to concurrent
    /// updates of the same order. Returning `Err` aborts the transaction.
    pub fn try_update<E, F>(&self, id: u64, mutate: F) -> Result<Order, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Order) -> Result<(), E>,
    {
        let write_txn = self.db.begin_write().map_err(StoreError::from)?;
        let order = {
            let mut table = write_txn.open_table(ORDERS).map_err(StoreError::from)?;
            let bytes = table
                .get(id)
                .map_err(StoreError::from)?
                .map(|v| v.value().to_vec())
                .ok_or(StoreError::NotFound(id))?;
            let mut order: Order = serde_json::from_slice(&bytes).map_err(StoreError::from)?;

            mutate(&mut order)?;
            order.id = id;
            order.updated_at = Utc::now();

            let json = serde_json::to_vec(&order).map_err(StoreError::from)?;
            table
                .insert(id, json.as_slice())
                .map_err(StoreError::from)?;
            order
        };
        write_txn.commit().map_err(StoreError::from)?;
        Ok(order)
    }

    /// Apply an infallible mutation to an order and refresh `updated_at`.
    pub fn update(&self, id: u64, mutate: impl FnOnce(&mut Order)) -> StoreResult<Order> {
        self.try_update(id, |order| {
            mutate(order);
            Ok::<(), StoreError>(())
        })
    }

    /// Link (or re-link) an identity to a wallet address. Never deleted.
    pub fn link_identity(&self, nullifier: &str, wallet_address: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(IDENTITIES)?;
            table.insert(nullifier, wallet_address)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up the wallet address linked to an identity.
    pub fn wallet_for_identity(&self, nullifier: &str) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IDENTITIES)?;
        Ok(table.get(nullifier)?.map(|v| v.value().to_string()))
    }

    /// The id the next created order will receive. Used by health checks.
    pub fn peek_next_id(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(META)?;
        Ok(table.get(NEXT_ORDER_ID)?.map(|v| v.value()).unwrap_or(0) + 1)
    }
}
