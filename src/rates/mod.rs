// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Rate cache for the WLD buy rate in COP.
//!
//! Shields request handlers from upstream flakiness:
//!
//! - Snapshots younger than the TTL are served straight from the cache.
//! - A failed leg falls back to its configured constant, so a single flaky
//!   upstream degrades only that leg.
//! - If both legs fail and an old snapshot exists, the old snapshot is
//!   served marked `stale` instead of surfacing the error.
//! - On a cold start with both upstreams down, the configured fallbacks
//!   produce a usable snapshot; the endpoint never hard-fails.
//!
//! A single refresh guard serializes refreshes: concurrent callers past the
//! TTL wait on the in-flight refresh and then re-read the cache rather than
//! duplicating upstream fetches.

pub mod feed;
pub mod refresher;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;
use utoipa::ToSchema;

use crate::config::Config;
use feed::PriceFeed;

/// One computed exchange rate, ephemeral and never persisted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RateSnapshot {
    /// WLD price in USD used for this snapshot.
    pub wld_usd: f64,
    /// USD to COP rate used for this snapshot.
    pub usd_cop: f64,
    /// Gross WLD price in COP (`wld_usd * usd_cop`).
    pub gross_rate_cop: f64,
    /// Rate offered to users: `gross * (1 - margin)`.
    pub net_rate_cop: f64,
    /// Configured margin, as a percentage for display.
    pub margin_percent: f64,
    /// When the upstream legs were fetched.
    pub computed_at: DateTime<Utc>,
    /// Served from cache without touching upstreams.
    pub from_cache: bool,
    /// Past its TTL but the best data available after a failed refresh.
    pub stale: bool,
    /// Legs that fell back to configured constants ("wld_usd", "usd_cop").
    pub degraded_legs: Vec<String>,
}

/// TTL-cached, fallback-protected rate source.
pub struct RateCache {
    feed: Arc<dyn PriceFeed>,
    margin_fraction: f64,
    ttl: Duration,
    fallback_wld_usd: f64,
    fallback_usd_cop: f64,
    snapshot: RwLock<Option<RateSnapshot>>,
    refresh_guard: Mutex<()>,
}

impl RateCache {
    pub fn new(feed: Arc<dyn PriceFeed>, config: &Config) -> Self {
        Self {
            feed,
            margin_fraction: config.margin_fraction,
            ttl: config.rate_ttl,
            fallback_wld_usd: config.fallback_wld_usd,
            fallback_usd_cop: config.fallback_usd_cop,
            snapshot: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Current rate snapshot.
    ///
    /// Never fails: every failure mode degrades to cached, stale, or
    /// fallback data.
    pub async fn get_rate(&self, force_refresh: bool) -> RateSnapshot {
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await {
                return snapshot;
            }
        }

        let _guard = self.refresh_guard.lock().await;

        // Another caller may have refreshed while we waited on the guard.
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await {
                return snapshot;
            }
        }

        self.refresh().await
    }

    /// Whether any snapshot has been computed yet.
    pub async fn has_snapshot(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// The cached snapshot if it is younger than the TTL.
    async fn fresh_snapshot(&self) -> Option<RateSnapshot> {
        let guard = self.snapshot.read().await;
        let snapshot = guard.as_ref()?;
        if !self.is_fresh(snapshot) {
            return None;
        }
        let mut copy = snapshot.clone();
        copy.from_cache = true;
        Some(copy)
    }

    fn is_fresh(&self, snapshot: &RateSnapshot) -> bool {
        (Utc::now() - snapshot.computed_at)
            .to_std()
            .map(|age| age < self.ttl)
            .unwrap_or(false)
    }

    /// Fetch both legs and rebuild the snapshot, applying the fallback policy.
    async fn refresh(&self) -> RateSnapshot {
        let wld = self.feed.wld_usd().await;
        let fx = self.feed.usd_cop().await;

        if wld.is_err() && fx.is_err() {
            // Total upstream failure: prefer real old data over double fallback.
            let guard = self.snapshot.read().await;
            if let Some(previous) = guard.as_ref() {
                warn!("both rate upstreams failed; serving stale snapshot");
                let mut copy = previous.clone();
                copy.from_cache = true;
                copy.stale = true;
                return copy;
            }
        }

        let mut degraded_legs = Vec::new();
        let wld_usd = match wld {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, fallback = self.fallback_wld_usd, "WLD/USD leg failed");
                degraded_legs.push("wld_usd".to_string());
                self.fallback_wld_usd
            }
        };
        let usd_cop = match fx {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, fallback = self.fallback_usd_cop, "USD/COP leg failed");
                degraded_legs.push("usd_cop".to_string());
                self.fallback_usd_cop
            }
        };

        let snapshot = self.build_snapshot(wld_usd, usd_cop, degraded_legs);
        *self.snapshot.write().await = Some(snapshot.clone());
        snapshot
    }

    fn build_snapshot(
        &self,
        wld_usd: f64,
        usd_cop: f64,
        degraded_legs: Vec<String>,
    ) -> RateSnapshot {
        let gross_rate_cop = wld_usd * usd_cop;
        RateSnapshot {
            wld_usd,
            usd_cop,
            gross_rate_cop,
            net_rate_cop: gross_rate_cop * (1.0 - self.margin_fraction),
            margin_percent: self.margin_fraction * 100.0,
            computed_at: Utc::now(),
            from_cache: false,
            stale: false,
            degraded_legs,
        }
    }
}
