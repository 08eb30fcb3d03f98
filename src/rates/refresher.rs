// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Background rate refresher.
//!
//! Refreshes the rate cache every TTL interval regardless of request
//! traffic, so the request path normally hits a warm cache. The refresh
//! itself goes through the cache's single-flight guard, so an overlapping
//! request-path refresh is never duplicated.
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::RateCache;

/// Background task that keeps the rate cache warm.
pub struct RateRefresher {
    cache: Arc<RateCache>,
    interval: Duration,
}

impl RateRefresher {
    pub fn new(cache: Arc<RateCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Run the refresh loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "rate refresher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("rate refresher shutting down");
                return;
            }

            let snapshot = self.cache.get_rate(true).await;
            debug!(
                net_rate_cop = snapshot.net_rate_cop,
                stale = snapshot.stale,
                degraded = snapshot.degraded_legs.len(),
                "rate refreshed"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("rate refresher shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rates::feed::{FeedError, PriceFeed};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFeed {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl PriceFeed for CountingFeed {
        async fn wld_usd(&self) -> Result<f64, FeedError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(1.2)
        }

        async fn usd_cop(&self) -> Result<f64, FeedError> {
            Ok(4000.0)
        }
    }

    #[tokio::test]
    async fn refresher_stops_on_cancellation() {
        let feed = Arc::new(CountingFeed {
            fetches: AtomicUsize::new(0),
        });
        let cache = Arc::new(RateCache::new(feed.clone(), &Config::for_tests()));
        let refresher = RateRefresher::new(cache, Duration::from_secs(60));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(refresher.run(shutdown.clone()));

        // Give the first sweep a chance to run, then cancel.
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        handle.await.expect("refresher task join");

        assert_eq!(feed.fetches.load(Ordering::SeqCst), 1);
    }
}
