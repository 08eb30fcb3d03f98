// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Shared application state, cloned into every handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::SessionKeys;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::identity::IdentityVerifier;
use crate::orders::LifecycleEngine;
use crate::rates::RateCache;
use crate::store::OrderStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<OrderStore>,
    pub lifecycle: Arc<LifecycleEngine>,
    pub rates: Arc<RateCache>,
    pub verifier: Arc<IdentityVerifier>,
    pub sessions: Arc<SessionKeys>,
    /// `None` when chain reads are not configured.
    pub chain: Option<Arc<ChainClient>>,
    /// Process start, for the health endpoint's uptime.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<OrderStore>,
        rates: Arc<RateCache>,
        chain: Option<Arc<ChainClient>>,
    ) -> Self {
        let lifecycle = Arc::new(LifecycleEngine::new(store.clone(), &config));
        let verifier = Arc::new(IdentityVerifier::from_config(&config));
        let sessions = Arc::new(SessionKeys::new(
            &config.session_signing_key,
            config.session_ttl,
        ));

        Self {
            config: Arc::new(config),
            store,
            lifecycle,
            rates,
            verifier,
            sessions,
            chain,
            started_at: Utc::now(),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by a throwaway database, simulation mode on.
    pub fn for_tests(dir: &std::path::Path) -> Self {
        use crate::rates::feed::HttpPriceFeed;

        let config = Config::for_tests();
        let store = Arc::new(OrderStore::open(&dir.join("orders.redb")).expect("open test store"));
        let rates = Arc::new(RateCache::new(Arc::new(HttpPriceFeed::new()), &config));
        Self::new(config, store, rates, None)
    }
}
