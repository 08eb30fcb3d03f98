// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cambio_server::api::router;
use cambio_server::chain::ChainClient;
use cambio_server::config::Config;
use cambio_server::rates::feed::HttpPriceFeed;
use cambio_server::rates::refresher::RateRefresher;
use cambio_server::rates::RateCache;
use cambio_server::state::AppState;
use cambio_server::store::OrderStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let config = Config::from_env();

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        warn!(dir = %config.data_dir.display(), error = %e, "could not create data directory");
    }
    let store = Arc::new(
        OrderStore::open(&config.data_dir.join("orders.redb")).expect("open order database"),
    );

    let rates = Arc::new(RateCache::new(Arc::new(HttpPriceFeed::new()), &config));
    let chain = ChainClient::from_config(&config)
        .expect("chain client configuration")
        .map(Arc::new);
    if chain.is_none() {
        info!("chain reads disabled (RPC_URL / WLD_TOKEN_ADDRESS / DEPOSIT_ADDRESS not set)");
    }

    let shutdown = CancellationToken::new();
    let refresher = RateRefresher::new(rates.clone(), config.rate_ttl);
    let refresher_handle = tokio::spawn(refresher.run(shutdown.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("parse bind address");
    let state = AppState::new(config, store, rates, chain);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener");
    info!(%addr, "cambio server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("server failed");

    shutdown.cancel();
    let _ = refresher_handle.await;
    info!("shutdown complete");
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::signal::ctrl_c().await.expect("install ctrl-c handler");
    info!("shutdown signal received");
    shutdown.cancel();
}
