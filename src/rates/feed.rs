// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! Price feed upstreams for the rate cache.
//!
//! Two independent legs: WLD/USD from a CoinGecko-style simple-price
//! endpoint, USD/COP from an open exchange-rate API. Each leg carries its
//! own timeout and plausibility window so one flaky upstream degrades only
//! its own leg.

use std::time::Duration;

use async_trait::async_trait;

/// Timeout applied to every upstream price call.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(3);

/// Plausibility window for WLD/USD. Values outside are treated as failures.
const WLD_USD_RANGE: (f64, f64) = (0.01, 1000.0);

/// Plausibility window for USD/COP.
const USD_COP_RANGE: (f64, f64) = (500.0, 20_000.0);

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("upstream response missing field `{0}`")]
    MissingField(&'static str),

    #[error("upstream returned implausible value {0}")]
    Implausible(f64),
}

/// A source of the two rate legs.
///
/// The cache only depends on this trait, so tests can swap in fixed or
/// failing feeds without touching the network.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Spot WLD price in USD.
    async fn wld_usd(&self) -> Result<f64, FeedError>;

    /// USD to COP exchange rate.
    async fn usd_cop(&self) -> Result<f64, FeedError>;
}

fn check_plausible(value: f64, range: (f64, f64)) -> Result<f64, FeedError> {
    if value.is_finite() && value > range.0 && value < range.1 {
        Ok(value)
    } else {
        Err(FeedError::Implausible(value))
    }
}

/// HTTP-backed price feed.
pub struct HttpPriceFeed {
    client: reqwest::Client,
    token_price_url: String,
    fx_url: String,
}

impl HttpPriceFeed {
    pub fn new() -> Self {
        Self::with_urls(
            "https://api.coingecko.com/api/v3/simple/price?ids=worldcoin-wld&vs_currencies=usd",
            "https://open.er-api.com/v6/latest/USD",
        )
    }

    pub fn with_urls(token_price_url: impl Into<String>, fx_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            token_price_url: token_price_url.into(),
            fx_url: fx_url.into(),
        }
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| FeedError::Request(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))
    }
}

impl Default for HttpPriceFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn wld_usd(&self) -> Result<f64, FeedError> {
        let body = self.fetch_json(&self.token_price_url).await?;
        let price = body
            .get("worldcoin-wld")
            .and_then(|t| t.get("usd"))
            .and_then(|v| v.as_f64())
            .ok_or(FeedError::MissingField("worldcoin-wld.usd"))?;
        check_plausible(price, WLD_USD_RANGE)
    }

    async fn usd_cop(&self) -> Result<f64, FeedError> {
        let body = self.fetch_json(&self.fx_url).await?;
        let rate = body
            .get("rates")
            .and_then(|r| r.get("COP"))
            .and_then(|v| v.as_f64())
            .ok_or(FeedError::MissingField("rates.COP"))?;
        check_plausible(rate, USD_COP_RANGE)
    }
}
