// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Missing values
//! fall back to defaults suitable for local development; production
//! deployments are expected to set at least `ADMIN_PIN`,
//! `SESSION_SIGNING_KEY`, and `WORLD_APP_ID`.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory for the embedded order database | `/data` |
//! | `MARGIN_FRACTION` | Operator margin as a fraction in `[0,1)` | `0.02` |
//! | `MIN_ORDER_WLD` | Minimum WLD per order | `1.0` |
//! | `DAILY_ORDER_LIMIT` | Max orders per identity per business day | `3` |
//! | `RATE_TTL_SECS` | Rate cache TTL and refresh interval | `60` |
//! | `FALLBACK_WLD_USD` | WLD/USD used when the price feed is down | `1.10` |
//! | `FALLBACK_USD_COP` | USD/COP used when the FX feed is down | `4100.0` |
//! | `ADMIN_PIN` | Shared secret exchanged for a session token | unset (login disabled) |
//! | `SESSION_SIGNING_KEY` | HS256 key for admin session tokens | random per process |
//! | `SESSION_TTL_SECS` | Admin session lifetime | `43200` (12 h) |
//! | `ALLOWED_ORIGINS` | Comma-separated CORS origins, `*` for any | `*` |
//! | `VERIFIER_URL` | World ID verifier base URL | `https://developer.worldcoin.org` |
//! | `WORLD_APP_ID` | World ID app id | unset |
//! | `WORLD_ACTION` | World ID action for this service | `cambio-exchange` |
//! | `RPC_URL` | EVM JSON-RPC endpoint for on-chain reads | unset (chain reads disabled) |
//! | `WLD_TOKEN_ADDRESS` | WLD ERC-20 contract address | unset |
//! | `DEPOSIT_ADDRESS` | Address users send WLD to | unset |
//! | `SIMULATION` | Accept proofs offline, synthesize payout refs | `false` |
//! | `BUSINESS_UTC_OFFSET_HOURS` | Fixed offset for business-day math | `-5` (Bogotá) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Runtime configuration, loaded once at startup and shared via `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,

    /// Operator margin as a fraction of the gross rate, in `[0,1)`.
    pub margin_fraction: f64,
    /// Minimum WLD amount accepted per order.
    pub min_order_wld: f64,
    /// Maximum orders per identity per business day.
    pub daily_order_limit: usize,

    /// Rate cache TTL; also the background refresh interval.
    pub rate_ttl: Duration,
    pub fallback_wld_usd: f64,
    pub fallback_usd_cop: f64,

    /// Admin PIN; `None` disables admin login entirely.
    pub admin_pin: Option<String>,
    pub session_signing_key: String,
    pub session_ttl: Duration,

    pub allowed_origins: String,

    pub verifier_url: String,
    pub world_app_id: Option<String>,
    pub world_action: String,

    pub rpc_url: Option<String>,
    pub wld_token_address: Option<String>,
    pub deposit_address: Option<String>,

    /// Explicit simulation capability: offline proof acceptance and
    /// synthesized on-chain references. Never inferred from heuristics.
    pub simulation: bool,

    /// Fixed business timezone offset in hours east of UTC.
    pub business_utc_offset_hours: i32,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        let session_signing_key = env_opt("SESSION_SIGNING_KEY").unwrap_or_else(|| {
            tracing::warn!(
                "SESSION_SIGNING_KEY not set; using a random per-process key \
                 (admin sessions will not survive restarts)"
            );
            uuid::Uuid::new_v4().to_string()
        });

        let mut margin_fraction = env_or("MARGIN_FRACTION", 0.02_f64);
        if !(0.0..1.0).contains(&margin_fraction) || !margin_fraction.is_finite() {
            tracing::warn!(margin_fraction, "MARGIN_FRACTION out of [0,1); using 0.02");
            margin_fraction = 0.02;
        }

        Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: env_or("PORT", 8080),
            data_dir: PathBuf::from(env_or(DATA_DIR_ENV, "/data".to_string())),
            margin_fraction,
            min_order_wld: env_or("MIN_ORDER_WLD", 1.0_f64),
            daily_order_limit: env_or("DAILY_ORDER_LIMIT", 3_usize),
            rate_ttl: Duration::from_secs(env_or("RATE_TTL_SECS", 60_u64)),
            fallback_wld_usd: env_or("FALLBACK_WLD_USD", 1.10_f64),
            fallback_usd_cop: env_or("FALLBACK_USD_COP", 4100.0_f64),
            admin_pin: env_opt("ADMIN_PIN"),
            session_signing_key,
            session_ttl: Duration::from_secs(env_or("SESSION_TTL_SECS", 43_200_u64)),
            allowed_origins: env_or("ALLOWED_ORIGINS", "*".to_string()),
            verifier_url: env_or(
                "VERIFIER_URL",
                "https://developer.worldcoin.org".to_string(),
            ),
            world_app_id: env_opt("WORLD_APP_ID"),
            world_action: env_or("WORLD_ACTION", "cambio-exchange".to_string()),
            rpc_url: env_opt("RPC_URL"),
            wld_token_address: env_opt("WLD_TOKEN_ADDRESS"),
            deposit_address: env_opt("DEPOSIT_ADDRESS"),
            simulation: env_or("SIMULATION", false),
            business_utc_offset_hours: env_or("BUSINESS_UTC_OFFSET_HOURS", -5),
        }
    }

    /// The fixed business timezone offset.
    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::west_opt(5 * 3600).expect("valid offset"))
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for unit tests: simulation on, permissive defaults.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: std::env::temp_dir(),
            margin_fraction: 0.02,
            min_order_wld: 1.0,
            daily_order_limit: 3,
            rate_ttl: Duration::from_secs(60),
            fallback_wld_usd: 1.10,
            fallback_usd_cop: 4100.0,
            admin_pin: Some("492817".to_string()),
            session_signing_key: "test-signing-key".to_string(),
            session_ttl: Duration::from_secs(3600),
            allowed_origins: "*".to_string(),
            verifier_url: "https://developer.worldcoin.org".to_string(),
            world_app_id: None,
            world_action: "cambio-exchange".to_string(),
            rpc_url: None,
            wld_token_address: None,
            deposit_address: None,
            simulation: true,
            business_utc_offset_hours: -5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_offset_is_west_of_utc() {
        let config = Config::for_tests();
        assert_eq!(config.business_offset().local_minus_utc(), -5 * 3600);
    }
}
