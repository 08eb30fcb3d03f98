// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cambio

//! On-chain reads for the WLD ERC-20 token.
//!
//! Thin collaborator around an EVM JSON-RPC endpoint: deposit-address
//! balance for the admin dashboard and transfer-receipt lookups used as a
//! best-effort check when an operator confirms a WLD deposit. The client is
//! optional; without `RPC_URL` the service runs with chain reads disabled.

use std::str::FromStr;

use alloy::{
    network::Ethereum,
    primitives::{Address, TxHash, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    sol,
};

use crate::config::Config;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("contract error: {0}")]
    ContractError(String),
}

/// EVM client scoped to the WLD token and the service deposit address.
pub struct ChainClient {
    provider: HttpProvider,
    token: Address,
    deposit: Address,
}

impl ChainClient {
    /// Build a client from configuration.
    ///
    /// Returns `Ok(None)` when chain reads are not configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, ChainError> {
        let (Some(rpc_url), Some(token), Some(deposit)) = (
            config.rpc_url.as_deref(),
            config.wld_token_address.as_deref(),
            config.deposit_address.as_deref(),
        ) else {
            return Ok(None);
        };

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;
        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Some(Self {
            provider,
            token: Address::from_str(token)
                .map_err(|e| ChainError::InvalidAddress(e.to_string()))?,
            deposit: Address::from_str(deposit)
                .map_err(|e| ChainError::InvalidAddress(e.to_string()))?,
        }))
    }

    /// WLD balance of the deposit address, human formatted.
    pub async fn deposit_balance_wld(&self) -> Result<String, ChainError> {
        let contract = IERC20::new(self.token, &self.provider);
        let balance: U256 = contract
            .balanceOf(self.deposit)
            .call()
            .await
            .map_err(|e| ChainError::ContractError(e.to_string()))?;
        Ok(format_token_balance(balance, 18))
    }

    /// Whether a transaction landed successfully on chain.
    ///
    /// Returns `false` for pending or failed transactions.
    pub async fn transfer_confirmed(&self, tx_hash: &str) -> Result<bool, ChainError> {
        let hash = TxHash::from_str(tx_hash.trim())
            .map_err(|e| ChainError::InvalidTxHash(e.to_string()))?;

        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))?;

        Ok(receipt.map(|r| r.status()).unwrap_or(false))
    }
}

/// Format a token balance with the specified decimals.
fn format_token_balance(balance: U256, decimals: u8) -> String {
    if balance.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = balance / divisor;
    let remainder = balance % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, &trimmed[..trimmed.len().min(6)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_token_balance_handles_fractions() {
        let one_wld = U256::from(1_000_000_000_000_000_000u64);
        assert_eq!(format_token_balance(one_wld, 18), "1");

        let half = U256::from(500_000_000_000_000_000u64);
        assert_eq!(format_token_balance(half, 18), "0.5");

        let complex = U256::from(1_234_567_890_000_000_000u64);
        assert_eq!(format_token_balance(complex, 18), "1.234567");

        assert_eq!(format_token_balance(U256::ZERO, 18), "0");
    }

    #[test]
    fn unconfigured_chain_client_is_none() {
        let client = ChainClient::from_config(&Config::for_tests()).unwrap();
        assert!(client.is_none());
    }
}
