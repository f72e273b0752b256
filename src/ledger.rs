//! On-chain respect balances.
//!
//! [`JsonRpcLedger`] issues `balanceOf` calls against the OG (ERC-20) and ZOR
//! (ERC-1155) contracts. [`BalanceReader`] sits on top of any [`TokenLedger`]
//! and never fails: a lookup that errors is logged and counted as zero, so one
//! bad contract call does not blank the whole row.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{abi, config::LedgerConfig, models::BalancePair, rpc};

#[derive(Debug, Error)]
pub enum BalanceLookupError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("rpc request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc returned HTTP {0}")]
    Status(StatusCode),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    Malformed(String),
    #[error("balance {0} does not fit an 18-decimal value")]
    Overflow(U256),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespectToken {
    /// ERC-20 balance
    Og,
    /// ERC-1155 balance of the configured token id
    Zor,
}

impl fmt::Display for RespectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespectToken::Og => f.write_str("OG"),
            RespectToken::Zor => f.write_str("ZOR"),
        }
    }
}

/// A source of scaled respect balances.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn balance_of(
        &self,
        token: RespectToken,
        owner: Address,
    ) -> Result<Decimal, BalanceLookupError>;
}

/// Long-lived JSON-RPC connection plus both contract bindings.
#[derive(Debug, Clone)]
pub struct JsonRpcLedger {
    client: Client,
    rpc_url: String,
    og_contract: Address,
    zor_contract: Address,
    zor_token_id: U256,
}

impl JsonRpcLedger {
    pub fn new(cfg: &LedgerConfig, timeout: Duration) -> eyre::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            rpc_url: cfg.rpc_http_url.clone(),
            og_contract: cfg.og_contract,
            zor_contract: cfg.zor_contract,
            zor_token_id: cfg.zor_token_id,
        })
    }

    /// Unscaled ERC-1155 balance for an arbitrary token id
    pub async fn zor_balance_raw(
        &self,
        owner: Address,
        token_id: U256,
    ) -> Result<U256, BalanceLookupError> {
        let data = abi::encode_erc1155_balance_of(owner, token_id);
        let ret = rpc::eth_call(&self.client, &self.rpc_url, self.zor_contract, &data).await?;
        abi::decode_uint256(&ret)
    }

    /// Unscaled ERC-20 balance
    pub async fn og_balance_raw(&self, owner: Address) -> Result<U256, BalanceLookupError> {
        let data = abi::encode_erc20_balance_of(owner);
        let ret = rpc::eth_call(&self.client, &self.rpc_url, self.og_contract, &data).await?;
        abi::decode_uint256(&ret)
    }
}

#[async_trait]
impl TokenLedger for JsonRpcLedger {
    async fn balance_of(
        &self,
        token: RespectToken,
        owner: Address,
    ) -> Result<Decimal, BalanceLookupError> {
        let raw = match token {
            RespectToken::Og => self.og_balance_raw(owner).await?,
            RespectToken::Zor => self.zor_balance_raw(owner, self.zor_token_id).await?,
        };
        debug!("{} respect for {}: raw {}", token, owner, raw);
        abi::scale_respect(raw)
    }
}

#[derive(Clone)]
pub struct BalanceReader {
    ledger: Arc<dyn TokenLedger>,
}

impl BalanceReader {
    pub fn new(ledger: Arc<dyn TokenLedger>) -> Self {
        Self { ledger }
    }

    /// Both balances for `address`; failures collapse to zero per token.
    pub async fn fetch_balances(&self, address: &str) -> BalancePair {
        let owner = match address.trim().parse::<Address>() {
            Ok(owner) => owner,
            Err(_) => {
                let err = BalanceLookupError::InvalidAddress(address.to_string());
                warn!("⚠️ Skipping balance lookups: {}", err);
                return BalancePair::default();
            }
        };

        let (og_respect, zor_respect) = tokio::join!(
            self.lookup(RespectToken::Og, owner),
            self.lookup(RespectToken::Zor, owner),
        );

        let pair = BalancePair {
            og_respect,
            zor_respect,
        };
        debug!(
            "Balances for {}: OG {} + ZOR {} = {}",
            address,
            pair.og_respect,
            pair.zor_respect,
            pair.total()
        );
        pair
    }

    async fn lookup(&self, token: RespectToken, owner: Address) -> Decimal {
        match self.ledger.balance_of(token, owner).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("⚠️ {} respect lookup failed for {}: {}", token, owner, e);
                Decimal::ZERO
            }
        }
    }
}
