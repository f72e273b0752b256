use alloy::primitives::{Address, U256};
use dotenvy::dotenv;
use eyre::{eyre, Result, WrapErr};
use std::{env, fmt, net::IpAddr, num::NonZeroUsize, time::Duration};
use tracing::info;

pub const DEFAULT_RPC_URL: &str = "https://mainnet.optimism.io";
pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com";
pub const DEFAULT_VIEW: &str = "Grid view";
pub const DEFAULT_NAME_FIELD: &str = "Name";
pub const DEFAULT_ADDRESS_FIELD: &str = "ETH WALLET (from Wallet Data 2)";

/// Where the roster lives and which columns to read
#[derive(Clone)]
pub struct AirtableConfig {
    pub api_url: String,
    pub api_token: String,
    pub base_id: String,
    pub table_name: String,
    pub view: String,
    pub name_field: String,
    pub address_field: String,
}

// Token stays out of the logs.
impl fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"<redacted>")
            .field("base_id", &self.base_id)
            .field("table_name", &self.table_name)
            .field("view", &self.view)
            .field("name_field", &self.name_field)
            .field("address_field", &self.address_field)
            .finish()
    }
}

/// Chain endpoint and the two respect contracts
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_http_url: String,
    pub og_contract: Address,
    pub zor_contract: Address,
    pub zor_token_id: U256,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub airtable: AirtableConfig,
    pub ledger: LedgerConfig,
    pub balance_concurrency: Option<NonZeroUsize>, // None = unbounded fan-out
    pub cache_fresh: Duration,
    pub cache_stale: Duration,
    pub rpc_timeout: Duration,
    pub roster_timeout: Duration,
    pub bind_addr: IpAddr,
    pub port: u16,
}

fn required(key: &str, alias: Option<&str>) -> Result<String> {
    env::var(key)
        .or_else(|e| match alias {
            Some(alias) => env::var(alias),
            None => Err(e),
        })
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| eyre!("missing required environment variable {}", key))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_address(key: &str, alias: &str) -> Result<Address> {
    let raw = required(key, Some(alias))?;
    raw.parse::<Address>()
        .wrap_err_with(|| format!("{} is not a valid contract address: {}", key, raw))
}

/// Ledger settings only; the probe tool does not need the roster credentials.
pub fn load_ledger() -> Result<LedgerConfig> {
    dotenv().ok();

    let rpc_http_url = env::var("RPC_HTTP_URL")
        .or_else(|_| env::var("ALCHEMY_OPTIMISM_RPC"))
        .unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());

    let zor_token_id = optional("ZOR_TOKEN_ID", "0");
    let zor_token_id = U256::from_str_radix(&zor_token_id, 10)
        .map_err(|e| eyre!("ZOR_TOKEN_ID is not a valid token id: {}", e))?;

    Ok(LedgerConfig {
        rpc_http_url,
        og_contract: parse_address("OG_CONTRACT", "ERC20_ZAO_CONTRACT")?,
        zor_contract: parse_address("ZOR_CONTRACT", "ERC1155_ZOR_CONTRACT")?,
        zor_token_id,
    })
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    let ledger = load_ledger()?;

    let airtable = AirtableConfig {
        api_url: optional("AIRTABLE_API_URL", DEFAULT_AIRTABLE_API_URL),
        api_token: required("AIRTABLE_API_TOKEN", None)?,
        base_id: required("AIRTABLE_BASE_ID", None)?,
        table_name: required("AIRTABLE_TABLE_NAME", None)?,
        view: optional("AIRTABLE_VIEW", DEFAULT_VIEW),
        name_field: optional("AIRTABLE_NAME_FIELD", DEFAULT_NAME_FIELD),
        address_field: optional("AIRTABLE_ADDRESS_FIELD", DEFAULT_ADDRESS_FIELD),
    };

    // Unset or 0 keeps the fan-out unbounded
    let balance_concurrency = env::var("BALANCE_CONCURRENCY")
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .and_then(NonZeroUsize::new);

    let cache_fresh = env::var("CACHE_FRESH_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300);

    let cache_stale = env::var("CACHE_STALE_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(600);

    // transport timeouts; the pipeline itself has none
    let rpc_timeout = env::var("RPC_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(15);

    let roster_timeout = env::var("ROSTER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let bind_addr = optional("BIND_ADDR", "127.0.0.1")
        .parse::<IpAddr>()
        .wrap_err("BIND_ADDR is not an IP address")?;

    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let cfg = Config {
        airtable,
        ledger,
        balance_concurrency,
        cache_fresh: Duration::from_secs(cache_fresh),
        cache_stale: Duration::from_secs(cache_stale),
        rpc_timeout: Duration::from_secs(rpc_timeout),
        roster_timeout: Duration::from_secs(roster_timeout),
        bind_addr,
        port,
    };

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}
