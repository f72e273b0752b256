//! Probe a wallet's ZOR (ERC-1155) balance across a range of token ids,
//! plus its OG balance, to confirm which id and scaling the leaderboard
//! should use.

use alloy::primitives::{Address, U256};
use clap::Parser;
use eyre::WrapErr;
use std::time::Duration;

use respect_leaderboard::{abi, config, ledger::JsonRpcLedger};

#[derive(Debug, Parser)]
#[command(name = "check_zor", about = "Probe ZOR respect balances by token id")]
struct Args {
    /// Wallet address to inspect
    address: String,

    /// Highest token id to query (inclusive)
    #[arg(long, default_value_t = 10)]
    max_id: u64,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();
    let cfg = config::load_ledger()?;
    let owner: Address = args
        .address
        .trim()
        .parse()
        .wrap_err_with(|| format!("not a wallet address: {}", args.address))?;

    let ledger = JsonRpcLedger::new(&cfg, Duration::from_secs(args.timeout))?;

    println!("RPC: {}", cfg.rpc_http_url);
    println!("ERC1155 ZOR contract: {}", cfg.zor_contract);
    println!("Address: {}", owner);

    match ledger.og_balance_raw(owner).await {
        Ok(raw) => println!("OG respect (ERC20 {}): raw {} → {}", cfg.og_contract, raw, scaled(raw)),
        Err(e) => println!("OG respect (ERC20 {}): ERROR - {}", cfg.og_contract, e),
    }

    println!("\nChecking token IDs 0-{}...\n", args.max_id);
    for id in 0..=args.max_id {
        match ledger.zor_balance_raw(owner, U256::from(id)).await {
            Ok(raw) => {
                println!("Token ID {}:", id);
                println!("  Raw balance: {}", raw);
                println!("  With 18 decimals: {}", scaled(raw));
                println!("  With 0 decimals: {}", raw);
                println!();
            }
            Err(e) => println!("Token ID {}: ERROR - {}\n", id, e),
        }
    }

    Ok(())
}

fn scaled(raw: U256) -> String {
    abi::scale_respect(raw)
        .map(|d| d.to_string())
        .unwrap_or_else(|e| e.to_string())
}
