use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use respect_leaderboard::{
    api,
    cache::LeaderboardCache,
    config,
    ledger::{BalanceReader, JsonRpcLedger},
    pipeline::Pipeline,
    roster::AirtableRoster,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // RUST_LOG overrides; info by default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Respect leaderboard starting...");

    let cfg = config::load()?;
    info!("  RPC URL: {}", cfg.ledger.rpc_http_url);
    info!("  OG contract: {}", cfg.ledger.og_contract);
    info!(
        "  ZOR contract: {} (token id {})",
        cfg.ledger.zor_contract, cfg.ledger.zor_token_id
    );
    info!("  Roster table: {}", cfg.airtable.table_name);
    info!(
        "  Cache: fresh {:?}, stale {:?}",
        cfg.cache_fresh, cfg.cache_stale
    );
    match cfg.balance_concurrency {
        Some(limit) => info!("  Balance lookups: at most {} addresses in flight", limit),
        None => info!("  Balance lookups: unbounded"),
    }

    // One ledger connection and one roster client for the process lifetime
    let ledger = JsonRpcLedger::new(&cfg.ledger, cfg.rpc_timeout)?;
    let roster = AirtableRoster::new(cfg.airtable.clone(), cfg.roster_timeout)?;
    let pipeline = Pipeline::new(
        Arc::new(roster),
        BalanceReader::new(Arc::new(ledger)),
        cfg.balance_concurrency,
    );
    let cache = Arc::new(LeaderboardCache::new(
        pipeline,
        cfg.cache_fresh,
        cfg.cache_stale,
    ));

    // Warm the cache so the first visitor does not wait on the pipeline
    tokio::spawn({
        let cache = Arc::clone(&cache);
        async move {
            match cache.get().await {
                Ok(snapshot) => info!("Warm-up built {} entries", snapshot.entries.len()),
                Err(e) => warn!("Warm-up failed, will retry on first request: {}", e),
            }
        }
    });

    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        let cache = Arc::clone(&cache);
        async move { api::serve(cfg, cache).await }
    });

    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Respect leaderboard stopped.");
    Ok(())
}
