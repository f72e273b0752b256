//! Roster + balances → ranked leaderboard.

use futures_util::{future::join_all, stream, StreamExt};
use std::{num::NonZeroUsize, sync::Arc};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    ledger::BalanceReader,
    models::{BalancePair, LeaderboardEntry, RosterRecord},
    roster::{DataSourceError, RosterSource},
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch roster: {0}")]
    Roster(#[from] DataSourceError),
}

pub struct Pipeline {
    roster: Arc<dyn RosterSource>,
    balances: BalanceReader,
    concurrency: Option<NonZeroUsize>,
}

impl Pipeline {
    pub fn new(
        roster: Arc<dyn RosterSource>,
        balances: BalanceReader,
        concurrency: Option<NonZeroUsize>,
    ) -> Self {
        Self {
            roster,
            balances,
            concurrency,
        }
    }

    pub async fn build_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, PipelineError> {
        let roster = self.roster.fetch_roster().await.map_err(|e| {
            error!("❌ Roster fetch failed: {}", e);
            PipelineError::from(e)
        })?;

        info!("📡 Fetching balances for {} roster records", roster.len());
        let balances = self.fetch_all_balances(&roster).await;

        // results line up with the roster by index
        let entries = roster
            .into_iter()
            .zip(balances)
            .map(|(record, pair)| LeaderboardEntry::unranked(record, pair))
            .collect();

        let ranked = rank(entries);
        info!("Leaderboard ranked: {} entries", ranked.len());
        Ok(ranked)
    }

    async fn fetch_all_balances(&self, roster: &[RosterRecord]) -> Vec<BalancePair> {
        let lookups = roster
            .iter()
            .map(|record| self.balances.fetch_balances(&record.address))
            .collect::<Vec<_>>();

        match self.concurrency {
            None => join_all(lookups).await,
            Some(limit) => stream::iter(lookups).buffered(limit.get()).collect::<Vec<_>>().await,
        }
    }
}

/// Sort by total descending and number the rows 1..=N.
///
/// Equal totals fall back to lower-cased address, then name, so the order
/// does not depend on which lookup finished first.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.total_respect
            .cmp(&a.total_respect)
            .then_with(|| a.address.to_lowercase().cmp(&b.address.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{BalanceLookupError, RespectToken, TokenLedger};
    use alloy::primitives::Address;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use rust_decimal::Decimal;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::time::Instant;

    struct FixedRoster(Vec<RosterRecord>);

    #[async_trait]
    impl RosterSource for FixedRoster {
        async fn fetch_roster(&self) -> Result<Vec<RosterRecord>, DataSourceError> {
            Ok(self.0.clone())
        }
    }

    struct FailingRoster;

    #[async_trait]
    impl RosterSource for FailingRoster {
        async fn fetch_roster(&self) -> Result<Vec<RosterRecord>, DataSourceError> {
            Err(DataSourceError::Status {
                status: StatusCode::UNAUTHORIZED,
                body: "AUTHENTICATION_REQUIRED".into(),
            })
        }
    }

    /// Canned (og, zor) per owner; owners not listed revert. Counts calls.
    #[derive(Default)]
    struct FakeLedger {
        balances: HashMap<Address, (i64, i64)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenLedger for FakeLedger {
        async fn balance_of(
            &self,
            token: RespectToken,
            owner: Address,
        ) -> Result<Decimal, BalanceLookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.balances.get(&owner) {
                Some((og, zor)) => Ok(Decimal::from(match token {
                    RespectToken::Og => *og,
                    RespectToken::Zor => *zor,
                })),
                None => Err(BalanceLookupError::Rpc {
                    code: -32000,
                    message: "execution reverted".into(),
                }),
            }
        }
    }

    /// Balances derived from the owner's byte `n` (og = n, zor = 100 * n).
    /// Lower `n` answers later, so early roster rows finish last.
    struct SlowLedger {
        rows: u8,
    }

    #[async_trait]
    impl TokenLedger for SlowLedger {
        async fn balance_of(
            &self,
            token: RespectToken,
            owner: Address,
        ) -> Result<Decimal, BalanceLookupError> {
            let n = owner.as_slice()[0];
            let delay = Duration::from_millis(100 * u64::from(self.rows - n + 1));
            tokio::time::sleep(delay).await;
            Ok(Decimal::from(match token {
                RespectToken::Og => i64::from(n),
                RespectToken::Zor => 100 * i64::from(n),
            }))
        }
    }

    /// Every lookup takes one second.
    struct OneSecondLedger;

    #[async_trait]
    impl TokenLedger for OneSecondLedger {
        async fn balance_of(
            &self,
            _token: RespectToken,
            _owner: Address,
        ) -> Result<Decimal, BalanceLookupError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(Decimal::ONE)
        }
    }

    fn wallet(n: u8) -> String {
        format!("0x{}", hex::encode([n; 20]))
    }

    fn record(name: &str, n: u8) -> RosterRecord {
        RosterRecord {
            name: name.into(),
            address: wallet(n),
        }
    }

    fn pipeline(
        roster: Vec<RosterRecord>,
        balances: &[(u8, i64, i64)],
        concurrency: Option<usize>,
    ) -> (Pipeline, Arc<FakeLedger>) {
        let ledger = Arc::new(FakeLedger {
            balances: balances
                .iter()
                .map(|(n, og, zor)| (Address::repeat_byte(*n), (*og, *zor)))
                .collect(),
            calls: AtomicUsize::new(0),
        });
        let pipeline = Pipeline::new(
            Arc::new(FixedRoster(roster)),
            BalanceReader::new(ledger.clone()),
            concurrency.and_then(NonZeroUsize::new),
        );
        (pipeline, ledger)
    }

    fn assert_ranked(entries: &[LeaderboardEntry]) {
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.rank as usize, i + 1);
            assert_eq!(entry.total_respect, entry.og_respect + entry.zor_respect);
        }
        for pair in entries.windows(2) {
            assert!(pair[0].total_respect >= pair[1].total_respect);
        }
    }

    #[tokio::test]
    async fn failing_participant_is_zeroed_and_ranked_last() {
        let (pipeline, _) = pipeline(
            vec![record("X", 0xaa), record("Y", 0xbb)],
            &[(0xbb, 10, 5)],
            None,
        );

        let board = pipeline.build_leaderboard().await.unwrap();
        assert_eq!(board.len(), 2);

        assert_eq!(board[0].name, "Y");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].og_respect, Decimal::from(10));
        assert_eq!(board[0].zor_respect, Decimal::from(5));
        assert_eq!(board[0].total_respect, Decimal::from(15));

        assert_eq!(board[1].name, "X");
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[1].total_respect, Decimal::ZERO);
        assert_eq!(board[1].og_respect, Decimal::ZERO);
        assert_eq!(board[1].zor_respect, Decimal::ZERO);
    }

    #[tokio::test]
    async fn every_roster_record_gets_exactly_one_entry() {
        let roster: Vec<_> = (1..=25u8).map(|n| record(&format!("m{n}"), n)).collect();
        let balances: Vec<_> = (1..=25u8)
            .filter(|n| n % 3 != 0)
            .map(|n| (n, (n as i64 * 7) % 11, (n as i64 * 5) % 13))
            .collect();
        let (pipeline, ledger) = pipeline(roster, &balances, None);

        let board = pipeline.build_leaderboard().await.unwrap();
        assert_eq!(board.len(), 25);
        assert_ranked(&board);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn empty_roster_gives_empty_board() {
        let (pipeline, ledger) = pipeline(Vec::new(), &[], None);
        assert!(pipeline.build_leaderboard().await.unwrap().is_empty());
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bounded_fan_out_matches_unbounded() {
        let roster: Vec<_> = (1..=12u8).map(|n| record(&format!("m{n}"), n)).collect();
        let balances: Vec<_> = (1..=12u8).map(|n| (n, n as i64, 12 - n as i64)).collect();

        let (unbounded, _) = pipeline(roster.clone(), &balances, None);
        let (bounded, _) = pipeline(roster, &balances, Some(3));

        assert_eq!(
            unbounded.build_leaderboard().await.unwrap(),
            bounded.build_leaderboard().await.unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_answers_stay_with_their_roster_row() {
        let rows = 8u8;
        let roster: Vec<_> = (1..=rows).map(|n| record(&format!("m{n}"), n)).collect();

        for concurrency in [None, Some(3), Some(1)] {
            let pipeline = Pipeline::new(
                Arc::new(FixedRoster(roster.clone())),
                BalanceReader::new(Arc::new(SlowLedger { rows })),
                concurrency.and_then(NonZeroUsize::new),
            );

            let board = pipeline.build_leaderboard().await.unwrap();
            assert_eq!(board.len(), rows as usize, "{concurrency:?}");
            assert_ranked(&board);
            for entry in &board {
                let n: i64 = entry.name[1..].parse().unwrap();
                assert_eq!(entry.address, wallet(n as u8), "{concurrency:?}");
                assert_eq!(entry.og_respect, Decimal::from(n), "{concurrency:?}");
                assert_eq!(entry.zor_respect, Decimal::from(100 * n), "{concurrency:?}");
            }
            assert_eq!(board[0].name, format!("m{rows}"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_lookups_run_concurrently() {
        let roster: Vec<_> = (1..=20u8).map(|n| record(&format!("m{n}"), n)).collect();
        let pipeline = Pipeline::new(
            Arc::new(FixedRoster(roster.clone())),
            BalanceReader::new(Arc::new(OneSecondLedger)),
            None,
        );

        let started = Instant::now();
        let board = pipeline.build_leaderboard().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(board.len(), 20);
        assert!(board.iter().all(|e| e.total_respect == Decimal::from(2)));
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");

        // a cap of 5 takes four rounds
        let bounded = Pipeline::new(
            Arc::new(FixedRoster(roster)),
            BalanceReader::new(Arc::new(OneSecondLedger)),
            NonZeroUsize::new(5),
        );
        let started = Instant::now();
        bounded.build_leaderboard().await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_millis(4500), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn repeated_runs_serialize_identically() {
        let roster = vec![record("A", 1), record("B", 2), record("C", 3)];
        let (pipeline, _) = pipeline(roster, &[(1, 4, 4), (2, 8, 0), (3, 1, 2)], None);

        let first = serde_json::to_vec(&pipeline.build_leaderboard().await.unwrap()).unwrap();
        let second = serde_json::to_vec(&pipeline.build_leaderboard().await.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn roster_failure_aborts_without_balance_calls() {
        let ledger = Arc::new(FakeLedger::default());
        let pipeline = Pipeline::new(
            Arc::new(FailingRoster),
            BalanceReader::new(ledger.clone()),
            None,
        );

        let err = pipeline.build_leaderboard().await.unwrap_err();
        assert!(matches!(err, PipelineError::Roster(_)));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ties_break_on_address_then_name() {
        let entry = |name: &str, address: &str| LeaderboardEntry {
            rank: 0,
            name: name.into(),
            address: address.into(),
            og_respect: Decimal::ONE,
            zor_respect: Decimal::ZERO,
            total_respect: Decimal::ONE,
        };

        let ranked = rank(vec![
            entry("b", "0xBB"),
            entry("z", "0xaa"),
            entry("a", "0xaa"),
        ]);
        let order: Vec<_> = ranked.iter().map(|e| (e.rank, e.name.as_str())).collect();
        assert_eq!(order, [(1, "a"), (2, "z"), (3, "b")]);
    }
}
