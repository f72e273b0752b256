// src/models.rs
use rust_decimal::Decimal;
use serde::Serialize;

/// A roster row with both a display name and a wallet address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRecord {
    pub name: String,
    pub address: String, // as entered in the roster, case preserved
}

/// OG (ERC-20) and ZOR (ERC-1155) respect held by one address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalancePair {
    pub og_respect: Decimal,
    pub zor_respect: Decimal,
}

impl BalancePair {
    pub fn total(&self) -> Decimal {
        self.og_respect + self.zor_respect
    }
}

/// One ranked row of the leaderboard, as served by `/api/leaderboard`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub name: String,
    pub address: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub og_respect: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub zor_respect: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_respect: Decimal,
}

impl LeaderboardEntry {
    /// Unranked entry; `rank` is filled in once the whole set is sorted.
    pub fn unranked(record: RosterRecord, balances: BalancePair) -> Self {
        Self {
            rank: 0,
            name: record.name,
            address: record.address,
            og_respect: balances.og_respect,
            zor_respect: balances.zor_respect,
            total_respect: balances.total(),
        }
    }
}
