// src/table.rs
use serde::Deserialize;
use std::cmp::Ordering;

use crate::models::LeaderboardEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Rank,
    Name,
    OgRespect,
    ZorRespect,
    TotalRespect,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::Rank,
        SortField::Name,
        SortField::OgRespect,
        SortField::ZorRespect,
        SortField::TotalRespect,
    ];

    /// Direction used when a column is picked fresh: numbers high-to-low,
    /// rank and name in reading order.
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortField::Rank | SortField::Name => SortDirection::Asc,
            SortField::OgRespect | SortField::ZorRespect | SortField::TotalRespect => {
                SortDirection::Desc
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Rank => "rank",
            SortField::Name => "name",
            SortField::OgRespect => "ogRespect",
            SortField::ZorRespect => "zorRespect",
            SortField::TotalRespect => "totalRespect",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortField::Rank => "Rank",
            SortField::Name => "Name",
            SortField::OgRespect => "OG ZAO",
            SortField::ZorRespect => "ZOR",
            SortField::TotalRespect => "Total Respect",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SortField::OgRespect | SortField::ZorRespect | SortField::TotalRespect
        )
    }

    fn compare(self, a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
        match self {
            SortField::Rank => a.rank.cmp(&b.rank),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::OgRespect => a.og_respect.cmp(&b.og_respect),
            SortField::ZorRespect => a.zor_respect.cmp(&b.zor_respect),
            SortField::TotalRespect => a.total_respect.cmp(&b.total_respect),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: SortField::Rank,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    /// State after clicking the `field` header.
    pub fn select(self, field: SortField) -> Self {
        if field == self.field {
            Self {
                field,
                direction: self.direction.flip(),
            }
        } else {
            Self {
                field,
                direction: field.default_direction(),
            }
        }
    }
}

/// Query parameters shared by `/` and `/embed`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableQuery {
    pub sort: Option<SortField>,
    pub dir: Option<SortDirection>,
    pub q: Option<String>,
    pub limit: Option<usize>,
    /// Build stamp (unix millis) of the snapshot the previous view was drawn from
    pub at: Option<i64>,
}

/// How to show an already-ranked leaderboard. Never re-ranks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    pub sort: SortState,
    pub filter: String,
    pub limit: Option<usize>,
    pub seen: Option<i64>,
}

impl TableView {
    pub fn from_query(query: &TableQuery) -> Self {
        let sort = match query.sort {
            Some(field) => SortState {
                field,
                direction: query.dir.unwrap_or_else(|| field.default_direction()),
            },
            None => SortState::default(),
        };

        Self {
            sort,
            filter: query.q.as_deref().unwrap_or_default().trim().to_string(),
            // limit=0 means "no limit"
            limit: query.limit.filter(|n| *n > 0),
            seen: query.at,
        }
    }

    pub fn matches(&self, entry: &LeaderboardEntry) -> bool {
        if self.filter.is_empty() {
            return true;
        }
        let needle = self.filter.to_lowercase();
        entry.name.to_lowercase().contains(&needle) || entry.address.to_lowercase().contains(&needle)
    }

    /// Top `limit` entries by rank, then filtered, then sorted for display.
    pub fn rows<'a>(&self, ranked: &'a [LeaderboardEntry]) -> Vec<&'a LeaderboardEntry> {
        let top = match self.limit {
            Some(n) => &ranked[..n.min(ranked.len())],
            None => ranked,
        };

        let mut rows: Vec<_> = top.iter().filter(|e| self.matches(e)).collect();
        let SortState { field, direction } = self.sort;
        rows.sort_by(|a, b| {
            let ord = field.compare(a, b);
            let ord = match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            ord.then_with(|| a.rank.cmp(&b.rank))
        });
        rows
    }
}
