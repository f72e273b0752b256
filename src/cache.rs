//! Last computed leaderboard, served with a freshness window and a
//! stale-while-revalidate window (defaults 300 s and 600 s).
//!
//! Inside the freshness window the same snapshot is returned, so repeated
//! requests get byte-identical responses. In the stale window the snapshot is
//! still returned while one background task rebuilds it. Past both windows
//! the caller waits for a rebuild.

use chrono::{DateTime, Utc};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use tracing::{error, info};

use crate::{
    models::LeaderboardEntry,
    pipeline::{Pipeline, PipelineError},
};

#[derive(Debug)]
pub struct Snapshot {
    pub entries: Vec<LeaderboardEntry>,
    pub generated_at: DateTime<Utc>,
    built_at: Instant,
}

pub struct LeaderboardCache {
    pipeline: Pipeline,
    fresh: Duration,
    stale: Duration,
    current: RwLock<Option<Arc<Snapshot>>>,
    rebuild: Mutex<()>,
    refreshing: AtomicBool,
}

impl LeaderboardCache {
    pub fn new(pipeline: Pipeline, fresh: Duration, stale: Duration) -> Self {
        Self {
            pipeline,
            fresh,
            stale,
            current: RwLock::new(None),
            rebuild: Mutex::new(()),
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn fresh_window(&self) -> Duration {
        self.fresh
    }

    pub fn stale_window(&self) -> Duration {
        self.stale
    }

    pub async fn get(self: &Arc<Self>) -> Result<Arc<Snapshot>, PipelineError> {
        if let Some(snapshot) = self.current.read().await.clone() {
            let age = snapshot.built_at.elapsed();
            if age < self.fresh {
                return Ok(snapshot);
            }
            if age < self.fresh + self.stale {
                self.spawn_refresh();
                return Ok(snapshot);
            }
        }

        // concurrent misses wait on one rebuild
        let _guard = self.rebuild.lock().await;
        if let Some(snapshot) = self.current.read().await.clone() {
            if snapshot.built_at.elapsed() < self.fresh {
                return Ok(snapshot);
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<Arc<Snapshot>, PipelineError> {
        let entries = self.pipeline.build_leaderboard().await?;
        let snapshot = Arc::new(Snapshot {
            entries,
            generated_at: Utc::now(),
            built_at: Instant::now(),
        });
        *self.current.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn spawn_refresh(self: &Arc<Self>) {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            return;
        }

        let cache = Arc::clone(self);
        tokio::spawn(async move {
            match cache.refresh().await {
                Ok(snapshot) => info!(
                    "🔄 Background refresh done: {} entries",
                    snapshot.entries.len()
                ),
                Err(e) => error!("Background refresh failed, keeping stale leaderboard: {}", e),
            }
            cache.refreshing.store(false, Ordering::Release);
        });
    }
}
