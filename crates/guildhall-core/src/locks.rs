//! Per-guild mutual exclusion
//!
//! One async mutex per guild id, created on first use. Unrelated guilds
//! never contend. Multi-guild operations lock in ascending id order.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Guard over one or two guild locks
pub struct GuildGuard {
    _first: OwnedMutexGuard<()>,
    _second: Option<OwnedMutexGuard<()>>,
}

/// Registry of per-guild locks
#[derive(Default)]
pub struct GuildLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl GuildLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, guild_id: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(guild_id).or_default().clone()
    }

    /// Lock a single guild
    pub async fn lock(&self, guild_id: Uuid) -> GuildGuard {
        let mutex = self.handle(guild_id);
        GuildGuard {
            _first: mutex.lock_owned().await,
            _second: None,
        }
    }

    /// Lock two guilds in a deadlock-free order
    pub async fn lock_pair(&self, a: Uuid, b: Uuid) -> GuildGuard {
        if a == b {
            return self.lock(a).await;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let low = self.handle(low);
        let high = self.handle(high);
        let first = low.lock_owned().await;
        let second = high.lock_owned().await;
        GuildGuard {
            _first: first,
            _second: Some(second),
        }
    }

    /// Drop the lock entry of a disbanded guild
    pub fn forget(&self, guild_id: Uuid) {
        self.locks.remove(&guild_id);
    }

    /// Number of guilds with a lock entry
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock has been created yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
