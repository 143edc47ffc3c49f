//! Per-seed async mutex registry
//!
//! Serialises state-changing operations for one seed while letting
//! different seeds proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry size above which idle entries are pruned
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default, Clone)]
pub struct SeedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SeedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `seed_id`, waiting for any holder to finish
    pub async fn lock(&self, seed_id: &str) -> OwnedMutexGuard<()> {
        let seed_lock = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            if map.len() > PRUNE_THRESHOLD {
                // Entries only referenced by the map have no holder or waiter
                map.retain(|_, lock| Arc::strong_count(lock) > 1);
            }

            map.entry(seed_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        seed_lock.lock_owned().await
    }

    /// Number of seeds currently tracked
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
