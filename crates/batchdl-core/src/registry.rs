//! Id registry: ascending transfer ids and per-id resume metadata.
//!
//! Metadata is kept apart from run-time status so a transfer in a terminal
//! state can be restarted without the request that created it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::limiter::ConcurrencyLimiter;

/// Transfer identifier. Assigned at reservation, never reused.
pub type TransferId = u64;

/// What a resumed run needs: where the bytes come from, where they go, how fast.
#[derive(Debug, Clone)]
pub struct ResumeMeta {
    pub url: String,
    pub destination_dir: PathBuf,
    /// 0 = unlimited.
    pub throttle_bytes_per_sec: u64,
    /// Limiter of the batch that created this transfer; resumed runs queue on it again.
    pub(crate) limiter: Arc<ConcurrencyLimiter>,
}

#[derive(Debug)]
pub struct IdRegistry {
    next_id: Mutex<TransferId>,
    meta: Mutex<HashMap<TransferId, ResumeMeta>>,
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self {
            next_id: Mutex::new(1),
            meta: Mutex::new(HashMap::new()),
        }
    }
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next id. Strictly increasing across the engine's lifetime.
    pub fn reserve(&self) -> TransferId {
        let mut next = lock(&self.next_id);
        let id = *next;
        *next += 1;
        id
    }

    pub fn set_metadata(&self, id: TransferId, meta: ResumeMeta) {
        lock(&self.meta).insert(id, meta);
    }

    pub fn metadata(&self, id: TransferId) -> Option<ResumeMeta> {
        lock(&self.meta).get(&id).cloned()
    }

    pub fn contains(&self, id: TransferId) -> bool {
        lock(&self.meta).contains_key(&id)
    }

    pub fn remove_metadata(&self, id: TransferId) -> Option<ResumeMeta> {
        lock(&self.meta).remove(&id)
    }
}

/// Lock a std mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
