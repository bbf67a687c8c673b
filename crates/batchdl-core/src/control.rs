//! Cancellation handles: one per scheduled or running transfer.
//!
//! A handle is registered when a run is scheduled (batch submission or
//! resume) and released when that run exits. The control handler signals
//! handles; workers check them at their suspension points.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::registry::{lock, TransferId};

/// Handle for one run of one transfer. The generation distinguishes runs of
/// the same id so a finished run never releases its successor's handle.
#[derive(Debug, Clone)]
pub struct TransferHandle {
    pub id: TransferId,
    generation: u64,
    token: CancellationToken,
}

impl TransferHandle {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub struct TransferControl {
    handles: Mutex<HashMap<TransferId, TransferHandle>>,
    generations: AtomicU64,
}

impl TransferControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&self, id: TransferId) -> TransferHandle {
        TransferHandle {
            id,
            generation: self.generations.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        }
    }

    /// Register a handle for a newly reserved id.
    pub fn register(&self, id: TransferId) -> TransferHandle {
        let handle = self.fresh(id);
        if let Some(stale) = lock(&self.handles).insert(id, handle.clone()) {
            stale.token.cancel();
        }
        handle
    }

    /// Register a handle only if no run is scheduled or running for `id`.
    /// Check and insert happen under one lock so concurrent resumes cannot
    /// both succeed.
    pub fn try_register(&self, id: TransferId) -> Option<TransferHandle> {
        let mut handles = lock(&self.handles);
        if handles.contains_key(&id) {
            return None;
        }
        let handle = self.fresh(id);
        handles.insert(id, handle.clone());
        Some(handle)
    }

    /// Signal the run for `id`, if any. Returns whether a handle existed.
    pub fn cancel(&self, id: TransferId) -> bool {
        match lock(&self.handles).get(&id) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Signal and forget the handle for `id`.
    pub fn remove(&self, id: TransferId) -> bool {
        match lock(&self.handles).remove(&id) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Release the handle of a finished run. No-op if the id has since been
    /// removed or re-registered by another run.
    pub fn release(&self, handle: &TransferHandle) {
        let mut handles = lock(&self.handles);
        if handles
            .get(&handle.id)
            .is_some_and(|h| h.generation == handle.generation)
        {
            handles.remove(&handle.id);
        }
    }

    pub fn is_active(&self, id: TransferId) -> bool {
        lock(&self.handles).contains_key(&id)
    }

    /// Signal every live handle (used on shutdown).
    pub fn cancel_all(&self) -> usize {
        let handles = lock(&self.handles);
        for handle in handles.values() {
            handle.token.cancel();
        }
        handles.len()
    }
}
