//! Orchestrator: turns a batch into reserved ids and detached worker runs.
//!
//! Each batch gets its own [`ConcurrencyLimiter`]; every URL joins its queue
//! at submission time, so slots are handed out in submission order.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::Shared;
use crate::limiter::ConcurrencyLimiter;
use crate::progress::ProgressRecord;
use crate::registry::{ResumeMeta, TransferId};
use crate::transfer::TransferJob;

/// A validated batch: the destination is absolute and already checked.
#[derive(Debug, Clone)]
pub struct Batch {
    pub urls: Vec<String>,
    pub destination_dir: PathBuf,
    /// Clamped to at least 1.
    pub concurrency: i64,
    /// Clamped to at least 0; 0 = unlimited.
    pub throttle_bytes_per_sec: i64,
}

pub(crate) fn submit(shared: &Arc<Shared>, batch: Batch) -> BTreeMap<TransferId, String> {
    let concurrency = usize::try_from(batch.concurrency.max(1)).unwrap_or(usize::MAX);
    let throttle = u64::try_from(batch.throttle_bytes_per_sec.max(0)).unwrap_or(0);
    let limiter = ConcurrencyLimiter::new(concurrency);
    let mut submitted = BTreeMap::new();

    for url in batch.urls {
        let id = shared.registry.reserve();
        shared.registry.set_metadata(
            id,
            ResumeMeta {
                url: url.clone(),
                destination_dir: batch.destination_dir.clone(),
                throttle_bytes_per_sec: throttle,
                limiter: Arc::clone(&limiter),
            },
        );
        let handle = shared.control.register(id);
        let ticket = limiter.enqueue();
        shared.hub.publish(ProgressRecord::pending(id, &url));
        shared.spawn_transfer(
            TransferJob {
                id,
                url: url.clone(),
                destination_dir: batch.destination_dir.clone(),
                throttle_bytes_per_sec: throttle,
            },
            handle,
            ticket,
        );
        submitted.insert(id, url);
    }

    if !submitted.is_empty() {
        tracing::info!(
            count = submitted.len(),
            concurrency = limiter.capacity(),
            throttle,
            dest = %batch.destination_dir.display(),
            "batch submitted"
        );
    }
    submitted
}
