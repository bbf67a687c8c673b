//! Transfer worker: one run of one transfer, from slot acquisition to its
//! terminal progress record.
//!
//! Lifecycle per run: wait for a slot (cancellable), stream the body on the
//! blocking pool while publishing `downloading` after every chunk, then
//! publish exactly one of `completed`, `stopped`, or `error` and release the
//! cancellation handle. Partial files are left in place as resume points.

mod fetch;
pub mod filename;
pub mod throttle;

use std::path::PathBuf;
use std::sync::Arc;

use crate::control::TransferHandle;
use crate::engine::Shared;
use crate::error::TransferError;
use crate::limiter::SlotTicket;
use crate::progress::ProgressRecord;
use crate::registry::{ResumeMeta, TransferId};

use self::fetch::{FetchOutcome, FetchPlan};

/// Inputs of one run.
#[derive(Debug, Clone)]
pub(crate) struct TransferJob {
    pub id: TransferId,
    pub url: String,
    pub destination_dir: PathBuf,
    pub throttle_bytes_per_sec: u64,
}

impl TransferJob {
    pub(crate) fn from_meta(id: TransferId, meta: &ResumeMeta) -> Self {
        Self {
            id,
            url: meta.url.clone(),
            destination_dir: meta.destination_dir.clone(),
            throttle_bytes_per_sec: meta.throttle_bytes_per_sec,
        }
    }
}

/// Drive one run to completion. Spawned detached; its only effects are
/// files on disk and records published through the hub.
pub(crate) async fn run(
    shared: Arc<Shared>,
    job: TransferJob,
    handle: TransferHandle,
    ticket: SlotTicket,
) {
    let id = job.id;
    if handle.is_cancelled() {
        tracing::debug!(id, "cancelled before a slot was requested");
        shared.control.release(&handle);
        return;
    }

    let slot = tokio::select! {
        biased;
        _ = handle.token().cancelled() => None,
        slot = ticket.acquire() => Some(slot),
    };
    let slot = match slot {
        Some(slot) if !handle.is_cancelled() => slot,
        _ => {
            // The pending record stands until a later resume.
            tracing::debug!(id, "cancelled while queued");
            shared.control.release(&handle);
            return;
        }
    };

    tracing::debug!(id, url = %job.url, "transfer started");
    let record = execute(&shared, &job, &handle).await;
    shared.publish_from_worker(record);
    shared.control.release(&handle);
    drop(slot);
}

async fn execute(shared: &Arc<Shared>, job: &TransferJob, handle: &TransferHandle) -> ProgressRecord {
    let id = job.id;
    let url = job.url.clone();
    let dir = job.destination_dir.clone();
    let throttle = job.throttle_bytes_per_sec;
    let token = handle.token().clone();
    let worker = Arc::clone(shared);

    let joined = tokio::task::spawn_blocking(move || {
        let settings = worker.settings.clone();
        let plan = FetchPlan {
            url: &url,
            destination_dir: &dir,
            throttle_bytes_per_sec: throttle,
            settings: &settings,
        };
        let mut last: (Option<u64>, Option<u64>) = (None, None);
        let result = fetch::fetch(&plan, &token, &mut |received, total| {
            last = (Some(received), total);
            worker.publish_from_worker(ProgressRecord::downloading(id, &url, received, total));
        });
        (result, last)
    })
    .await;

    let url = job.url.as_str();
    match joined {
        Ok((Ok(FetchOutcome::Finished { received, total, local_path }), _)) => {
            tracing::info!(id, path = %local_path.display(), bytes = received, "transfer completed");
            ProgressRecord::completed(id, url, Some(received), total, local_path)
        }
        Ok((Ok(FetchOutcome::AlreadyComplete { local_path, length }), _)) => {
            tracing::info!(id, path = %local_path.display(), "server reports nothing left to fetch");
            ProgressRecord::completed(id, url, Some(length), Some(length), local_path)
        }
        Ok((Err(TransferError::Cancelled), (received, total))) => {
            tracing::info!(id, "transfer stopped");
            ProgressRecord::stopped(id, url, received, total)
        }
        Ok((Err(e), (received, total))) => {
            tracing::warn!(id, url, "transfer failed: {}", e);
            ProgressRecord::failed(id, url, e.to_string(), received, total)
        }
        Err(join) => {
            let e = TransferError::Join(join.to_string());
            tracing::warn!(id, url, "{}", e);
            ProgressRecord::failed(id, url, e.to_string(), None, None)
        }
    }
}
