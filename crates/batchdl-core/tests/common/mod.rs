//! Shared helpers for the engine integration tests.

#![allow(dead_code)]

pub mod range_server;

use std::path::Path;
use std::time::Duration;

use batchdl_core::{Batch, Engine, EngineSettings, ProgressRecord, TransferId};
use tokio::sync::mpsc::UnboundedReceiver;

pub const WAIT: Duration = Duration::from_secs(20);

pub fn engine() -> Engine {
    engine_with_chunk(EngineSettings::default().chunk_size)
}

pub fn engine_with_chunk(chunk_size: usize) -> Engine {
    Engine::new(EngineSettings {
        connect_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(60),
        chunk_size,
    })
    .expect("inside runtime")
}

pub fn batch(urls: Vec<String>, dir: &Path, concurrency: i64, throttle: i64) -> Batch {
    Batch {
        urls,
        destination_dir: dir.to_path_buf(),
        concurrency,
        throttle_bytes_per_sec: throttle,
    }
}

/// Receive until `pred` matches, returning every record seen (the match last).
pub async fn collect_until(
    rx: &mut UnboundedReceiver<ProgressRecord>,
    mut pred: impl FnMut(&ProgressRecord) -> bool,
) -> Vec<ProgressRecord> {
    let mut seen = Vec::new();
    let fut = async {
        while let Some(rec) = rx.recv().await {
            let done = pred(&rec);
            seen.push(rec);
            if done {
                return;
            }
        }
        panic!("progress channel closed");
    };
    tokio::time::timeout(WAIT, fut)
        .await
        .expect("timed out waiting for progress");
    seen
}

/// Receive until the first terminal record for `id` and return it.
pub async fn terminal(rx: &mut UnboundedReceiver<ProgressRecord>, id: TransferId) -> ProgressRecord {
    let seen = collect_until(rx, |r| r.id == id && r.status.is_finished()).await;
    seen.into_iter().last().expect("at least one record")
}

/// Poll `cond` every 10ms until it holds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never held");
}

/// Records that arrive within `window`.
pub async fn drain_for(
    rx: &mut UnboundedReceiver<ProgressRecord>,
    window: Duration,
) -> Vec<ProgressRecord> {
    let mut out = Vec::new();
    let _ = tokio::time::timeout(window, async {
        while let Some(rec) = rx.recv().await {
            out.push(rec);
        }
    })
    .await;
    out
}

pub fn body(len: usize) -> Vec<u8> {
    (0u8..251).cycle().take(len).collect()
}
