//! `batchdl watch` – print progress records as they arrive.

use anyhow::Result;
use batchdl_core::ProgressRecord;
use std::path::Path;

use crate::cli::control_socket;

pub async fn run_watch(socket_path: &Path) -> Result<()> {
    control_socket::watch(socket_path, |record| {
        println!("{}", format_record(&record));
        true
    })
    .await
}

pub(crate) fn format_record(record: &ProgressRecord) -> String {
    let mut line = format!("#{} {}", record.id, record.status);
    match (record.bytes_received, record.total_bytes) {
        (Some(done), Some(total)) => line.push_str(&format!(" {done}/{total}")),
        (Some(done), None) => line.push_str(&format!(" {done}/?")),
        _ => {}
    }
    if let Some(path) = &record.local_path {
        line.push_str(&format!(" -> {}", path.display()));
    } else if !record.url.is_empty() {
        line.push_str(&format!(" {}", record.url));
    }
    if let Some(err) = &record.error {
        line.push_str(&format!(" ({err})"));
    }
    line
}
