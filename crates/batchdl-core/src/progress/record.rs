//! Progress records: the unit broadcast to observers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::registry::TransferId;

/// Transfer status as seen by observers.
///
/// `Removed` is a broadcast-only signal telling observers to drop the id; it
/// is never kept in the snapshot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Downloading,
    Completed,
    Stopped,
    Error,
    Removed,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Downloading => "downloading",
            TransferStatus::Completed => "completed",
            TransferStatus::Stopped => "stopped",
            TransferStatus::Error => "error",
            TransferStatus::Removed => "removed",
        }
    }

    /// Completed, stopped, or error: the run is over and `clear` may drop it.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Stopped | TransferStatus::Error
        )
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress event for one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: TransferId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_received: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressRecord {
    fn bare(id: TransferId, url: &str, status: TransferStatus) -> Self {
        Self {
            id,
            url: url.to_string(),
            bytes_received: None,
            total_bytes: None,
            status,
            local_path: None,
            error: None,
        }
    }

    pub fn pending(id: TransferId, url: &str) -> Self {
        Self::bare(id, url, TransferStatus::Pending)
    }

    pub fn downloading(id: TransferId, url: &str, received: u64, total: Option<u64>) -> Self {
        Self {
            bytes_received: Some(received),
            total_bytes: total,
            ..Self::bare(id, url, TransferStatus::Downloading)
        }
    }

    pub fn completed(
        id: TransferId,
        url: &str,
        received: Option<u64>,
        total: Option<u64>,
        local_path: PathBuf,
    ) -> Self {
        Self {
            bytes_received: received,
            total_bytes: total,
            local_path: Some(local_path),
            ..Self::bare(id, url, TransferStatus::Completed)
        }
    }

    pub fn stopped(id: TransferId, url: &str, received: Option<u64>, total: Option<u64>) -> Self {
        Self {
            bytes_received: received,
            total_bytes: total,
            ..Self::bare(id, url, TransferStatus::Stopped)
        }
    }

    pub fn failed(
        id: TransferId,
        url: &str,
        message: String,
        received: Option<u64>,
        total: Option<u64>,
    ) -> Self {
        Self {
            bytes_received: received,
            total_bytes: total,
            error: Some(message),
            ..Self::bare(id, url, TransferStatus::Error)
        }
    }

    /// Zero-payload signal that `id` is gone.
    pub fn removed(id: TransferId) -> Self {
        Self::bare(id, "", TransferStatus::Removed)
    }
}
