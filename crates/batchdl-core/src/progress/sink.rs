//! Observer sinks. A sink must not block: the hub delivers from worker
//! threads and while holding its snapshot lock during replay.

use tokio::sync::mpsc;

use super::record::ProgressRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("observer disconnected")]
    Closed,
    #[error("observer is not keeping up; record dropped")]
    Full,
}

/// Receives every progress record published while subscribed.
pub trait ProgressSink: Send + Sync {
    fn deliver(&self, record: &ProgressRecord) -> Result<(), SinkError>;
}

impl ProgressSink for mpsc::UnboundedSender<ProgressRecord> {
    fn deliver(&self, record: &ProgressRecord) -> Result<(), SinkError> {
        self.send(record.clone()).map_err(|_| SinkError::Closed)
    }
}

impl ProgressSink for mpsc::Sender<ProgressRecord> {
    fn deliver(&self, record: &ProgressRecord) -> Result<(), SinkError> {
        self.try_send(record.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
