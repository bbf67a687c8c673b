//! batchdl core: batch download engine with live progress fan-out.
//!
//! The [`Engine`] owns every shared store (id registry, cancellation handles,
//! progress snapshots, observer set). Batches are scheduled as detached tasks
//! gated by a per-batch [`ConcurrencyLimiter`]; progress flows through the
//! [`ProgressHub`] to every subscribed sink.

pub mod config;
pub mod logging;

pub mod command;
pub mod control;
pub mod destination;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod progress;
pub mod registry;
pub mod request;
pub mod scheduler;
pub mod transfer;

pub use command::ControlCommand;
pub use engine::{Engine, EngineSettings};
pub use error::{DestinationError, EngineError, TransferError};
pub use limiter::ConcurrencyLimiter;
pub use progress::{ProgressHub, ProgressRecord, ProgressSink, SinkError, SubscriptionId, TransferStatus};
pub use registry::TransferId;
pub use request::DownloadRequest;
pub use scheduler::Batch;
