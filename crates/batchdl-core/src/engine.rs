//! Engine facade: owns the shared stores and exposes the inbound interface
//! (batch submission, control messages, observer subscription).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::command::{self, ControlCommand};
use crate::config::AgentConfig;
use crate::control::{TransferControl, TransferHandle};
use crate::error::EngineError;
use crate::limiter::SlotTicket;
use crate::progress::{ProgressHub, ProgressRecord, ProgressSink, SubscriptionId};
use crate::registry::{IdRegistry, TransferId};
use crate::scheduler::{self, Batch};
use crate::transfer::{self, TransferJob};

/// Transport settings applied to every transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub connect_timeout: Duration,
    /// Upper bound on one whole HTTP exchange.
    pub request_timeout: Duration,
    /// Receive buffer size; bounds the size of one progress step.
    pub chunk_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
            chunk_size: 80 * 1024,
        }
    }
}

impl From<&AgentConfig> for EngineSettings {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs.max(1)),
            request_timeout: Duration::from_secs(cfg.effective_timeout_secs()),
            chunk_size: cfg.chunk_size.max(1024),
        }
    }
}

/// State shared by the orchestrator, workers, control handler and hub.
pub(crate) struct Shared {
    pub registry: IdRegistry,
    pub control: TransferControl,
    pub hub: ProgressHub,
    pub settings: EngineSettings,
    runtime: Handle,
}

impl Shared {
    /// Publish on behalf of a worker; dropped if the id has been removed.
    pub(crate) fn publish_from_worker(&self, record: ProgressRecord) {
        let id = record.id;
        self.hub
            .publish_when(record, || self.registry.contains(id));
    }

    pub(crate) fn spawn_transfer(
        self: &Arc<Self>,
        job: TransferJob,
        handle: TransferHandle,
        ticket: SlotTicket,
    ) {
        self.runtime
            .spawn(transfer::run(Arc::clone(self), job, handle, ticket));
    }
}

/// The download orchestration and progress-broadcast engine.
///
/// Cheap to clone; all clones drive the same stores.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Create an engine bound to the current Tokio runtime.
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        Ok(Self {
            shared: Arc::new(Shared {
                registry: IdRegistry::new(),
                control: TransferControl::new(),
                hub: ProgressHub::new(),
                settings,
                runtime,
            }),
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.shared.settings
    }

    /// Reserve ids for every URL and schedule them. Returns before any
    /// transfer has finished.
    pub fn submit_batch(&self, batch: Batch) -> BTreeMap<TransferId, String> {
        scheduler::submit(&self.shared, batch)
    }

    /// Parse and apply one raw control message. Malformed input is ignored.
    pub fn handle_control_message(&self, raw: &str) {
        match command::parse_control_message(raw) {
            Ok(cmd) => self.execute(cmd),
            Err(e) => tracing::debug!("ignoring control message: {}", e),
        }
    }

    pub fn execute(&self, command: ControlCommand) {
        command::execute(&self.shared, command);
    }

    pub fn subscribe(&self, sink: Arc<dyn ProgressSink>) -> SubscriptionId {
        self.shared.hub.subscribe(sink)
    }

    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<ProgressRecord>) {
        self.shared.hub.subscribe_channel()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.hub.unsubscribe(id)
    }

    /// Last known record of every tracked transfer, ascending by id.
    pub fn snapshots(&self) -> Vec<ProgressRecord> {
        self.shared.hub.snapshots()
    }

    /// Whether a run is currently scheduled or running for `id`.
    pub fn is_active(&self, id: TransferId) -> bool {
        self.shared.control.is_active(id)
    }

    /// Signal every live transfer. Running ones end as `stopped`.
    pub fn shutdown(&self) -> usize {
        let n = self.shared.control.cancel_all();
        tracing::info!("shutdown: cancelled {} transfer(s)", n);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_outside_runtime_fails() {
        assert!(matches!(
            Engine::new(EngineSettings::default()),
            Err(EngineError::NoRuntime)
        ));
    }

    #[test]
    fn settings_from_config_clamp_timeout() {
        let cfg = AgentConfig {
            max_timeout_secs: 0,
            ..AgentConfig::default()
        };
        let settings = EngineSettings::from(&cfg);
        assert_eq!(settings.request_timeout, Duration::from_secs(600));
        assert_eq!(settings.chunk_size, cfg.chunk_size);
    }
}
