//! Progress hub: last-known state per transfer plus fan-out to observers.
//!
//! Every publish updates the snapshot store and delivers to every observer
//! under one lock, so all observers see records in the order the store
//! applied them. New observers are registered and replayed under the same
//! lock: they see the full snapshot set in ascending id order before any
//! live record. Sinks must therefore never block or call back into the hub.

mod record;
mod sink;

pub use record::{ProgressRecord, TransferStatus};
pub use sink::{ProgressSink, SinkError};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::registry::{lock, TransferId};

/// Token returned by [`ProgressHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct HubState {
    snapshots: BTreeMap<TransferId, ProgressRecord>,
    observers: Vec<(SubscriptionId, Arc<dyn ProgressSink>)>,
    next_subscription: u64,
}

impl HubState {
    fn deliver(&self, record: &ProgressRecord) {
        for (_, sink) in &self.observers {
            if let Err(e) = sink.deliver(record) {
                tracing::debug!(id = record.id, "progress delivery failed: {}", e);
            }
        }
    }
}

#[derive(Default)]
pub struct ProgressHub {
    state: Mutex<HubState>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` as the id's last state (or drop it, for `removed`) and
    /// deliver it to every observer. Delivery failures are logged and ignored.
    pub fn publish(&self, record: ProgressRecord) {
        self.publish_when(record, || true);
    }

    /// Like [`publish`](Self::publish), but only if `live()` holds when checked
    /// under the hub lock. Lets a worker drop records for an id removed while
    /// it was still winding down.
    pub fn publish_when(&self, record: ProgressRecord, live: impl FnOnce() -> bool) {
        let mut state = lock(&self.state);
        if !live() {
            tracing::debug!(id = record.id, status = %record.status, "dropping record for removed transfer");
            return;
        }
        if record.status == TransferStatus::Removed {
            state.snapshots.remove(&record.id);
        } else {
            state.snapshots.insert(record.id, record.clone());
        }
        state.deliver(&record);
    }

    /// Register `sink` and replay the current snapshot set to it.
    pub fn subscribe(&self, sink: Arc<dyn ProgressSink>) -> SubscriptionId {
        let mut state = lock(&self.state);
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.observers.push((id, Arc::clone(&sink)));
        for record in state.snapshots.values() {
            if let Err(e) = sink.deliver(record) {
                tracing::debug!(id = record.id, "progress replay failed: {}", e);
                break;
            }
        }
        id
    }

    /// Subscribe an unbounded channel and return its receiving end.
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<ProgressRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.subscribe(Arc::new(tx)), rx)
    }

    /// Remove an observer. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = lock(&self.state);
        let before = state.observers.len();
        state.observers.retain(|(sub, _)| *sub != id);
        state.observers.len() != before
    }

    pub fn snapshot(&self, id: TransferId) -> Option<ProgressRecord> {
        lock(&self.state).snapshots.get(&id).cloned()
    }

    /// All snapshots in ascending id order.
    pub fn snapshots(&self) -> Vec<ProgressRecord> {
        lock(&self.state).snapshots.values().cloned().collect()
    }

    /// Drop every snapshot in a finished state and announce each as `removed`.
    /// Returns the cleared ids, ascending.
    pub(crate) fn clear_finished(&self) -> Vec<TransferId> {
        let mut state = lock(&self.state);
        let finished: Vec<TransferId> = state
            .snapshots
            .iter()
            .filter(|(_, rec)| rec.status.is_finished())
            .map(|(id, _)| *id)
            .collect();
        for id in &finished {
            state.snapshots.remove(id);
            state.deliver(&ProgressRecord::removed(*id));
        }
        finished
    }
}
