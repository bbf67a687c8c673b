//! Control handler: applies cancel/resume/remove/clear against the shared
//! stores. Unknown ids are a no-op.

mod parse;

pub use parse::{parse_control_message, parse_control_value, ControlCommand, ControlParseError};
pub use parse::field;

use std::sync::Arc;

use crate::engine::Shared;
use crate::progress::ProgressRecord;
use crate::transfer::TransferJob;

pub(crate) fn execute(shared: &Arc<Shared>, command: ControlCommand) {
    tracing::debug!(command = command.name(), id = ?command.id(), "control command");
    match command {
        ControlCommand::Cancel(id) => {
            if !shared.control.cancel(id) {
                tracing::debug!(id, "cancel: no live transfer");
            }
        }
        ControlCommand::Resume(id) => resume(shared, id),
        ControlCommand::Remove(id) => {
            let was_running = shared.control.remove(id);
            let had_meta = shared.registry.remove_metadata(id).is_some();
            if !(was_running || had_meta || shared.hub.snapshot(id).is_some()) {
                tracing::debug!(id, "remove: unknown id");
                return;
            }
            shared.hub.publish(ProgressRecord::removed(id));
            tracing::info!(id, was_running, "transfer removed");
        }
        ControlCommand::Clear => {
            let cleared = shared.hub.clear_finished();
            if !cleared.is_empty() {
                tracing::info!(count = cleared.len(), "cleared finished transfers");
            }
        }
    }
}

fn resume(shared: &Arc<Shared>, id: u64) {
    let Some(meta) = shared.registry.metadata(id) else {
        tracing::debug!(id, "resume: unknown id");
        return;
    };
    let Some(handle) = shared.control.try_register(id) else {
        tracing::debug!(id, "resume: already running");
        return;
    };
    let ticket = meta.limiter.enqueue();
    tracing::info!(
        id,
        url = %meta.url,
        active = meta.limiter.active(),
        queued = meta.limiter.queued(),
        "resuming transfer"
    );
    shared.spawn_transfer(TransferJob::from_meta(id, &meta), handle, ticket);
}
