//! CLI command handlers. Each command is in its own file.

mod add;
mod control;
mod query;
mod serve;
mod watch;

pub use add::{run_add, AddArgs};
pub use control::run_control;
pub use query::{run_exists, run_root, run_shutdown, run_status};
pub use serve::run_serve;
pub use watch::run_watch;

#[cfg(test)]
pub(crate) use watch::format_record;
