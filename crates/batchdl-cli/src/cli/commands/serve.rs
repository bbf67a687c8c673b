//! `batchdl serve` – run the engine behind the control socket until Ctrl-C
//! or a `shutdown` query.

use anyhow::Result;
use batchdl_core::config::AgentConfig;
use batchdl_core::{Engine, EngineSettings};
use std::path::Path;

use crate::cli::control_socket::{self, AgentState};

pub async fn run_serve(cfg: &AgentConfig, socket_path: &Path) -> Result<()> {
    let engine = Engine::new(EngineSettings::from(cfg))?;
    let state = AgentState::new(engine, cfg.effective_root()?);
    let listener = control_socket::bind(socket_path).await?;
    tracing::info!(
        socket = %socket_path.display(),
        root = %state.root.display(),
        settings = ?state.engine.settings(),
        "agent listening"
    );
    println!("Listening on {}", socket_path.display());

    tokio::select! {
        _ = control_socket::accept_loop(listener, state.clone()) => {}
        _ = state.shutdown.notified() => {}
        signal = tokio::signal::ctrl_c() => signal?,
    }

    let stopped = state.engine.shutdown();
    if stopped > 0 {
        println!("Stopped {stopped} transfer(s); partial files are kept for resume.");
    }
    let _ = std::fs::remove_file(socket_path);
    Ok(())
}
