//! `batchdl status|root|exists|shutdown` – one query, one reply.

use anyhow::{bail, Result};
use serde_json::Value;
use std::path::Path;

use crate::cli::control_socket;

async fn ask(socket_path: &Path, kind: &str, path: Option<&str>) -> Result<Value> {
    let reply = control_socket::request(socket_path, &control_socket::query_line(kind, path)).await?;
    if let Some(err) = reply.get("error").and_then(Value::as_str) {
        bail!("agent rejected {kind}: {err}");
    }
    Ok(reply)
}

pub async fn run_status(socket_path: &Path) -> Result<()> {
    let reply = ask(socket_path, "health", None).await?;
    let health = &reply["health"];
    println!(
        "agent {} (version {})",
        health["status"].as_str().unwrap_or("unknown"),
        health["version"].as_str().unwrap_or("unknown")
    );
    Ok(())
}

pub async fn run_root(socket_path: &Path) -> Result<()> {
    let reply = ask(socket_path, "root", None).await?;
    println!("{}", reply["root"].as_str().unwrap_or_default());
    Ok(())
}

/// Exits non-zero when the directory is missing or outside the root.
pub async fn run_exists(socket_path: &Path, dir: &str) -> Result<()> {
    let reply = ask(socket_path, "exists", Some(dir)).await?;
    if reply["exists"].as_bool() != Some(true) {
        bail!("{dir:?} is not a directory under the agent's root");
    }
    println!("{dir} exists");
    Ok(())
}

pub async fn run_shutdown(socket_path: &Path) -> Result<()> {
    ask(socket_path, "shutdown", None).await?;
    println!("Agent is shutting down");
    Ok(())
}
