//! `batchdl add <urls…>` – submit a batch to the running agent.

use anyhow::{bail, Result};
use batchdl_core::DownloadRequest;
use std::path::Path;

use crate::cli::control_socket;

#[derive(Debug)]
pub struct AddArgs {
    pub urls: Vec<String>,
    pub dest: String,
    pub concurrency: i64,
    pub throttle: i64,
}

pub async fn run_add(socket_path: &Path, args: AddArgs) -> Result<()> {
    let request = DownloadRequest {
        destination: args.dest,
        links: args.urls,
        concurrency: args.concurrency,
        throttle_bytes_per_second: args.throttle,
    };
    let reply = control_socket::request(socket_path, &serde_json::to_string(&request)?).await?;
    if let Some(err) = reply.get("error").and_then(|e| e.as_str()) {
        bail!("agent rejected batch: {err}");
    }
    if let Some(submitted) = reply.get("submitted").and_then(|s| s.as_object()) {
        for (id, url) in submitted {
            println!("{id}\t{}", url.as_str().unwrap_or_default());
        }
    }
    Ok(())
}
