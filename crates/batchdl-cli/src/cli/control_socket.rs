//! Control socket: server (during `batchdl serve`) and client helpers.
//!
//! Protocol: newline-delimited JSON in both directions. The agent streams
//! every progress record to each connection (snapshot replay first). A line
//! carrying `links` is a batch submission and gets one reply line,
//! `{"submitted": {id: url}}` or `{"error": msg}`. A line carrying `query`
//! (`health`, `root`, `exists` with `path`, `shutdown`) gets one reply line
//! keyed by the query name. Any other line is a control message. Malformed
//! lines are ignored. Replies never carry `status`; progress records always do.

use anyhow::{bail, Context, Result};
use batchdl_core::command::field;
use batchdl_core::destination::resolve_destination;
use batchdl_core::{DownloadRequest, Engine, ProgressRecord, ProgressSink, SinkError};
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Notify};

/// Grace period between answering `shutdown` and stopping the agent, so the
/// reply line reaches the client.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(300);

/// What every connection of a running agent shares.
#[derive(Clone)]
pub struct AgentState {
    pub engine: Engine,
    /// Root every destination is resolved against.
    pub root: PathBuf,
    /// Notified once a client asks the agent to stop.
    pub shutdown: Arc<Notify>,
}

impl AgentState {
    pub fn new(engine: Engine, root: PathBuf) -> Self {
        Self {
            engine,
            root,
            shutdown: Arc::new(Notify::new()),
        }
    }
}

/// Progress observer that forwards records as JSON lines to a connection's writer task.
struct LineSink(mpsc::UnboundedSender<String>);

impl ProgressSink for LineSink {
    fn deliver(&self, record: &ProgressRecord) -> Result<(), SinkError> {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(id = record.id, "cannot encode progress record: {}", e);
                return Ok(());
            }
        };
        self.0.send(line).map_err(|_| SinkError::Closed)
    }
}

/// Bind `path`. A leftover socket file is replaced only if nothing answers
/// on it; a live agent already listening there is an error.
pub async fn bind(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if path.exists() {
        match UnixStream::connect(path).await {
            Ok(_) => bail!("another agent is already listening on {}", path.display()),
            Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::NotFound) => {
                tracing::debug!(path = %path.display(), "removing stale control socket");
                std::fs::remove_file(path)
                    .with_context(|| format!("remove stale socket {}", path.display()))?;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("connect to existing control socket {}", path.display()))
            }
        }
    }
    UnixListener::bind(path).with_context(|| format!("bind control socket {}", path.display()))
}

/// Serve connections until the task is dropped.
pub async fn accept_loop(listener: UnixListener, state: AgentState) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &state).await {
                        tracing::debug!("control connection: {:#}", e);
                    }
                });
            }
            Err(e) => tracing::debug!("control socket accept: {}", e),
        }
    }
}

async fn handle_connection(stream: UnixStream, state: &AgentState) -> Result<()> {
    let engine = &state.engine;
    let (read_half, mut write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let subscription = engine.subscribe(Arc::new(LineSink(tx.clone())));
    tracing::debug!(?subscription, "control client connected");
    let mut lines = BufReader::new(read_half).lines();
    let result = async {
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(reply) = dispatch(state, line) {
                let _ = tx.send(reply.to_string());
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    engine.unsubscribe(subscription);
    drop(tx);
    let _ = writer.await;
    tracing::debug!(?subscription, "control client disconnected");
    result
}

/// Apply one inbound line. Returns the reply for submissions and queries.
fn dispatch(state: &AgentState, line: &str) -> Option<Value> {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        tracing::debug!("ignoring non-JSON control line");
        return None;
    };
    if let Some(query) = value
        .as_object()
        .and_then(|obj| field(obj, "query"))
        .and_then(Value::as_str)
    {
        return Some(answer_query(state, &value, query));
    }
    if !DownloadRequest::looks_like(&value) {
        state.engine.handle_control_message(line);
        return None;
    }

    let batch = DownloadRequest::from_value(value)
        .map_err(anyhow::Error::from)
        .and_then(|req| req.into_batch(&state.root).map_err(anyhow::Error::from));
    let reply = match batch {
        Ok(batch) => json!({ "submitted": state.engine.submit_batch(batch) }),
        Err(e) => {
            tracing::info!("rejected batch: {:#}", e);
            json!({ "error": format!("{:#}", e) })
        }
    };
    Some(reply)
}

fn answer_query(state: &AgentState, value: &Value, query: &str) -> Value {
    match query.trim().to_ascii_lowercase().as_str() {
        "health" => json!({
            "health": { "status": "ok", "version": env!("CARGO_PKG_VERSION") }
        }),
        "root" => json!({ "root": state.root }),
        "exists" => {
            let path = value
                .as_object()
                .and_then(|obj| field(obj, "path"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            // Outside the root counts as absent, like a missing directory.
            json!({ "exists": resolve_destination(&state.root, path).is_ok() })
        }
        "shutdown" => {
            tracing::info!("shutdown requested over control socket");
            let notify = Arc::clone(&state.shutdown);
            tokio::spawn(async move {
                tokio::time::sleep(SHUTDOWN_GRACE).await;
                notify.notify_one();
            });
            json!({ "shutdown": "shutting down" })
        }
        other => json!({ "error": format!("unknown query {other:?}") }),
    }
}

/// Wire form of a query, `{"query": kind}` plus `path` for `exists`.
pub fn query_line(kind: &str, path: Option<&str>) -> String {
    match path {
        Some(path) => json!({ "query": kind, "path": path }).to_string(),
        None => json!({ "query": kind }).to_string(),
    }
}

/// Replies carry no `status`; progress records always do.
fn is_reply(value: &Value) -> bool {
    value.is_object() && value.get("status").is_none()
}

async fn connect(path: &Path) -> Result<UnixStream> {
    UnixStream::connect(path).await.with_context(|| {
        format!(
            "cannot reach agent at {} (is `batchdl serve` running?)",
            path.display()
        )
    })
}

/// Send one line and hang up without waiting for anything.
pub async fn send_line(path: &Path, line: &str) -> Result<()> {
    let mut stream = connect(path).await?;
    stream.write_all(format!("{line}\n").as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Send one line and wait for its reply, skipping progress records.
pub async fn request(path: &Path, line: &str) -> Result<Value> {
    let stream = connect(path).await?;
    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(format!("{line}\n").as_bytes()).await?;
    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        match serde_json::from_str::<Value>(&line) {
            Ok(value) if is_reply(&value) => return Ok(value),
            _ => continue,
        }
    }
    bail!("agent closed the connection without replying")
}

/// Stream progress records until the agent hangs up or `on_record` returns false.
pub async fn watch(path: &Path, mut on_record: impl FnMut(ProgressRecord) -> bool) -> Result<()> {
    let stream = connect(path).await?;
    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        match serde_json::from_str::<ProgressRecord>(&line) {
            Ok(record) => {
                if !on_record(record) {
                    break;
                }
            }
            Err(e) => tracing::debug!("skipping unexpected line from agent: {}", e),
        }
    }
    Ok(())
}
