//! Blocking HTTP leg of a run: one curl Easy handle, driven on Tokio's
//! blocking pool. Resumes from the length of an existing destination file.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use curl::easy::Easy;
use tokio_util::sync::CancellationToken;

use super::filename;
use super::throttle::{sleep_unless_cancelled, Throttle};
use crate::engine::EngineSettings;
use crate::error::TransferError;

const MAX_REDIRECTS: u32 = 10;
const RANGE_NOT_SATISFIABLE: u32 = 416;

pub(crate) struct FetchPlan<'a> {
    pub url: &'a str,
    pub destination_dir: &'a Path,
    pub throttle_bytes_per_sec: u64,
    pub settings: &'a EngineSettings,
}

#[derive(Debug)]
pub(crate) enum FetchOutcome {
    /// Body fully written.
    Finished {
        received: u64,
        total: Option<u64>,
        local_path: PathBuf,
    },
    /// Server answered 416 to the resume request: the file is already whole.
    AlreadyComplete { local_path: PathBuf, length: u64 },
}

/// Status line and the headers we care about, for the final response only.
#[derive(Debug, Default)]
struct ResponseHead {
    status: u32,
    content_length: Option<u64>,
    content_disposition: Option<String>,
}

impl ResponseHead {
    fn feed(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            return;
        };
        let line = line.trim_end();
        if line.starts_with("HTTP/") {
            // New response (redirect hop or final): start over.
            *self = ResponseHead {
                status: line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|code| code.parse().ok())
                    .unwrap_or(0),
                ..Default::default()
            };
        } else if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                self.content_length = value.parse().ok();
            } else if name.eq_ignore_ascii_case("content-disposition") {
                self.content_disposition = Some(value.to_string());
            }
        }
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn is_partial(&self) -> bool {
        self.status == 206
    }
}

/// Destination file opened once the response head is known.
struct BodyWriter {
    file: File,
    path: PathBuf,
    received: u64,
    total: Option<u64>,
}

impl BodyWriter {
    fn open(
        head: &ResponseHead,
        dir: &Path,
        guessed: &Path,
        requested_offset: u64,
    ) -> Result<Self, TransferError> {
        let partial = head.is_partial();
        let mut path = guessed.to_path_buf();
        let mut existing = requested_offset;

        if let Some(name) = head
            .content_disposition
            .as_deref()
            .and_then(filename::name_from_disposition)
        {
            let announced = dir.join(name);
            if announced != path {
                let announced_len = existing_len(&announced)?;
                if partial && announced_len != requested_offset {
                    // The range was computed against the guessed file; appending
                    // it anywhere else would leave a gap or an overlap.
                    tracing::debug!(
                        path = %announced.display(),
                        "server-announced name does not match resume offset; keeping {}",
                        path.display()
                    );
                } else {
                    path = announced;
                    existing = announced_len;
                }
            }
        }

        let opened = if partial {
            OpenOptions::new().create(true).append(true).open(&path)
        } else {
            File::create(&path)
        };
        let file =
            opened.map_err(|e| TransferError::storage(format!("open {}", path.display()), e))?;
        let received = if partial { existing } else { 0 };

        Ok(Self {
            file,
            total: head.content_length.map(|len| len + received),
            path,
            received,
        })
    }

    fn append(&mut self, data: &[u8]) -> Result<(), TransferError> {
        self.received += data.len() as u64;
        self.file
            .write_all(data)
            .map_err(|e| TransferError::storage(format!("write {}", self.path.display()), e))
    }

    fn finish(mut self) -> Result<FetchOutcome, TransferError> {
        self.file
            .flush()
            .map_err(|e| TransferError::storage(format!("flush {}", self.path.display()), e))?;
        Ok(FetchOutcome::Finished {
            received: self.received,
            total: self.total,
            local_path: self.path,
        })
    }
}

/// Length of the file at `path`, or 0 if it does not exist.
fn existing_len(path: &Path) -> Result<u64, TransferError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Ok(0),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(TransferError::storage(format!("stat {}", path.display()), e)),
    }
}

/// Run one HTTP exchange for `plan`, writing the body to disk and calling
/// `on_chunk(bytes_received, total_bytes)` after every chunk.
pub(crate) fn fetch(
    plan: &FetchPlan<'_>,
    token: &CancellationToken,
    on_chunk: &mut dyn FnMut(u64, Option<u64>),
) -> Result<FetchOutcome, TransferError> {
    if token.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    let guessed = plan
        .destination_dir
        .join(filename::name_from_url(plan.url));
    let offset = existing_len(&guessed)?;

    let mut easy = Easy::new();
    easy.url(plan.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(MAX_REDIRECTS)?;
    easy.connect_timeout(plan.settings.connect_timeout)?;
    easy.timeout(plan.settings.request_timeout)?;
    easy.buffer_size(plan.settings.chunk_size)?;
    easy.progress(true)?;
    if offset > 0 {
        // curl expects "start-end" without the "bytes=" unit.
        easy.range(&format!("{offset}-"))?;
        tracing::debug!(path = %guessed.display(), offset, "resuming from existing file");
    }

    let head = RefCell::new(ResponseHead::default());
    let body: RefCell<Option<BodyWriter>> = RefCell::new(None);
    let failure: RefCell<Option<TransferError>> = RefCell::new(None);
    let mut throttle = Throttle::new(plan.throttle_bytes_per_sec);

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            head.borrow_mut().feed(line);
            true
        })?;
        // Lets cancellation interrupt connect and header waits, not just body reads.
        transfer.progress_function(|_, _, _, _| !token.is_cancelled())?;
        transfer.write_function(|data| {
            if token.is_cancelled() {
                return Ok(0);
            }
            let head = head.borrow();
            if !head.is_success() {
                // Error bodies are discarded; the status decides after perform.
                return Ok(data.len());
            }
            let mut slot = body.borrow_mut();
            if slot.is_none() {
                match BodyWriter::open(&head, plan.destination_dir, &guessed, offset) {
                    Ok(writer) => *slot = Some(writer),
                    Err(e) => {
                        *failure.borrow_mut() = Some(e);
                        return Ok(0);
                    }
                }
            }
            let Some(writer) = slot.as_mut() else {
                return Ok(0);
            };
            if let Err(e) = writer.append(data) {
                *failure.borrow_mut() = Some(e);
                return Ok(0);
            }
            let owed = throttle.on_bytes(data.len() as u64);
            if !owed.is_zero() && !sleep_unless_cancelled(owed, token) {
                return Ok(0);
            }
            on_chunk(writer.received, writer.total);
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if token.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    if let Some(e) = failure.into_inner() {
        return Err(e);
    }
    performed?;

    let status = easy.response_code()?;
    if status == RANGE_NOT_SATISFIABLE {
        return Ok(FetchOutcome::AlreadyComplete {
            local_path: guessed,
            length: offset,
        });
    }
    if !(200..300).contains(&status) {
        return Err(TransferError::Http(status));
    }

    let head = head.into_inner();
    let writer = match body.into_inner() {
        Some(writer) => writer,
        // Empty body: still leave a (possibly empty) file behind.
        None => BodyWriter::open(&head, plan.destination_dir, &guessed, offset)?,
    };
    writer.finish()
}
