//! Minimal HTTP/1.1 server that supports Range GET for integration tests.
//!
//! Serves a single static body under any path. Responds to `Range: bytes=X-`
//! with 206 Partial Content, or 416 once X reaches the end of the body.
//! Options add a `Content-Disposition` name, a delay before the response,
//! paced body writes, or a fixed error status.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// Sent as `Content-Disposition: attachment; filename="..."`.
    pub content_disposition: Option<&'static str>,
    /// Sleep before writing the status line.
    pub response_delay: Duration,
    /// Write the body in pieces of this size, sleeping `chunk_delay` between them.
    pub chunk_size: Option<usize>,
    pub chunk_delay: Duration,
    /// Answer every request with this status and an empty body.
    pub status: Option<u16>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            content_disposition: None,
            response_delay: Duration::ZERO,
            chunk_size: None,
            chunk_delay: Duration::ZERO,
            status: None,
        }
    }
}

/// Handle to a running server. It runs until the process exits.
pub struct RangeServer {
    base: String,
    ranges: Arc<Mutex<Vec<Option<u64>>>>,
}

impl RangeServer {
    /// URL for `name` on this server, e.g. "http://127.0.0.1:12345/name".
    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base, name)
    }

    pub fn request_count(&self) -> usize {
        self.ranges.lock().unwrap().len()
    }

    /// Range start of every request so far (None = no Range header).
    pub fn range_starts(&self) -> Vec<Option<u64>> {
        self.ranges.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread serving `body`.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior.
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let ranges = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&ranges);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &body, opts, &seen));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        ranges,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    seen: &Mutex<Vec<Option<u64>>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range_start) = parse_request(request);
    seen.lock().unwrap().push(range_start);

    if !opts.response_delay.is_zero() {
        thread::sleep(opts.response_delay);
    }
    if let Some(code) = opts.status {
        let response = format!("HTTP/1.1 {} Forced\r\nContent-Length: 0\r\n\r\n", code);
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    let total = body.len() as u64;
    let (status, content_range, slice) = match range_start.filter(|_| opts.support_ranges) {
        Some(start) if start >= total => (
            "416 Range Not Satisfiable",
            Some(format!("bytes */{}", total)),
            &body[0..0],
        ),
        Some(start) => (
            "206 Partial Content",
            Some(format!("bytes {}-{}/{}", start, total - 1, total)),
            &body[start as usize..],
        ),
        None => ("200 OK", None, body),
    };

    let mut head = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n", status, slice.len());
    if let Some(range) = content_range {
        head.push_str(&format!("Content-Range: {}\r\n", range));
    }
    if opts.support_ranges {
        head.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(name) = opts.content_disposition {
        head.push_str(&format!("Content-Disposition: attachment; filename=\"{}\"\r\n", name));
    }
    head.push_str("\r\n");

    match opts.chunk_size {
        Some(size) if size > 0 => {
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            for piece in slice.chunks(size) {
                if stream.write_all(piece).is_err() || stream.flush().is_err() {
                    return;
                }
                thread::sleep(opts.chunk_delay);
            }
        }
        _ => {
            // One write so small bodies reach the client in a single read.
            let mut response = head.into_bytes();
            response.extend_from_slice(slice);
            let _ = stream.write_all(&response);
        }
    }
}

/// Returns (method, optional start of `Range: bytes=X-`).
fn parse_request(request: &str) -> (&str, Option<u64>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    if let Some((a, _)) = value[6..].split_once('-') {
                        range = a.trim().parse::<u64>().ok();
                    }
                }
            }
        }
    }
    (method, range)
}
