//! Average-rate pacing for a single run.
//!
//! The budget for `n` bytes at `rate` bytes/s is `n / rate` seconds since the
//! run began; a run that is ahead of its budget sleeps the difference. Bursts
//! are allowed as long as the average holds.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct Throttle {
    rate: u64,
    started: Instant,
    sent: u64,
}

impl Throttle {
    /// `rate` in bytes per second; 0 disables pacing.
    pub fn new(rate: u64) -> Self {
        Self {
            rate,
            started: Instant::now(),
            sent: 0,
        }
    }

    /// Account for `n` more bytes and return how long to wait before continuing.
    pub fn on_bytes(&mut self, n: u64) -> Duration {
        if self.rate == 0 {
            return Duration::ZERO;
        }
        self.sent += n;
        pacing_delay(self.sent, self.rate, self.started.elapsed())
    }
}

/// Time still owed after sending `sent` bytes in `elapsed` at `rate` bytes/s.
pub fn pacing_delay(sent: u64, rate: u64, elapsed: Duration) -> Duration {
    if rate == 0 {
        return Duration::ZERO;
    }
    let budget = Duration::from_secs_f64(sent as f64 / rate as f64);
    budget.saturating_sub(elapsed)
}

/// Sleep on the current (blocking) thread in short slices. Returns false as
/// soon as `token` is cancelled.
pub fn sleep_unless_cancelled(total: Duration, token: &CancellationToken) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
