//! First-come-first-served concurrency limiter shared by one batch.
//!
//! Callers join the queue synchronously with [`ConcurrencyLimiter::enqueue`],
//! so slots are granted in submission order no matter when the waiting task
//! is first polled. A granted slot is held by a [`SlotGuard`] and handed to
//! the next live waiter when the guard drops.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::registry::lock;

#[derive(Debug)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    state: Mutex<LimiterState>,
}

#[derive(Debug, Default)]
struct LimiterState {
    active: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots (clamped to at least 1).
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            state: Mutex::new(LimiterState::default()),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn active(&self) -> usize {
        lock(&self.state).active
    }

    /// Number of tickets still waiting for a slot.
    pub fn queued(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Take a place in the queue. The ticket resolves once a slot is granted;
    /// dropping it gives up the place (or the slot, if already granted).
    pub fn enqueue(self: &Arc<Self>) -> SlotTicket {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = lock(&self.state);
            if state.active < self.capacity && state.waiters.is_empty() {
                state.active += 1;
                let _ = tx.send(());
            } else {
                state.waiters.push_back(tx);
            }
        }
        SlotTicket {
            rx,
            limiter: Arc::clone(self),
            granted: false,
        }
    }

    /// Hand the slot to the oldest waiter still listening, or free it.
    fn release(&self) {
        let mut state = lock(&self.state);
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                return;
            }
        }
        state.active = state.active.saturating_sub(1);
    }
}

/// A place in the limiter queue.
#[derive(Debug)]
pub struct SlotTicket {
    rx: oneshot::Receiver<()>,
    limiter: Arc<ConcurrencyLimiter>,
    granted: bool,
}

impl SlotTicket {
    /// Wait for the slot. Cancel-safe: dropping the future drops the ticket.
    pub async fn acquire(mut self) -> SlotGuard {
        // The sender lives in the limiter queue until it is sent, and we hold
        // the limiter, so the channel only resolves by being granted.
        let _ = (&mut self.rx).await;
        self.granted = true;
        SlotGuard {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl Drop for SlotTicket {
    fn drop(&mut self) {
        if self.granted {
            return;
        }
        self.rx.close();
        if self.rx.try_recv().is_ok() {
            // Granted after we stopped listening: pass it on.
            self.limiter.release();
        }
    }
}

/// Releases its slot when dropped.
#[derive(Debug)]
pub struct SlotGuard {
    limiter: Arc<ConcurrencyLimiter>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
