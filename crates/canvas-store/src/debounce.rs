//! Trailing-edge debouncer over the scheduler port

use crate::scheduler::{Scheduler, TimerEvent, TimerHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Coalesces bursts of triggers into one event after a quiet period
///
/// Every [`trigger`](Self::trigger) cancels the pending timer and schedules
/// a new one with a fresh epoch. Only the event carrying the latest epoch is
/// accepted by [`fire`](Self::fire).
#[derive(Debug)]
pub struct Debouncer {
    scheduler: Arc<dyn Scheduler>,
    delay: Duration,
    make_event: fn(u64) -> TimerEvent,
    state: Mutex<DebounceState>,
}

#[derive(Debug, Default)]
struct DebounceState {
    epoch: u64,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    /// Create a debouncer emitting `make_event(epoch)` after `delay`
    #[must_use]
    pub fn new(scheduler: Arc<dyn Scheduler>, delay: Duration, make_event: fn(u64) -> TimerEvent) -> Self {
        Self {
            scheduler,
            delay,
            make_event,
            state: Mutex::new(DebounceState::default()),
        }
    }

    /// Restart the quiet period; returns the new epoch
    pub fn trigger(&self) -> u64 {
        let mut state = self.state.lock();
        if let Some(handle) = state.pending.take() {
            handle.cancel();
        }
        state.epoch += 1;
        let epoch = state.epoch;
        state.pending = Some(self.scheduler.schedule(self.delay, (self.make_event)(epoch)));
        epoch
    }

    /// Accept a fired event; `true` only for the current pending epoch
    pub fn fire(&self, epoch: u64) -> bool {
        let mut state = self.state.lock();
        if state.pending.is_some() && state.epoch == epoch {
            state.pending = None;
            true
        } else {
            false
        }
    }

    /// Drop the pending event; returns whether one was pending
    pub fn cancel(&self) -> bool {
        match self.state.lock().pending.take() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Check if an event is pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }
}
