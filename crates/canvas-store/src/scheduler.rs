//! Timer port
//!
//! The store never sleeps or spawns. It asks a [`Scheduler`] to deliver a
//! [`TimerEvent`] later and applies the event when it comes back through
//! [`CanvasStore::handle_timer`](crate::CanvasStore::handle_timer).
//! [`ManualScheduler`] advances virtual time for tests; [`TokioScheduler`]
//! delivers events through a channel in a running session.

use crate::error::StoreError;
use canvas_model::{NodeId, PulseId};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Something the store asked to be told about later
///
/// Epochs identify the timer generation; an event whose epoch is no longer
/// current is ignored even if it was already in flight when cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Grace period of a deleted node is over
    FinalizeDeletion {
        /// Node being deleted
        node_id: NodeId,
    },
    /// Undo window closed
    UndoExpired {
        /// Undo generation
        epoch: u64,
    },
    /// Autosave quiet period elapsed
    Autosave {
        /// Debounce generation
        epoch: u64,
    },
    /// Duplicate-alias notice expired
    NoticeExpired {
        /// Notice generation
        epoch: u64,
    },
    /// Pulse animation finished
    PulseExpired {
        /// Pulse to drop
        pulse_id: PulseId,
    },
}

/// Cancellable handle to a scheduled event
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Cancel the event; a no-op if it already fired
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if the event was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Delivers [`TimerEvent`]s after a delay
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Deliver `event` once `delay` has elapsed, unless cancelled first
    fn schedule(&self, delay: Duration, event: TimerEvent) -> TimerHandle;

    /// Time elapsed on this scheduler's clock
    fn now(&self) -> Duration;
}

/// Virtual-time scheduler
///
/// Nothing fires until the owner calls [`advance`](Self::advance) or
/// [`run_until_idle`](Self::run_until_idle). Events due at the same instant
/// fire in scheduling order.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    inner: Mutex<ManualClock>,
}

#[derive(Debug, Default)]
struct ManualClock {
    now: Duration,
    seq: u64,
    queue: Vec<PendingTimer>,
}

#[derive(Debug)]
struct PendingTimer {
    due: Duration,
    seq: u64,
    event: TimerEvent,
    token: CancellationToken,
}

impl ManualScheduler {
    /// Create a scheduler at time zero
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events that are scheduled and not cancelled
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .queue
            .iter()
            .filter(|timer| !timer.token.is_cancelled())
            .count()
    }

    /// Pop the earliest live event due at or before `until`, moving the
    /// clock to its due time
    ///
    /// The lock is released before returning so the caller may schedule
    /// more events while handling this one.
    fn pop_due(&self, until: Duration) -> Option<TimerEvent> {
        let mut clock = self.inner.lock();
        clock.queue.retain(|timer| !timer.token.is_cancelled());
        let index = clock
            .queue
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= until)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(i, _)| i)?;
        let timer = clock.queue.swap_remove(index);
        clock.now = clock.now.max(timer.due);
        Some(timer.event)
    }

    /// Move the clock forward by `by`, handing every event that falls due
    /// to `handle` in order
    pub fn advance<F>(&self, by: Duration, mut handle: F)
    where
        F: FnMut(TimerEvent),
    {
        let until = self.now().saturating_add(by);
        while let Some(event) = self.pop_due(until) {
            handle(event);
        }
        let mut clock = self.inner.lock();
        clock.now = clock.now.max(until);
    }

    /// Fire every pending event, including ones scheduled while handling,
    /// regardless of their due time
    pub fn run_until_idle<F>(&self, mut handle: F)
    where
        F: FnMut(TimerEvent),
    {
        while let Some(event) = self.pop_due(Duration::MAX) {
            handle(event);
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let token = CancellationToken::new();
        let mut clock = self.inner.lock();
        clock.seq += 1;
        let timer = PendingTimer {
            due: clock.now.saturating_add(delay),
            seq: clock.seq,
            event,
            token: token.clone(),
        };
        clock.queue.push(timer);
        TimerHandle::new(token)
    }

    fn now(&self) -> Duration {
        self.inner.lock().now
    }
}

/// Scheduler backed by tokio timers
///
/// Each event is a spawned sleep raced against its cancellation token;
/// fired events arrive on the receiver returned by [`TokioScheduler::new`].
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
    tx: mpsc::UnboundedSender<TimerEvent>,
    started: tokio::time::Instant,
}

impl TokioScheduler {
    /// Create a scheduler on the current tokio runtime
    ///
    /// # Errors
    /// Returns [`StoreError::NoRuntime`] when called outside a runtime
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<TimerEvent>), StoreError> {
        let runtime = Handle::try_current()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                runtime,
                tx,
                started: tokio::time::Instant::now(),
            },
            rx,
        ))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {
                    tracing::trace!("timer cancelled: {:?}", event);
                }
                () = tokio::time::sleep(delay) => {
                    // receiver gone means the session ended
                    let _ = tx.send(event);
                }
            }
        });
        TimerHandle::new(token)
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn manual_fires_in_due_order() {
        let scheduler = ManualScheduler::new();
        scheduler.schedule(ms(20), TimerEvent::Autosave { epoch: 2 });
        scheduler.schedule(ms(10), TimerEvent::Autosave { epoch: 1 });
        scheduler.schedule(ms(10), TimerEvent::NoticeExpired { epoch: 1 });

        let mut fired = Vec::new();
        scheduler.advance(ms(15), |e| fired.push(e));
        assert_eq!(
            fired,
            vec![
                TimerEvent::Autosave { epoch: 1 },
                TimerEvent::NoticeExpired { epoch: 1 }
            ]
        );
        assert_eq!(scheduler.now(), ms(15));
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn cancelled_events_never_fire() {
        let scheduler = ManualScheduler::new();
        let handle = scheduler.schedule(ms(5), TimerEvent::UndoExpired { epoch: 1 });
        handle.cancel();
        assert!(handle.is_cancelled());

        let mut fired = Vec::new();
        scheduler.advance(ms(10), |e| fired.push(e));
        assert!(fired.is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn events_scheduled_while_handling_fire_in_same_advance() {
        let scheduler = ManualScheduler::new();
        scheduler.schedule(ms(5), TimerEvent::Autosave { epoch: 1 });

        let mut fired = Vec::new();
        scheduler.advance(ms(20), |e| {
            if e == (TimerEvent::Autosave { epoch: 1 }) {
                scheduler.schedule(ms(5), TimerEvent::Autosave { epoch: 2 });
            }
            fired.push(e);
        });
        assert_eq!(fired.len(), 2);
        assert_eq!(scheduler.now(), ms(20));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_delivers_after_delay() {
        let (scheduler, mut rx) = TokioScheduler::new().unwrap();
        let keep = scheduler.schedule(ms(50), TimerEvent::Autosave { epoch: 7 });
        let dropped = scheduler.schedule(ms(10), TimerEvent::Autosave { epoch: 6 });
        dropped.cancel();

        let event = rx.recv().await.unwrap();
        assert_eq!(event, TimerEvent::Autosave { epoch: 7 });
        assert!(!keep.is_cancelled());
    }

    #[test]
    fn tokio_scheduler_requires_runtime() {
        assert!(matches!(TokioScheduler::new(), Err(StoreError::NoRuntime(_))));
    }
}
