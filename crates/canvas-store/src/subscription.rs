//! Selector-based change subscriptions

use crate::state::CanvasState;
use std::fmt;

/// Identifies a registered subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

trait Subscriber: Send {
    fn notify(&mut self, state: &CanvasState);
}

struct Selected<T, S, C> {
    selector: S,
    callback: C,
    last: T,
}

impl<T, S, C> Subscriber for Selected<T, S, C>
where
    T: PartialEq + Send,
    S: Fn(&CanvasState) -> T + Send,
    C: FnMut(&T) + Send,
{
    fn notify(&mut self, state: &CanvasState) {
        let next = (self.selector)(state);
        if next != self.last {
            (self.callback)(&next);
            self.last = next;
        }
    }
}

/// Registry of subscriptions, notified in registration order
#[derive(Default)]
pub(crate) struct Subscriptions {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<dyn Subscriber>)>,
}

impl Subscriptions {
    /// Register; the selector is evaluated once now to seed the baseline
    pub(crate) fn subscribe<T, S, C>(&mut self, state: &CanvasState, selector: S, callback: C) -> SubscriptionId
    where
        T: PartialEq + Send + 'static,
        S: Fn(&CanvasState) -> T + Send + 'static,
        C: FnMut(&T) + Send + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let last = selector(state);
        self.entries.push((
            id,
            Box::new(Selected {
                selector,
                callback,
                last,
            }),
        ));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, state: &CanvasState) {
        for (_, subscriber) in &mut self.entries {
            subscriber.notify(state);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("count", &self.entries.len())
            .finish()
    }
}
