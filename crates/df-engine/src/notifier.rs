//! Ordered, synchronous publish/subscribe for engine events.
//!
//! Subscribers run in subscription order on the publishing call. A subscriber
//! that returns an error or panics is reported and skipped; the remaining
//! subscribers still receive the event.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::event::{DialogueEvent, EventKind};

/// Error a subscriber may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result a subscriber returns.
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Box<dyn FnMut(&DialogueEvent) -> HandlerResult>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    filter: Option<EventKind>,
    handler: Handler,
}

/// Multi-subscriber event channel.
#[derive(Default)]
pub struct EventNotifier {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventNotifier {
    /// Create a notifier with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event.
    pub fn subscribe<H>(&mut self, kind: EventKind, handler: H) -> SubscriptionId
    where
        H: FnMut(&DialogueEvent) -> HandlerResult + 'static,
    {
        self.add(Some(kind), Box::new(handler))
    }

    /// Subscribe to every event.
    pub fn subscribe_all<H>(&mut self, handler: H) -> SubscriptionId
    where
        H: FnMut(&DialogueEvent) -> HandlerResult + 'static,
    {
        self.add(None, Box::new(handler))
    }

    fn add(&mut self, filter: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            handler,
        });
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an event to every matching subscriber, in subscription order.
    ///
    /// Returns how many subscribers failed.
    pub fn publish(&mut self, event: &DialogueEvent) -> usize {
        let kind = event.kind();
        let mut failures = 0;

        for sub in &mut self.subscribers {
            if sub.filter.is_some_and(|k| k != kind) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| (sub.handler)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    failures += 1;
                    warn!(subscription = sub.id.0, event = %kind, %error, "subscriber failed");
                }
                Err(_) => {
                    failures += 1;
                    warn!(subscription = sub.id.0, event = %kind, "subscriber panicked");
                }
            }
        }

        failures
    }
}
