use std::time::Duration;

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// The raw handle value.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Host-supplied clock the engine registers auto-continue timers against.
///
/// The scheduler only records timers. When one comes due, the host hands its
/// handle back to [`crate::DialogueEngine::fire_timer`]; the engine ignores
/// handles it has already cancelled.
pub trait Scheduler {
    /// Register a timer that comes due after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerHandle;

    /// Cancel a timer. Unknown or already-fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

/// A tick source driven explicitly by the host.
///
/// Time only moves when [`ManualClock::advance`] is called, which makes
/// auto-continue fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Duration,
    next_handle: u64,
    pending: Vec<(Duration, TimerHandle)>,
}

impl ManualClock {
    /// Create a clock at time zero with no timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the clock was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers not yet due or cancelled.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether the timer is still waiting to come due.
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|(_, h)| *h == handle)
    }

    /// Time remaining until the earliest pending timer comes due.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending
            .iter()
            .map(|(due, _)| due.saturating_sub(self.now))
            .min()
    }

    /// Move time forward and return the timers that came due.
    ///
    /// Handles are returned in due order; timers due at the same instant
    /// come back in the order they were scheduled.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<TimerHandle> {
        self.now = self.now.saturating_add(elapsed);

        let now = self.now;
        let mut due: Vec<(Duration, TimerHandle)> = Vec::new();
        self.pending.retain(|&(at, handle)| {
            if at <= now {
                due.push((at, handle));
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|(_, handle)| handle).collect()
    }
}

impl Scheduler for ManualClock {
    fn schedule(&mut self, delay: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push((self.now.saturating_add(delay), handle));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|(_, h)| *h != handle);
    }
}
