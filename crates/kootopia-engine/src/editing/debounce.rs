use std::time::{Duration, Instant};

/// Quiet interval before a burst of typing is committed and auto-saved
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(2000);

/// Cancellable quiet-period timer.
///
/// Holds at most one pending deadline. Every [`schedule`](Self::schedule)
/// restarts it; only a [`fire_if_due`](Self::fire_if_due) call at or after
/// the deadline, with no intervening reschedule, fires it. The timer never
/// sleeps on its own: the owning event loop polls it, typically waiting on
/// its channel with [`remaining`](Self::remaining) as the timeout.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// (Re)start the quiet period from `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the timer fires, `None` when nothing is scheduled.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fire the timer if its deadline has passed. Firing consumes it.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}
