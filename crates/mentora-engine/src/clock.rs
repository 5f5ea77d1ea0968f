//! Session time budget.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
        {
            *now = next;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Start instant and budget of one session. Never changes once built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionClock {
    pub start: DateTime<Utc>,
    pub duration: Duration,
    pub warning: Duration,
}

impl SessionClock {
    pub fn new(start: DateTime<Utc>, duration: Duration, warning: Duration) -> Self {
        Self {
            start,
            duration,
            warning,
        }
    }

    /// Budget left at `now`, saturating at zero. A clock that reads earlier
    /// than `start` counts as no time elapsed.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.start).to_std().unwrap_or(Duration::ZERO);
        self.duration.saturating_sub(elapsed)
    }
}

/// Expiry check over a [`SessionClock`]. Once expired, it stays expired
/// even if the clock is later read as earlier.
#[derive(Clone, Debug)]
pub struct TimeBudget {
    clock: SessionClock,
    expired: bool,
}

impl TimeBudget {
    pub fn new(clock: SessionClock) -> Self {
        Self {
            clock,
            expired: false,
        }
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        if self.expired {
            Duration::ZERO
        } else {
            self.clock.remaining(now)
        }
    }

    /// True when the session must wind down: remaining time is at or below
    /// the warning threshold.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> bool {
        if !self.expired && self.clock.remaining(now) <= self.clock.warning {
            self.expired = true;
        }
        self.expired
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn budget() -> TimeBudget {
        TimeBudget::new(SessionClock::new(
            start(),
            Duration::from_secs(30 * 60),
            Duration::from_secs(30),
        ))
    }

    #[test]
    fn fresh_session_has_full_budget() {
        let mut budget = budget();
        assert_eq!(budget.remaining(start()), Duration::from_secs(1800));
        assert!(!budget.evaluate(start()));
    }

    #[test]
    fn warning_threshold_triggers_ending() {
        let clock = ManualClock::new(start());
        let mut budget = budget();
        clock.advance(Duration::from_secs(29 * 60));
        assert!(!budget.evaluate(clock.now()));
        clock.advance(Duration::from_secs(45));
        assert_eq!(budget.remaining(clock.now()), Duration::from_secs(15));
        assert!(budget.evaluate(clock.now()));
    }

    #[test]
    fn exactly_at_threshold_is_ending() {
        let mut budget = budget();
        let now = start() + chrono::Duration::seconds(1770);
        assert!(budget.evaluate(now));
    }

    #[test]
    fn expiry_is_monotonic() {
        let clock = ManualClock::new(start());
        let mut budget = budget();
        clock.advance(Duration::from_secs(3600));
        assert!(budget.evaluate(clock.now()));
        clock.set(start());
        assert!(budget.evaluate(clock.now()));
        assert!(budget.is_expired());
        assert_eq!(budget.remaining(clock.now()), Duration::ZERO);
    }

    #[test]
    fn clock_before_start_counts_as_zero_elapsed() {
        let clock = SessionClock::new(start(), Duration::from_secs(60), Duration::from_secs(5));
        let earlier = start() - chrono::Duration::seconds(30);
        assert_eq!(clock.remaining(earlier), Duration::from_secs(60));
    }

    #[test]
    fn remaining_saturates() {
        let clock = SessionClock::new(start(), Duration::from_secs(60), Duration::from_secs(5));
        assert_eq!(clock.remaining(start() + chrono::Duration::hours(2)), Duration::ZERO);
    }
}
