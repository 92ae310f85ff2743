//! Cooperative wall-clock budget for the recheck pass.

use std::time::{Duration, Instant};
use tracing::warn;

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStatus {
    Running,
    Expired,
}

/// Polled once per candidate; once expired it stays expired.
///
/// The clock starts on the first `check`. Elapsed time is tracked as a high
/// water mark so it never appears to decrease.
#[derive(Debug)]
pub struct TimeoutChecker<C: Clock = SystemClock> {
    clock: C,
    budget: Option<Duration>,
    started: Option<Instant>,
    elapsed: Duration,
    expired: bool,
}

impl TimeoutChecker<SystemClock> {
    /// A checker with a budget of `timeout_ms` (0 disables it).
    pub fn new(timeout_ms: u64) -> Self {
        Self::with_clock(timeout_ms, SystemClock)
    }
}

impl<C: Clock> TimeoutChecker<C> {
    pub fn with_clock(timeout_ms: u64, clock: C) -> Self {
        Self {
            clock,
            budget: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            started: None,
            elapsed: Duration::ZERO,
            expired: false,
        }
    }

    pub fn check(&mut self) -> TimeoutStatus {
        if self.expired {
            return TimeoutStatus::Expired;
        }
        let Some(budget) = self.budget else {
            return TimeoutStatus::Running;
        };

        let now = self.clock.now();
        let started = *self.started.get_or_insert(now);
        self.elapsed = self.elapsed.max(now.saturating_duration_since(started));
        if self.elapsed > budget {
            warn!(
                elapsed_ms = self.elapsed.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "Regex recheck timed out; returning partial results"
            );
            self.expired = true;
            return TimeoutStatus::Expired;
        }
        TimeoutStatus::Running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Largest elapsed time observed so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Test clock moved by hand, including backwards
    #[derive(Clone)]
    pub(crate) struct ManualClock {
        base: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        pub(crate) fn set(&self, millis: u64) {
            self.offset.set(Duration::from_millis(millis));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + self.offset.get()
        }
    }

    #[test]
    fn test_disabled_never_expires() {
        let clock = ManualClock::new();
        let mut checker = TimeoutChecker::with_clock(0, clock.clone());
        clock.set(1_000_000);
        assert_eq!(checker.check(), TimeoutStatus::Running);
        assert!(!checker.is_expired());
    }

    #[test]
    fn test_expires_after_budget() {
        let clock = ManualClock::new();
        let mut checker = TimeoutChecker::with_clock(100, clock.clone());
        assert_eq!(checker.check(), TimeoutStatus::Running);
        clock.set(100);
        assert_eq!(checker.check(), TimeoutStatus::Running);
        clock.set(101);
        assert_eq!(checker.check(), TimeoutStatus::Expired);
    }

    #[test]
    fn test_starts_on_first_check() {
        let clock = ManualClock::new();
        clock.set(500);
        let mut checker = TimeoutChecker::with_clock(100, clock.clone());
        assert_eq!(checker.check(), TimeoutStatus::Running);
        clock.set(550);
        assert_eq!(checker.check(), TimeoutStatus::Running);
        assert_eq!(checker.elapsed(), Duration::from_millis(50));
    }

    #[test]
    fn test_expiry_is_sticky_when_time_goes_backwards() {
        let clock = ManualClock::new();
        clock.set(1_000);
        let mut checker = TimeoutChecker::with_clock(10, clock.clone());
        checker.check();
        clock.set(1_020);
        assert_eq!(checker.check(), TimeoutStatus::Expired);
        clock.set(0);
        assert_eq!(checker.check(), TimeoutStatus::Expired);
        clock.set(1_000);
        assert_eq!(checker.check(), TimeoutStatus::Expired);
    }

    #[test]
    fn test_elapsed_never_decreases() {
        let clock = ManualClock::new();
        clock.set(1_000);
        let mut checker = TimeoutChecker::with_clock(100, clock.clone());
        checker.check();
        clock.set(1_050);
        checker.check();
        clock.set(900);
        assert_eq!(checker.check(), TimeoutStatus::Running);
        assert_eq!(checker.elapsed(), Duration::from_millis(50));
    }
}
