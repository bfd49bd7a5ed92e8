//! Wall-clock source for `starttime` directives

use chrono::NaiveDateTime;

/// Supplies the current local time
pub trait Clock {
    /// Current local date-time
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
