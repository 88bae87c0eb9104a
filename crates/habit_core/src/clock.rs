use chrono::{Local, NaiveDateTime, NaiveTime};

use crate::date::DateKey;

/// Source of the caller's local wall-clock time. Read once per query so that
/// every cell in a render pass agrees on which days are in the future.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> DateKey {
        DateKey::from(self.now().date())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to one instant, for tests and reproducible reports.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at(date: DateKey, hour: u32, minute: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap_or_default();
        Self(date.date().and_time(time))
    }

    pub fn on(date: DateKey) -> Self {
        Self::at(date, 9, 0)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
