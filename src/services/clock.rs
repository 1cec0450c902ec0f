// src/services/clock.rs
use chrono::{DateTime, Utc};
use chrono_tz::Asia::Kolkata;

use crate::models::YearMonth;

/// Source of "now" shared by validation and coverage reporting.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current month as seen in India Standard Time.
    fn current_month(&self) -> YearMonth {
        YearMonth::from_date(&self.now().with_timezone(&Kolkata))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
