//! Simulation clock — owns the simulated "now".
//!
//! All date arithmetic in the engine (calendar-month interest gates,
//! maturity dates, news expiry) reads this clock, never the platform
//! clock, so a run can be advanced deterministically in tests.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub now: DateTime<Utc>,
}

impl SimClock {
    /// Clock starting at the real current time.
    pub fn system() -> Self {
        Self { now: Utc::now() }
    }

    /// Clock pinned to a fixed instant. Used in tests.
    pub fn fixed(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Advance the simulated time by whole days. Returns the new now.
    pub fn advance_days(&mut self, days: i64) -> DateTime<Utc> {
        self.now += Duration::days(days);
        self.now
    }

    pub fn advance_hours(&mut self, hours: i64) -> DateTime<Utc> {
        self.now += Duration::hours(hours);
        self.now
    }

    /// Calendar month key, e.g. "2026-03". Drives the monthly interest gate.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.now.year(), self.now.month())
    }

    /// Calendar day key, e.g. "2026-03-17". Drives daily news idempotence.
    pub fn day_key(&self) -> String {
        self.now.format("%Y-%m-%d").to_string()
    }

    /// The instant `months` calendar months after now. Saturates at the
    /// end of shorter months (chrono's checked add semantics).
    pub fn months_from_now(&self, months: u32) -> DateTime<Utc> {
        self.now
            .checked_add_months(Months::new(months))
            .unwrap_or(self.now)
    }
}
