use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-day usage counters, owned by the background monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTrackingState {
    pub used_minutes_today: u32,
    pub last_event_minute: u32,
    /// Calendar day the counters belong to.
    pub day: NaiveDate,
}

impl UsageTrackingState {
    pub fn new_day(day: NaiveDate) -> Self {
        Self {
            used_minutes_today: 0,
            last_event_minute: 0,
            day,
        }
    }

    /// Counters as seen on `today`: a state from an earlier day reads as zero,
    /// covering a missed interval-start callback.
    pub fn for_day(self, today: NaiveDate) -> Self {
        if self.day == today {
            self
        } else {
            Self::new_day(today)
        }
    }

    pub fn record(&mut self, minute: u32) {
        self.used_minutes_today = minute;
        self.last_event_minute = minute;
    }
}
