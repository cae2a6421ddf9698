//! The singleton weekly schedule record.
//!
//! RULE: The schedule is replaced wholesale — delete-all then recreate —
//! on every toggle. It is never patched field-by-field, so a half-updated
//! schedule can never exist.

use crate::report::ReportType;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: String,
    pub enabled: bool,
    /// Always a Monday 09:00 UTC.
    pub next_run: DateTime<Utc>,
    pub slack_channel: String,
    pub report_type: ReportType,
}

impl Schedule {
    /// A fresh enabled schedule, first run next Monday 09:00.
    pub fn weekly(slack_channel: &str, report_type: ReportType, now: DateTime<Utc>) -> Self {
        Self {
            schedule_id: Uuid::new_v4().to_string(),
            enabled: true,
            next_run: next_monday_run(now),
            slack_channel: slack_channel.to_string(),
            report_type,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run <= now
    }
}

/// The next Monday 09:00 UTC strictly after `now`'s date. On a Monday this
/// is the following week, never today.
pub fn next_monday_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let from_sunday = today.weekday().num_days_from_sunday();
    let mut ahead = (8 - from_sunday) % 7;
    if ahead == 0 {
        ahead = 7;
    }
    let monday = today + Duration::days(ahead as i64);
    Utc.from_utc_datetime(&monday.and_hms_opt(9, 0, 0).expect("09:00 is a valid time"))
}
