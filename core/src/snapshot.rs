//! Historical weekly snapshots — one immutable record per successful
//! warehouse fetch, read back newest-first for week-over-week comparison.

use crate::breakdown::RuleMetric;
use crate::period::PeriodMetrics;
use crate::pipeline::AnalysisRun;
use crate::record::TerminationCount;
use crate::types::RuleName;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSnapshot {
    pub snapshot_id: String,
    pub created_at: DateTime<Utc>,
    /// ISO-8601 week number of the creation date.
    pub week: u32,
    /// Calendar year of the creation date.
    pub year: i32,
    pub current: PeriodMetrics,
    pub previous: PeriodMetrics,
    pub secondary_appeals: u32,
    pub previous_secondary_appeals: u32,
    /// Per-rule breakdown, kept so next week's run can diff appeal rates.
    pub rule_breakdown: HashMap<RuleName, RuleMetric>,
    /// Denominators, kept alongside the numerators above.
    pub termination_counts: Vec<TerminationCount>,
}

impl HistoricalSnapshot {
    pub fn from_run(run: &AnalysisRun, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        Self {
            snapshot_id: Uuid::new_v4().to_string(),
            created_at: now,
            week: iso_week_number(today),
            year: today.year(),
            current: run.current.clone(),
            previous: run.previous.clone(),
            secondary_appeals: run.secondary_appeals,
            previous_secondary_appeals: run.previous_secondary_appeals,
            rule_breakdown: run.rule_metrics.clone(),
            termination_counts: run.termination_counts.clone(),
        }
    }
}

pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}
