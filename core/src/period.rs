//! Period aggregation — one period of appeal records reduced to metrics.
//!
//! RULE: Decision text is classified by an explicit ordered keyword table,
//! first match wins. Acceptance keywords are checked before rejection
//! keywords, so a label matching both sets classifies accepted. That
//! ordering is a reproducibility contract — never reorder the table.

use crate::record::AppealRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionClass {
    Accepted,
    Rejected,
    Pending,
}

/// Ordered (class, keyword-set) pairs. Evaluated top to bottom; the first
/// class whose keyword substring-matches the lowercased text wins.
/// Note "invalid" contains "valid" and therefore classifies accepted.
const DECISION_KEYWORDS: &[(DecisionClass, &[&str])] = &[
    (
        DecisionClass::Accepted,
        &["accept", "approve", "reinstate", "restore", "valid", "grant"],
    ),
    (
        DecisionClass::Rejected,
        &["reject", "deny", "uphold", "dismiss", "invalid"],
    ),
];

/// Classify a free-text LLM decision label. Null and unmatched labels are
/// pending.
pub fn classify_decision(decision: Option<&str>) -> DecisionClass {
    let Some(text) = decision else {
        return DecisionClass::Pending;
    };
    let text = text.to_lowercase();
    for (class, keywords) in DECISION_KEYWORDS {
        if keywords.iter().any(|k| text.contains(k)) {
            return *class;
        }
    }
    DecisionClass::Pending
}

/// Derived metrics for one period of appeal records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub total_appeals: u32,
    pub accepted_appeals: u32,
    pub rejected_appeals: u32,
    pub pending_appeals: u32,
    /// Percentage, one decimal. 0 when the period is empty.
    pub acceptance_rate: f64,
    pub rejection_rate: f64,
    /// Mean of non-null days_to_appeal, one decimal. 0 when no values.
    pub avg_days_to_appeal: f64,
}

impl PeriodMetrics {
    pub fn empty() -> Self {
        Self {
            total_appeals: 0,
            accepted_appeals: 0,
            rejected_appeals: 0,
            pending_appeals: 0,
            acceptance_rate: 0.0,
            rejection_rate: 0.0,
            avg_days_to_appeal: 0.0,
        }
    }
}

/// Aggregate one period. Pure and order-insensitive: every record counts
/// toward the total even when its decision or date is missing.
pub fn aggregate_period(records: &[AppealRecord]) -> PeriodMetrics {
    let total_appeals = records.len() as u32;
    let mut accepted_appeals = 0u32;
    let mut rejected_appeals = 0u32;

    for record in records {
        match classify_decision(record.llm_decision.as_deref()) {
            DecisionClass::Accepted => accepted_appeals += 1,
            DecisionClass::Rejected => rejected_appeals += 1,
            DecisionClass::Pending => {}
        }
    }
    // Accepted and rejected are disjoint classes of the same set, so this
    // never underflows.
    let pending_appeals = total_appeals - accepted_appeals - rejected_appeals;

    let days: Vec<i64> = records.iter().filter_map(|r| r.days_to_appeal).collect();
    let avg_days_to_appeal = if days.is_empty() {
        0.0
    } else {
        round1(days.iter().sum::<i64>() as f64 / days.len() as f64)
    };

    PeriodMetrics {
        total_appeals,
        accepted_appeals,
        rejected_appeals,
        pending_appeals,
        acceptance_rate: percentage(accepted_appeals, total_appeals),
        rejection_rate: percentage(rejected_appeals, total_appeals),
        avg_days_to_appeal,
    }
}

/// Percent-change between two counts. Previous-is-zero is not a number,
/// it is a labeled no-baseline state; callers branch on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PercentChange {
    /// `(current - previous) / previous * 100`, one decimal.
    Pct { value: f64 },
    /// Previous 0, current > 0. Rendered as the literal "+100".
    SurgeFromZero,
    /// Previous 0, current 0. Rendered as the literal "0".
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDirection {
    Up,
    Down,
    Level,
}

impl PercentChange {
    pub fn compute(current: u32, previous: u32) -> Self {
        if previous > 0 {
            let value = (current as f64 - previous as f64) / previous as f64 * 100.0;
            PercentChange::Pct {
                value: round1(value),
            }
        } else if current > 0 {
            PercentChange::SurgeFromZero
        } else {
            PercentChange::Flat
        }
    }

    pub fn direction(&self) -> ChangeDirection {
        match self {
            PercentChange::Pct { value } if *value > 0.0 => ChangeDirection::Up,
            PercentChange::Pct { value } if *value < 0.0 => ChangeDirection::Down,
            PercentChange::Pct { .. } => ChangeDirection::Level,
            PercentChange::SurgeFromZero => ChangeDirection::Up,
            PercentChange::Flat => ChangeDirection::Level,
        }
    }

    /// The raw label without a percent sign: "+12.5", "-3.2", "+100", "0".
    pub fn as_label(&self) -> String {
        match self {
            PercentChange::Pct { value } if *value > 0.0 => format!("+{value:.1}"),
            PercentChange::Pct { value } => format!("{value:.1}"),
            PercentChange::SurgeFromZero => "+100".to_string(),
            PercentChange::Flat => "0".to_string(),
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_label())
    }
}

/// Percentage with one decimal; 0 when the denominator is 0.
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
