//! Per-rule and per-country breakdowns of one period of appeals.
//!
//! RULE: `AppealRate` is keyed by the termination-count rows, not by the
//! rule metrics. A rule with terminations and zero appeals appears with
//! rate 0; a rule with appeals but no termination row is absent from the
//! map. That asymmetry mirrors the warehouse join and is preserved.

use crate::period::{classify_decision, percentage, round1, DecisionClass};
use crate::record::{AppealRecord, TerminationCount};
use crate::types::{CountryCode, RuleName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Appeal counts for one rule. Keys of the containing map never include
/// null, empty, or "Unknown" rule names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMetric {
    pub appeals: u32,
    pub accepted: u32,
    pub rejected: u32,
}

impl RuleMetric {
    /// Per-rule LLM acceptance percentage, zero decimals.
    pub fn acceptance_pct(&self) -> u32 {
        if self.appeals == 0 {
            0
        } else {
            (self.accepted as f64 / self.appeals as f64 * 100.0).round() as u32
        }
    }
}

/// Appeals relative to total terminations for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealRate {
    pub appeals: u32,
    pub total_terminations: i64,
    /// `100 * appeals / total_terminations`, one decimal; 0 when the
    /// denominator is 0.
    pub appeal_rate: f64,
}

/// Appeal counts for one country. "Unknown" is an explicit bucket here,
/// unlike the rule map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryStat {
    pub appeals: u32,
    pub continent: String,
    pub approved: u32,
    pub rejected: u32,
}

/// Single-pass grouping of current-period records by rule.
pub fn rule_metrics(records: &[AppealRecord]) -> HashMap<RuleName, RuleMetric> {
    let mut map: HashMap<RuleName, RuleMetric> = HashMap::new();
    for record in records {
        let Some(rule) = record.rule_name.as_deref() else {
            continue;
        };
        if rule.is_empty() || rule == "Unknown" {
            continue;
        }
        let entry = map.entry(rule.to_string()).or_default();
        entry.appeals += 1;
        match classify_decision(record.llm_decision.as_deref()) {
            DecisionClass::Accepted => entry.accepted += 1,
            DecisionClass::Rejected => entry.rejected += 1,
            DecisionClass::Pending => {}
        }
    }
    map
}

/// Appeal rates keyed by the termination rows (see module RULE).
pub fn appeal_rates(
    metrics: &HashMap<RuleName, RuleMetric>,
    terminations: &[TerminationCount],
) -> HashMap<RuleName, AppealRate> {
    let mut map = HashMap::with_capacity(terminations.len());
    for term in terminations {
        let appeals = metrics
            .get(&term.rule_name)
            .map(|m| m.appeals)
            .unwrap_or(0);
        let appeal_rate = if term.total_terminations > 0 {
            round1(appeals as f64 / term.total_terminations as f64 * 100.0)
        } else {
            0.0
        };
        map.insert(
            term.rule_name.clone(),
            AppealRate {
                appeals,
                total_terminations: term.total_terminations,
                appeal_rate,
            },
        );
    }
    map
}

/// Single-pass grouping by country, with an explicit "Unknown" bucket.
pub fn country_stats(records: &[AppealRecord]) -> HashMap<CountryCode, CountryStat> {
    let mut map: HashMap<CountryCode, CountryStat> = HashMap::new();
    for record in records {
        let country = record
            .shop_country_code
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let continent = record
            .shop_continent
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let entry = map.entry(country).or_insert_with(|| CountryStat {
            appeals: 0,
            continent,
            approved: 0,
            rejected: 0,
        });
        entry.appeals += 1;
        match classify_decision(record.llm_decision.as_deref()) {
            DecisionClass::Accepted => entry.approved += 1,
            DecisionClass::Rejected => entry.rejected += 1,
            DecisionClass::Pending => {}
        }
    }
    map
}

/// Count of appeals per operation-type label, "Unknown" when the record
/// carries none.
pub fn operation_type_distribution(records: &[AppealRecord]) -> HashMap<String, u32> {
    let mut map: HashMap<String, u32> = HashMap::new();
    for record in records {
        let label = record
            .operation_type
            .map(|op| op.label().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        *map.entry(label).or_insert(0) += 1;
    }
    map
}

/// Top rules by appeal count, descending; rule name breaks ties so output
/// is stable.
pub fn top_rules_by_appeals(
    metrics: &HashMap<RuleName, RuleMetric>,
    limit: usize,
) -> Vec<(RuleName, RuleMetric)> {
    let mut rules: Vec<(RuleName, RuleMetric)> =
        metrics.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    rules.sort_by(|a, b| b.1.appeals.cmp(&a.1.appeals).then_with(|| a.0.cmp(&b.0)));
    rules.truncate(limit);
    rules
}

/// Top countries by appeal count, descending, name-tie-broken.
pub fn top_countries_by_appeals(
    stats: &HashMap<CountryCode, CountryStat>,
    limit: usize,
) -> Vec<(CountryCode, CountryStat)> {
    let mut countries: Vec<(CountryCode, CountryStat)> =
        stats.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    countries.sort_by(|a, b| b.1.appeals.cmp(&a.1.appeals).then_with(|| a.0.cmp(&b.0)));
    countries.truncate(limit);
    countries
}

// Cascading high-rate selection constants. The fallback tier guarantees
// the report section is never empty when any rule has meaningful volume.
const HIGH_RATE_MIN_RATE: f64 = 10.0;
const HIGH_RATE_MIN_APPEALS: u32 = 5;
const HIGH_RATE_TAKE: usize = 5;
const HIGH_RATE_MIN_SURVIVORS: usize = 3;
const FALLBACK_MIN_APPEALS: u32 = 3;
const FALLBACK_TAKE: usize = 3;

/// Rules whose appeal rate needs attention, for the report.
///
/// Primary tier: rate > 10% and appeals > 5, top 5 by rate. If fewer than
/// 3 rules survive that filter, fall back to the top 3 by rate among rules
/// with appeals > 3.
pub fn rules_needing_attention(
    rates: &HashMap<RuleName, AppealRate>,
) -> Vec<(RuleName, AppealRate)> {
    let mut high: Vec<(RuleName, AppealRate)> = rates
        .iter()
        .filter(|(_, r)| r.appeal_rate > HIGH_RATE_MIN_RATE && r.appeals > HIGH_RATE_MIN_APPEALS)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    sort_by_rate(&mut high);

    if high.len() < HIGH_RATE_MIN_SURVIVORS {
        let mut fallback: Vec<(RuleName, AppealRate)> = rates
            .iter()
            .filter(|(_, r)| r.appeals > FALLBACK_MIN_APPEALS)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        sort_by_rate(&mut fallback);
        fallback.truncate(FALLBACK_TAKE);
        fallback
    } else {
        high.truncate(HIGH_RATE_TAKE);
        high
    }
}

fn sort_by_rate(rules: &mut [(RuleName, AppealRate)]) {
    rules.sort_by(|a, b| {
        b.1.appeal_rate
            .partial_cmp(&a.1.appeal_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

/// Percentage helper re-exported for summary rendering.
pub fn country_acceptance_pct(stat: &CountryStat) -> f64 {
    percentage(stat.approved, stat.appeals)
}
