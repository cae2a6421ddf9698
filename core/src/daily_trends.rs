//! Day-of-week and per-date spike detection over the current period.
//!
//! Detection rules run in a fixed order (volume, rule, country, operation
//! type, single-date country) and the output is truncated to four lines
//! afterwards. The order decides which findings survive truncation, so it
//! is a visible contract, not an implementation detail.
//!
//! Weekday trend math covers Mon–Fri only; per-date counts cover every
//! calendar date. Within each rule, keys are walked alphabetically so the
//! same input always yields the same lines.

use crate::record::AppealRecord;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const WEEKDAYS: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

/// Heuristic thresholds, defaulting to the tuned production values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    /// Max/min weekday volume ratio that counts as a spike.
    pub volume_ratio: f64,
    pub rule_multiplier: f64,
    pub rule_min: u32,
    pub country_multiplier: f64,
    pub country_min: u32,
    /// Absolute weekday count that flags a country regardless of its mean.
    pub country_absolute: u32,
    pub operation_multiplier: f64,
    pub operation_min: u32,
    /// Single-date country count that flags on its own.
    pub date_country_min: u32,
    pub max_trends: usize,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            volume_ratio: 1.5,
            rule_multiplier: 2.0,
            rule_min: 5,
            country_multiplier: 1.8,
            country_min: 5,
            country_absolute: 15,
            operation_multiplier: 2.0,
            operation_min: 10,
            date_country_min: 15,
            max_trends: 4,
        }
    }
}

#[derive(Default)]
struct DateBucket {
    total: u32,
    countries: HashMap<String, u32>,
}

/// Detect spikes in the current-period records. Returns at most
/// `max_trends` human-readable lines in rule-evaluation order.
pub fn detect_daily_trends(records: &[AppealRecord], thresholds: &TrendThresholds) -> Vec<String> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut daily_totals = [0u32; 5];
    let mut rules_by_day: HashMap<String, [u32; 5]> = HashMap::new();
    let mut countries_by_day: HashMap<String, [u32; 5]> = HashMap::new();
    let mut operations_by_day: HashMap<&'static str, [u32; 5]> = HashMap::new();
    let mut date_stats: HashMap<NaiveDate, DateBucket> = HashMap::new();

    for record in records {
        // Unparseable dates were already dropped to None at ingestion;
        // dateless records simply don't participate in trend math.
        let Some(date) = record.appeal_date else {
            continue;
        };

        // Per-date counts cover every date, weekends included.
        let date_entry = date_stats.entry(date).or_default();
        date_entry.total += 1;
        if let Some(country) = record.shop_country_code.as_deref() {
            if country != "Unknown" {
                *date_entry.countries.entry(country.to_string()).or_insert(0) += 1;
            }
        }

        // Weekday buckets exclude Sat/Sun.
        let day_idx = date.weekday().num_days_from_monday() as usize;
        if day_idx >= 5 {
            continue;
        }
        daily_totals[day_idx] += 1;

        if let Some(rule) = record.rule_name.as_deref() {
            if !rule.is_empty() && rule != "Unknown" {
                rules_by_day.entry(rule.to_string()).or_insert([0; 5])[day_idx] += 1;
            }
        }
        if let Some(country) = record.shop_country_code.as_deref() {
            if country != "Unknown" {
                countries_by_day.entry(country.to_string()).or_insert([0; 5])[day_idx] += 1;
            }
        }
        if let Some(op) = record.operation_type {
            operations_by_day.entry(op.label()).or_insert([0; 5])[day_idx] += 1;
        }
    }

    let mut trends = Vec::new();

    // Rule 1: overall weekday volume spread.
    let max_vol = *daily_totals.iter().max().unwrap_or(&0);
    let min_vol = *daily_totals.iter().min().unwrap_or(&0);
    if max_vol > min_vol && max_vol as f64 >= min_vol as f64 * thresholds.volume_ratio {
        let max_day = WEEKDAYS[first_index_of(&daily_totals, max_vol)];
        let min_day = WEEKDAYS[first_index_of(&daily_totals, min_vol)];
        trends.push(format!(
            "• Volume spike on {max_day}: *{max_vol}* appeals vs {min_day}: *{min_vol}*"
        ));
    }

    // Rule 2: per-rule weekday spikes.
    for (rule, counts) in sorted_entries(&rules_by_day) {
        let (max, mean) = max_and_mean(counts);
        if max as f64 > mean * thresholds.rule_multiplier && max > thresholds.rule_min {
            let day = WEEKDAYS[first_index_of(counts, max)];
            trends.push(format!("• {rule} spike on {day}: *{max}* appeals"));
        }
    }

    // Rule 3: per-country weekday spikes, with an absolute escape hatch.
    for (country, counts) in sorted_entries(&countries_by_day) {
        let (max, mean) = max_and_mean(counts);
        let relative = max as f64 > mean * thresholds.country_multiplier && max > thresholds.country_min;
        if relative || max > thresholds.country_absolute {
            let day = WEEKDAYS[first_index_of(counts, max)];
            trends.push(format!(
                "• {country} appeals spike on {day}: *{max}* appeals (avg: {mean:.1})"
            ));
        }
    }

    // Rule 4: operation-type spikes. Candidates are only the types seen in
    // the Monday bucket — intentionally not the union across weekdays.
    let mut monday_ops: Vec<(&'static str, &[u32; 5])> = operations_by_day
        .iter()
        .filter(|(_, counts)| counts[0] > 0)
        .map(|(label, counts)| (*label, counts))
        .collect();
    monday_ops.sort_by_key(|(label, _)| *label);
    for (label, counts) in monday_ops {
        let (max, mean) = max_and_mean(counts);
        if max as f64 > mean * thresholds.operation_multiplier && max > thresholds.operation_min {
            let day = WEEKDAYS[first_index_of(counts, max)];
            trends.push(format!("• {label} spike on {day}: *{max}* appeals"));
        }
    }

    // Rule 5: single-date country spikes, any day of the week.
    let mut dates: Vec<&NaiveDate> = date_stats.keys().collect();
    dates.sort();
    for date in dates {
        let bucket = &date_stats[date];
        let mut countries: Vec<&String> = bucket.countries.keys().collect();
        countries.sort();
        for country in countries {
            let count = bucket.countries[country];
            if count > thresholds.date_country_min {
                let formatted = date.format("%b %-d");
                trends.push(format!("• {country} spike on {formatted}: *{count}* appeals"));
            }
        }
    }

    trends.truncate(thresholds.max_trends);
    trends
}

fn sorted_entries<'a>(map: &'a HashMap<String, [u32; 5]>) -> Vec<(&'a String, &'a [u32; 5])> {
    let mut entries: Vec<(&String, &[u32; 5])> = map.iter().collect();
    entries.sort_by_key(|(key, _)| *key);
    entries
}

fn max_and_mean(counts: &[u32; 5]) -> (u32, f64) {
    let max = *counts.iter().max().unwrap_or(&0);
    let mean = counts.iter().sum::<u32>() as f64 / WEEKDAYS.len() as f64;
    (max, mean)
}

fn first_index_of(counts: &[u32; 5], value: u32) -> usize {
    counts.iter().position(|c| *c == value).unwrap_or(0)
}
