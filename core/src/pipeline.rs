//! Pipeline orchestration — fetch, normalize, aggregate, persist.
//!
//! RULE: One analysis pass produces one `AnalysisRun` and threads it
//! through every stage. There is no process-wide mutable "current result";
//! callers own the run they are handed.
//!
//! The five warehouse queries run strictly sequentially, each waited on to
//! completion — the collaborator exposes one in-flight query at a time. A
//! fetch failure falls back to the substitute sample dataset so the
//! user-facing flow never dead-ends.

use crate::breakdown::{
    appeal_rates, country_stats, operation_type_distribution, rule_metrics, AppealRate,
    CountryStat, RuleMetric,
};
use crate::config::ReportConfig;
use crate::daily_trends::{detect_daily_trends, TrendThresholds};
use crate::delivery::{AlertSeverity, MessageSink};
use crate::error::ReportResult;
use crate::period::{aggregate_period, PercentChange, PeriodMetrics};
use crate::record::{
    normalize_appeals, normalize_secondary, normalize_terminations, AppealRecord,
    SecondaryAppealRecord, TerminationCount,
};
use crate::report::compose_report;
use crate::sample;
use crate::schedule::next_monday_run;
use crate::snapshot::HistoricalSnapshot;
use crate::store::HistoryStore;
use crate::types::{CountryCode, RuleName};
use crate::warehouse::{
    current_period_sql, previous_period_sql, previous_secondary_sql, secondary_appeals_sql,
    termination_counts_sql, Warehouse, APPEALS_OPTIONS, SECONDARY_OPTIONS, TERMINATION_OPTIONS,
};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Warehouse,
    SampleFallback,
}

/// The normalized inputs of one analysis pass, whatever their source.
pub struct SourceBatches {
    pub current: Vec<AppealRecord>,
    pub previous: Vec<AppealRecord>,
    pub terminations: Vec<TerminationCount>,
    pub secondary: Vec<SecondaryAppealRecord>,
    pub previous_secondary: Vec<SecondaryAppealRecord>,
}

impl From<sample::SampleDataset> for SourceBatches {
    fn from(s: sample::SampleDataset) -> Self {
        Self {
            current: s.current,
            previous: s.previous,
            terminations: s.terminations,
            secondary: s.secondary,
            previous_secondary: s.previous_secondary,
        }
    }
}

/// Everything one pass computed. Pure data; safe to hand to the composer,
/// the snapshot writer, and the runner summary independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub fetched_at: DateTime<Utc>,
    pub fetch_method: FetchMethod,
    pub current: PeriodMetrics,
    pub previous: PeriodMetrics,
    pub volume_change: PercentChange,
    pub acceptance_change: PercentChange,
    pub secondary_appeals: u32,
    pub previous_secondary_appeals: u32,
    pub secondary_change: PercentChange,
    pub operation_types: HashMap<String, u32>,
    pub rule_metrics: HashMap<RuleName, RuleMetric>,
    pub appeal_rates: HashMap<RuleName, AppealRate>,
    pub country_stats: HashMap<CountryCode, CountryStat>,
    pub termination_counts: Vec<TerminationCount>,
    pub daily_trends: Vec<String>,
}

/// Pure aggregation of normalized batches into a run context.
pub fn build_run(
    batches: SourceBatches,
    fetch_method: FetchMethod,
    thresholds: &TrendThresholds,
    now: DateTime<Utc>,
) -> AnalysisRun {
    let current = aggregate_period(&batches.current);
    let previous = aggregate_period(&batches.previous);

    let volume_change = PercentChange::compute(current.total_appeals, previous.total_appeals);
    let acceptance_change =
        PercentChange::compute(current.accepted_appeals, previous.accepted_appeals);

    let secondary_appeals = batches.secondary.len() as u32;
    let previous_secondary_appeals = batches.previous_secondary.len() as u32;
    let secondary_change = PercentChange::compute(secondary_appeals, previous_secondary_appeals);

    let rules = rule_metrics(&batches.current);
    let rates = appeal_rates(&rules, &batches.terminations);

    AnalysisRun {
        fetched_at: now,
        fetch_method,
        volume_change,
        acceptance_change,
        secondary_appeals,
        previous_secondary_appeals,
        secondary_change,
        operation_types: operation_type_distribution(&batches.current),
        appeal_rates: rates,
        country_stats: country_stats(&batches.current),
        daily_trends: detect_daily_trends(&batches.current, thresholds),
        rule_metrics: rules,
        termination_counts: batches.terminations,
        current,
        previous,
    }
}

/// One full analysis pass. On a warehouse failure the run is rebuilt from
/// the substitute dataset; a snapshot is persisted only for real fetches,
/// and a snapshot write failure never blocks the run.
pub fn run_once(
    warehouse: &dyn Warehouse,
    store: Option<&HistoryStore>,
    config: &ReportConfig,
    now: DateTime<Utc>,
) -> ReportResult<AnalysisRun> {
    let (batches, fetch_method) = match fetch_from_warehouse(warehouse, config) {
        Ok(batches) => (batches, FetchMethod::Warehouse),
        Err(e) if e.triggers_fallback() => {
            warn!("warehouse fetch failed ({e}); using substitute sample dataset");
            let dataset = sample::generate(config.sample_seed, now.date_naive());
            (dataset.into(), FetchMethod::SampleFallback)
        }
        Err(e) => return Err(e),
    };

    let run = build_run(batches, fetch_method, &config.trends, now);
    info!(
        "analysis complete: {} termination appeals, {} secondary appeals ({:?})",
        run.current.total_appeals, run.secondary_appeals, run.fetch_method
    );

    if run.fetch_method == FetchMethod::Warehouse {
        if let Some(store) = store {
            let snapshot = HistoricalSnapshot::from_run(&run, now);
            if let Err(e) = store.insert_snapshot(&snapshot) {
                error!("failed to persist weekly snapshot: {e}");
            }
        }
    }

    Ok(run)
}

fn fetch_from_warehouse(
    warehouse: &dyn Warehouse,
    config: &ReportConfig,
) -> ReportResult<SourceBatches> {
    let days = config.period_days;

    info!("fetching current period appeals (last {days} days)");
    let current = warehouse.query(&current_period_sql(days), &[], &APPEALS_OPTIONS)?;

    info!("fetching previous period appeals ({days} days prior)");
    let previous = warehouse.query(&previous_period_sql(days), &[], &APPEALS_OPTIONS)?;

    info!("fetching previous period secondary appeals");
    let previous_secondary =
        warehouse.query(&previous_secondary_sql(days), &[], &SECONDARY_OPTIONS)?;

    info!("fetching termination counts by rule");
    let terminations = warehouse.query(&termination_counts_sql(days), &[], &TERMINATION_OPTIONS)?;

    info!("fetching current period secondary appeals");
    let secondary = warehouse.query(&secondary_appeals_sql(days), &[], &SECONDARY_OPTIONS)?;

    Ok(SourceBatches {
        current: normalize_appeals(&current),
        previous: normalize_appeals(&previous),
        terminations: normalize_terminations(&terminations),
        secondary: normalize_secondary(&secondary),
        previous_secondary: normalize_secondary(&previous_secondary),
    })
}

/// Execute the scheduled weekly report if one is due.
///
/// Returns the sent report text, or `None` when no schedule is enabled and
/// due. On any failure a single best-effort alert is attempted to the
/// configured channel, then the error propagates; nothing is retried.
pub fn run_scheduled_report(
    warehouse: &dyn Warehouse,
    store: &HistoryStore,
    sink: &dyn MessageSink,
    config: &ReportConfig,
    user_name: &str,
    now: DateTime<Utc>,
) -> ReportResult<Option<String>> {
    let Some(schedule) = store.find_schedule()? else {
        return Ok(None);
    };
    if !schedule.is_due(now) {
        return Ok(None);
    }

    let attempt: ReportResult<String> = (|| {
        let run = run_once(warehouse, Some(store), config, now)?;
        let report = compose_report(
            &run,
            schedule.report_type,
            now.date_naive(),
            user_name,
            &config.dashboard_url,
        );
        sink.send_message(&schedule.slack_channel, &report)?;
        store.update_next_run(&schedule.schedule_id, next_monday_run(now))?;
        Ok(report)
    })();

    match attempt {
        Ok(report) => Ok(Some(report)),
        Err(e) => {
            let alert = format!("Failed to generate weekly appeal report: {e}");
            if let Err(alert_err) =
                sink.send_alert(&schedule.slack_channel, &alert, AlertSeverity::Error)
            {
                warn!("alert delivery also failed: {alert_err}");
            }
            Err(e)
        }
    }
}

// ── Week-over-week rule-rate comparison ──────────────────────────────────────

const RATE_CHANGE_PP: f64 = 2.0;
const RATE_CHANGE_MIN_APPEALS: u32 = 10;
const RATE_CHANGE_HIGH_RATE: f64 = 15.0;
const RATE_CHANGE_TOP: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleRateChange {
    pub rule: RuleName,
    pub current_rate: f64,
    pub previous_rate: f64,
    /// Percentage-point delta; equals `current_rate` when last week had no
    /// baseline for the rule.
    pub rate_change: f64,
    pub appeals: u32,
    pub terminations: i64,
}

/// Diff this run's appeal rates against the most recent snapshot. Flags
/// rules whose rate moved more than 2pp on meaningful volume, or sits
/// above 15% outright; strongest movers first, top 6.
pub fn rule_rate_changes(
    run: &AnalysisRun,
    history: &[HistoricalSnapshot],
) -> Vec<RuleRateChange> {
    let last_week = history.first();
    let mut changes: Vec<RuleRateChange> = Vec::new();

    let mut rules: Vec<&RuleName> = run.appeal_rates.keys().collect();
    rules.sort();
    for rule in rules {
        let rate = &run.appeal_rates[rule];
        let previous_appeals = last_week
            .and_then(|s| s.rule_breakdown.get(rule))
            .map(|m| m.appeals)
            .unwrap_or(0);
        let previous_terminations = last_week
            .and_then(|s| {
                s.termination_counts
                    .iter()
                    .find(|t| &t.rule_name == rule)
                    .map(|t| t.total_terminations)
            })
            .unwrap_or(0);
        let previous_rate = if previous_terminations > 0 {
            previous_appeals as f64 / previous_terminations as f64 * 100.0
        } else {
            0.0
        };

        let rate_change = if previous_rate > 0.0 {
            rate.appeal_rate - previous_rate
        } else {
            rate.appeal_rate
        };

        let moved = rate_change.abs() > RATE_CHANGE_PP && rate.appeals > RATE_CHANGE_MIN_APPEALS;
        if moved || rate.appeal_rate > RATE_CHANGE_HIGH_RATE {
            changes.push(RuleRateChange {
                rule: rule.clone(),
                current_rate: rate.appeal_rate,
                previous_rate,
                rate_change,
                appeals: rate.appeals,
                terminations: rate.total_terminations,
            });
        }
    }

    changes.sort_by(|a, b| {
        b.rate_change
            .abs()
            .partial_cmp(&a.rate_change.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.rule.cmp(&b.rule))
    });
    changes.truncate(RATE_CHANGE_TOP);
    changes
}
