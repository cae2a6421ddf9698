//! report-runner: headless runner for the appeal-trends pipeline.
//!
//! Usage:
//!   report-runner --seed 42 --report-type weekly --db history.db
//!   report-runner --offline             (forces the sample-data fallback)
//!   report-runner --channel '#fraud-ops' --user 'J. Chen'

use anyhow::Result;
use appeals_core::{
    config::ReportConfig,
    delivery::{AlertSeverity, MessageSink},
    error::{ReportError, ReportResult},
    pipeline::{rule_rate_changes, run_once, AnalysisRun},
    report::{compose_report, ReportType},
    sample,
    store::HistoryStore,
    warehouse::{
        current_period_sql, previous_period_sql, previous_secondary_sql, secondary_appeals_sql,
        termination_counts_sql, QueryOptions, Warehouse,
    },
};
use appeals_core::breakdown::{top_countries_by_appeals, top_rules_by_appeals};
use chrono::Utc;
use log::info;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Replays the deterministic sample dataset as warehouse rows, keyed by
/// the exact query text the pipeline issues. Unknown queries fail the way
/// a real warehouse schema drift would.
struct SampleWarehouse {
    responses: HashMap<String, Vec<Value>>,
}

impl SampleWarehouse {
    fn build(seed: u64, days: u32) -> Result<Self> {
        let dataset = sample::generate(seed, Utc::now().date_naive());
        let mut responses = HashMap::new();
        responses.insert(current_period_sql(days), to_rows(&dataset.current)?);
        responses.insert(previous_period_sql(days), to_rows(&dataset.previous)?);
        responses.insert(
            previous_secondary_sql(days),
            to_rows(&dataset.previous_secondary)?,
        );
        responses.insert(termination_counts_sql(days), to_rows(&dataset.terminations)?);
        responses.insert(secondary_appeals_sql(days), to_rows(&dataset.secondary)?);
        Ok(Self { responses })
    }
}

impl Warehouse for SampleWarehouse {
    fn query(&self, sql: &str, _params: &[Value], _options: &QueryOptions) -> ReportResult<Vec<Value>> {
        self.responses
            .get(sql)
            .cloned()
            .ok_or_else(|| ReportError::Query("unrecognized query text".to_string()))
    }
}

/// A warehouse with no permissions — exercises the fallback path.
struct OfflineWarehouse;

impl Warehouse for OfflineWarehouse {
    fn query(&self, _sql: &str, _params: &[Value], _options: &QueryOptions) -> ReportResult<Vec<Value>> {
        Err(ReportError::AccessDenied(
            "warehouse scope not granted".to_string(),
        ))
    }
}

struct StdoutSink;

impl MessageSink for StdoutSink {
    fn send_message(&self, destination: &str, text: &str) -> ReportResult<()> {
        println!("── message to {destination} ──\n{text}\n");
        Ok(())
    }

    fn send_alert(&self, destination: &str, text: &str, severity: AlertSeverity) -> ReportResult<()> {
        println!("── alert [{}] to {destination} ──\n{text}\n", severity.as_str());
        Ok(())
    }
}

fn to_rows<T: serde::Serialize>(records: &[T]) -> Result<Vec<Value>> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(Into::into))
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let offline = args.iter().any(|a| a == "--offline");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let user = str_arg(&args, "--user").unwrap_or("Appeal Trends Analyzer");
    let channel = str_arg(&args, "--channel");
    let report_type = str_arg(&args, "--report-type")
        .map(ReportType::from_str)
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or(ReportType::Weekly);

    let config = match str_arg(&args, "--config") {
        Some(path) => ReportConfig::load(Path::new(path))?,
        None => ReportConfig::default(),
    };

    let store = if db == ":memory:" {
        HistoryStore::in_memory()?
    } else {
        HistoryStore::open(db)?
    };
    store.migrate()?;
    info!("history store ready ({db})");

    let now = Utc::now();
    let history = store.recent_snapshots(config.history_limit)?;

    let run = if offline {
        run_once(&OfflineWarehouse, Some(&store), &config, now)?
    } else {
        let warehouse = SampleWarehouse::build(seed, config.period_days)?;
        run_once(&warehouse, Some(&store), &config, now)?
    };

    let report = compose_report(&run, report_type, now.date_naive(), user, &config.dashboard_url);

    match channel {
        Some(channel) => StdoutSink.send_message(channel, &report)?,
        None => println!("{report}\n"),
    }

    print_summary(&run, &store, &history);
    Ok(())
}

fn print_summary(run: &AnalysisRun, store: &HistoryStore, history: &[appeals_core::snapshot::HistoricalSnapshot]) {
    println!("── summary ──");
    println!("  fetch method:     {:?}", run.fetch_method);
    println!(
        "  appeals:          {} total / {} accepted / {} rejected / {} pending",
        run.current.total_appeals,
        run.current.accepted_appeals,
        run.current.rejected_appeals,
        run.current.pending_appeals
    );
    println!("  acceptance rate:  {:.1}%", run.current.acceptance_rate);
    println!("  avg days to appeal: {:.1}", run.current.avg_days_to_appeal);
    println!("  secondary appeals:  {}", run.secondary_appeals);

    println!("  top rules:");
    for (rule, metric) in top_rules_by_appeals(&run.rule_metrics, 8) {
        println!(
            "    {rule}: {} appeals, {}% accepted",
            metric.appeals,
            metric.acceptance_pct()
        );
    }

    println!("  top countries:");
    for (country, stat) in top_countries_by_appeals(&run.country_stats, 5) {
        println!("    {country} ({}): {} appeals", stat.continent, stat.appeals);
    }

    let mut ops: Vec<(&String, &u32)> = run.operation_types.iter().collect();
    ops.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    println!("  operation types:");
    for (label, count) in ops {
        println!("    {label}: {count}");
    }

    if !run.daily_trends.is_empty() {
        println!("  daily trends:");
        for line in &run.daily_trends {
            println!("    {line}");
        }
    }

    let changes = rule_rate_changes(run, history);
    if !changes.is_empty() {
        println!("  rule-rate movers vs last week:");
        for c in changes {
            println!(
                "    {}: {:.1}% appeal rate ({:+.1}pp) - {}/{} appeals",
                c.rule, c.current_rate, c.rate_change, c.appeals, c.terminations
            );
        }
    }

    match store.snapshot_count() {
        Ok(count) => println!("  snapshots stored: {count}"),
        Err(e) => println!("  snapshots stored: unavailable ({e})"),
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
