use appeals_core::config::ReportConfig;
use appeals_core::delivery::{AlertSeverity, MessageSink};
use appeals_core::error::{ReportError, ReportResult};
use appeals_core::pipeline::{run_once, run_scheduled_report, FetchMethod};
use appeals_core::report::ReportType;
use appeals_core::schedule::Schedule;
use appeals_core::store::HistoryStore;
use appeals_core::warehouse::{
    current_period_sql, previous_period_sql, previous_secondary_sql, secondary_appeals_sql,
    termination_counts_sql, QueryOptions, Warehouse,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;

// ── Fakes ────────────────────────────────────────────────────────────────────

struct FakeWarehouse {
    responses: HashMap<String, Vec<Value>>,
}

impl FakeWarehouse {
    /// 4 current appeals, 2 previous, one termination row, 1 current and
    /// 2 previous secondary appeals.
    fn standard(days: u32) -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            current_period_sql(days),
            vec![
                json!({"shop_id": 1, "appeal_date": "2025-06-02", "rule_name": "R1", "llm_decision": "approved"}),
                json!({"shop_id": 2, "appeal_date": "2025-06-03", "rule_name": "R1", "llm_decision": "approved"}),
                json!({"shop_id": 3, "appeal_date": "2025-06-04", "rule_name": "R1", "llm_decision": "rejected"}),
                json!({"shop_id": 4, "appeal_date": "2025-06-05", "rule_name": null, "llm_decision": null}),
            ],
        );
        responses.insert(
            previous_period_sql(days),
            vec![
                json!({"shop_id": 5, "appeal_date": "2025-05-27", "llm_decision": "approved"}),
                json!({"shop_id": 6, "appeal_date": "2025-05-28", "llm_decision": null}),
            ],
        );
        responses.insert(
            previous_secondary_sql(days),
            vec![
                json!({"ticket_id": 11, "shop_id": 5, "appeal_date": "2025-05-27"}),
                json!({"ticket_id": 12, "shop_id": 6, "appeal_date": "2025-05-28"}),
            ],
        );
        responses.insert(
            termination_counts_sql(days),
            vec![json!({"rule_name": "R1", "total_terminations": "10"})],
        );
        responses.insert(
            secondary_appeals_sql(days),
            vec![json!({"ticket_id": 13, "shop_id": 1, "appeal_date": "2025-06-02"})],
        );
        Self { responses }
    }
}

impl Warehouse for FakeWarehouse {
    fn query(&self, sql: &str, _params: &[Value], _options: &QueryOptions) -> ReportResult<Vec<Value>> {
        self.responses
            .get(sql)
            .cloned()
            .ok_or_else(|| ReportError::Query("unexpected query".to_string()))
    }
}

struct DeniedWarehouse;

impl Warehouse for DeniedWarehouse {
    fn query(&self, _sql: &str, _params: &[Value], _options: &QueryOptions) -> ReportResult<Vec<Value>> {
        Err(ReportError::AccessDenied("scope not granted".to_string()))
    }
}

#[derive(Default)]
struct CaptureSink {
    fail_send: bool,
    messages: RefCell<Vec<(String, String)>>,
    alerts: RefCell<Vec<(String, String)>>,
}

impl MessageSink for CaptureSink {
    fn send_message(&self, destination: &str, text: &str) -> ReportResult<()> {
        if self.fail_send {
            return Err(ReportError::Delivery("channel is archived".to_string()));
        }
        self.messages
            .borrow_mut()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }

    fn send_alert(&self, destination: &str, text: &str, _severity: AlertSeverity) -> ReportResult<()> {
        self.alerts
            .borrow_mut()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}

fn store() -> HistoryStore {
    let store = HistoryStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn due_schedule(channel: &str) -> Schedule {
    let mut schedule = Schedule::weekly(channel, ReportType::Weekly, Utc::now());
    schedule.next_run = Utc::now() - Duration::hours(1);
    schedule
}

// ── run_once ─────────────────────────────────────────────────────────────────

#[test]
fn warehouse_run_aggregates_and_snapshots() {
    let config = ReportConfig::default();
    let warehouse = FakeWarehouse::standard(config.period_days);
    let store = store();
    let now = Utc.with_ymd_and_hms(2025, 6, 9, 9, 0, 0).unwrap();

    let run = run_once(&warehouse, Some(&store), &config, now).unwrap();

    assert_eq!(run.fetch_method, FetchMethod::Warehouse);
    assert_eq!(run.current.total_appeals, 4);
    assert_eq!(run.current.accepted_appeals, 2);
    assert_eq!(run.current.rejected_appeals, 1);
    assert_eq!(run.current.pending_appeals, 1);
    assert_eq!(run.previous.total_appeals, 2);
    assert_eq!(run.secondary_appeals, 1);
    assert_eq!(run.secondary_change.as_label(), "-50.0");
    // R1: 3 appeals over 10 terminations.
    assert_eq!(run.appeal_rates["R1"].appeal_rate, 30.0);

    assert_eq!(store.snapshot_count().unwrap(), 1);
    let snapshots = store.recent_snapshots(8).unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].current.total_appeals, 4);
    assert_eq!(snapshots[0].week, 24);
    assert_eq!(snapshots[0].year, 2025);
}

/// A denied warehouse degrades to the substitute dataset instead of
/// failing the run; no snapshot is written for substitute data.
#[test]
fn denied_warehouse_falls_back_to_sample_data() {
    let config = ReportConfig::default();
    let store = store();

    let run = run_once(&DeniedWarehouse, Some(&store), &config, Utc::now()).unwrap();

    assert_eq!(run.fetch_method, FetchMethod::SampleFallback);
    assert!(run.current.total_appeals >= 450);
    assert_eq!(store.snapshot_count().unwrap(), 0);
}

/// Same seed, same day: the fallback dataset is reproducible.
#[test]
fn fallback_runs_are_deterministic() {
    let config = ReportConfig::default();
    let now = Utc.with_ymd_and_hms(2025, 6, 9, 9, 0, 0).unwrap();

    let a = run_once(&DeniedWarehouse, None, &config, now).unwrap();
    let b = run_once(&DeniedWarehouse, None, &config, now).unwrap();

    assert_eq!(a.current, b.current);
    assert_eq!(a.daily_trends, b.daily_trends);
}

/// A snapshot write failure (no schema here) is logged, not fatal.
#[test]
fn storage_failure_does_not_block_the_run() {
    let config = ReportConfig::default();
    let warehouse = FakeWarehouse::standard(config.period_days);
    let unmigrated = HistoryStore::in_memory().unwrap();

    let run = run_once(&warehouse, Some(&unmigrated), &config, Utc::now()).unwrap();
    assert_eq!(run.current.total_appeals, 4);
}

// ── Scheduled runs ───────────────────────────────────────────────────────────

#[test]
fn scheduled_run_sends_report_and_advances_next_run() {
    let config = ReportConfig::default();
    let warehouse = FakeWarehouse::standard(config.period_days);
    let store = store();
    let sink = CaptureSink::default();
    let now = Utc::now();

    store.enable_schedule(&due_schedule("#fraud-ops")).unwrap();
    let sent = run_scheduled_report(&warehouse, &store, &sink, &config, "Jane Doe", now).unwrap();

    let report = sent.expect("a due schedule must produce a report");
    assert!(report.contains("*Weekly Appeals Report*"));

    let messages = sink.messages.borrow();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "#fraud-ops");
    assert_eq!(messages[0].1, report);

    let schedule = store.find_schedule().unwrap().unwrap();
    assert!(schedule.next_run > now);
}

#[test]
fn scheduled_run_is_a_no_op_when_not_due() {
    let config = ReportConfig::default();
    let warehouse = FakeWarehouse::standard(config.period_days);
    let store = store();
    let sink = CaptureSink::default();

    // Schedule::weekly points at next Monday, which is in the future.
    store
        .enable_schedule(&Schedule::weekly("#fraud-ops", ReportType::Weekly, Utc::now()))
        .unwrap();
    let sent =
        run_scheduled_report(&warehouse, &store, &sink, &config, "Jane Doe", Utc::now()).unwrap();

    assert!(sent.is_none());
    assert!(sink.messages.borrow().is_empty());
}

#[test]
fn scheduled_run_without_schedule_is_a_no_op() {
    let config = ReportConfig::default();
    let warehouse = FakeWarehouse::standard(config.period_days);
    let store = store();
    let sink = CaptureSink::default();

    let sent =
        run_scheduled_report(&warehouse, &store, &sink, &config, "Jane Doe", Utc::now()).unwrap();
    assert!(sent.is_none());
}

/// Delivery failure surfaces the error and fires exactly one best-effort
/// alert to the configured channel.
#[test]
fn delivery_failure_triggers_single_alert() {
    let config = ReportConfig::default();
    let warehouse = FakeWarehouse::standard(config.period_days);
    let store = store();
    let sink = CaptureSink {
        fail_send: true,
        ..CaptureSink::default()
    };

    store.enable_schedule(&due_schedule("#fraud-ops")).unwrap();
    let result = run_scheduled_report(&warehouse, &store, &sink, &config, "Jane Doe", Utc::now());

    assert!(matches!(result, Err(ReportError::Delivery(_))));
    let alerts = sink.alerts.borrow();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].0, "#fraud-ops");
    assert!(alerts[0].1.contains("Failed to generate weekly appeal report"));
}
