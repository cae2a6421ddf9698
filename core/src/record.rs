//! Canonical record shapes and the ingestion-boundary normalizer.
//!
//! RULE: Loosely-typed warehouse rows are coerced into these structs here
//! and nowhere else. Downstream stages never touch raw `serde_json::Value`.
//! A row missing its required fields is skipped with a warning — one bad
//! row never aborts a whole analysis pass.

use crate::types::{CountryCode, RuleName, ShopId};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a fraud termination was executed, as labelled by the warehouse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperationType {
    #[serde(rename = "Bulk Shop Process")]
    BulkShopProcess,
    #[serde(rename = "Multi-Shop Review")]
    MultiShopReview,
    #[serde(rename = "Automated Rule")]
    AutomatedRule,
    #[serde(rename = "Manual Review")]
    ManualReview,
    #[serde(rename = "Other")]
    Other,
}

impl OperationType {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Bulk Shop Process" => OperationType::BulkShopProcess,
            "Multi-Shop Review" => OperationType::MultiShopReview,
            "Automated Rule" => OperationType::AutomatedRule,
            "Manual Review" => OperationType::ManualReview,
            _ => OperationType::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationType::BulkShopProcess => "Bulk Shop Process",
            OperationType::MultiShopReview => "Multi-Shop Review",
            OperationType::AutomatedRule => "Automated Rule",
            OperationType::ManualReview => "Manual Review",
            OperationType::Other => "Other",
        }
    }
}

/// One fraud-termination appeal event. Immutable once normalized; held in
/// memory only for the duration of one analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealRecord {
    pub termination_reason: Option<String>,
    pub shop_id: ShopId,
    pub appeal_date: Option<NaiveDate>,
    pub rule_name: Option<RuleName>,
    pub operation_type: Option<OperationType>,
    pub appeal_pathway_detail: Option<String>,
    pub days_to_appeal: Option<i64>,
    pub shop_country_code: Option<CountryCode>,
    pub shop_continent: Option<String>,
    pub llm_decision: Option<String>,
    pub llm_assessment_date: Option<String>,
}

impl AppealRecord {
    /// Coerce one warehouse row. `shop_id` is the only required field;
    /// everything else degrades to `None`.
    pub fn from_row(row: &Value) -> Option<Self> {
        let shop_id = int_field(row, "shop_id")?;
        Some(Self {
            termination_reason: str_field(row, "termination_reason"),
            shop_id,
            appeal_date: str_field(row, "appeal_date")
                .as_deref()
                .and_then(parse_appeal_date),
            rule_name: str_field(row, "rule_name"),
            operation_type: str_field(row, "operation_type")
                .as_deref()
                .map(OperationType::from_label),
            appeal_pathway_detail: str_field(row, "appeal_pathway_detail")
                .map(|p| normalize_pathway(&p)),
            days_to_appeal: int_field(row, "days_to_appeal"),
            shop_country_code: str_field(row, "shop_country_code"),
            shop_continent: str_field(row, "shop_continent"),
            llm_decision: str_field(row, "llm_decision"),
            llm_assessment_date: str_field(row, "llm_assessment_date"),
        })
    }
}

/// Per-rule termination totals — the appeal-rate denominator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationCount {
    pub rule_name: RuleName,
    pub total_terminations: i64,
}

impl TerminationCount {
    pub fn from_row(row: &Value) -> Option<Self> {
        let rule_name = str_field(row, "rule_name").filter(|r| !r.is_empty())?;
        let total_terminations = int_field(row, "total_terminations")?;
        Some(Self {
            rule_name,
            total_terminations,
        })
    }
}

/// A payments-rejection appeal from the secondary channel. Counted only,
/// never broken down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryAppealRecord {
    pub ticket_id: i64,
    pub shop_id: ShopId,
    pub appeal_date: Option<NaiveDate>,
}

impl SecondaryAppealRecord {
    pub fn from_row(row: &Value) -> Option<Self> {
        let ticket_id = int_field(row, "ticket_id")?;
        let shop_id = int_field(row, "shop_id")?;
        Some(Self {
            ticket_id,
            shop_id,
            appeal_date: str_field(row, "appeal_date")
                .as_deref()
                .and_then(parse_appeal_date),
        })
    }
}

/// Normalize a batch of rows, dropping the ones that fail required-field
/// checks.
pub fn normalize_appeals(rows: &[Value]) -> Vec<AppealRecord> {
    normalize(rows, AppealRecord::from_row, "appeal")
}

pub fn normalize_terminations(rows: &[Value]) -> Vec<TerminationCount> {
    normalize(rows, TerminationCount::from_row, "termination count")
}

pub fn normalize_secondary(rows: &[Value]) -> Vec<SecondaryAppealRecord> {
    normalize(rows, SecondaryAppealRecord::from_row, "secondary appeal")
}

fn normalize<T>(rows: &[Value], f: impl Fn(&Value) -> Option<T>, kind: &str) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for row in rows {
        match f(row) {
            Some(rec) => out.push(rec),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("skipped {skipped} malformed {kind} row(s)");
    }
    out
}

/// Parse a warehouse date tolerantly: date-only, RFC 3339, or a bare
/// `YYYY-MM-DD HH:MM:SS` timestamp. Anything else is `None`.
pub fn parse_appeal_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    None
}

/// The warehouse abbreviates one pathway label; expand it so all sources
/// agree.
fn normalize_pathway(pathway: &str) -> String {
    if pathway == "support_esc" {
        "support_escalation".to_string()
    } else {
        pathway.to_string()
    }
}

// ── Row field access ─────────────────────────────────────────────────────────

/// A string field. Null, absent, and non-string values all collapse to None.
fn str_field(row: &Value, key: &str) -> Option<String> {
    match row.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// An integer field, accepting JSON numbers and numeric strings — BigQuery
/// style exports stringify INT64 columns.
fn int_field(row: &Value, key: &str) -> Option<i64> {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
