//! The analytical data-warehouse boundary.
//!
//! RULE: The pipeline issues exactly five queries per run, strictly one at
//! a time, in the order the builder functions appear below. Query text is
//! owned here; no other module embeds SQL for the warehouse.

use crate::error::ReportResult;
use serde_json::Value;

/// Options forwarded to the warehouse. Timeouts are enforced by the
/// collaborator, not by this crate.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub timeout_ms: u64,
    pub max_results: u32,
}

pub const APPEALS_OPTIONS: QueryOptions = QueryOptions {
    timeout_ms: 60_000,
    max_results: 10_000,
};

pub const SECONDARY_OPTIONS: QueryOptions = QueryOptions {
    timeout_ms: 60_000,
    max_results: 5_000,
};

pub const TERMINATION_OPTIONS: QueryOptions = QueryOptions {
    timeout_ms: 60_000,
    max_results: 1_000,
};

/// One in-flight query at a time; rows come back as loosely-typed JSON
/// objects and are normalized in `record`.
pub trait Warehouse {
    fn query(
        &self,
        sql: &str,
        params: &[Value],
        options: &QueryOptions,
    ) -> ReportResult<Vec<Value>>;
}

/// Fraud-termination appeals for the last `days` days, with the most
/// recent LLM assessment per shop.
pub fn current_period_sql(days: u32) -> String {
    format!(
        "SELECT
    t.termination_reason,
    t.shop_id,
    DATE(t.appealed_at) AS appeal_date,
    t.rule_name,
    t.operation_type,
    t.appeal_pathway_detail,
    DATE_DIFF(DATE(t.appealed_at), DATE(t.terminated_at), DAY) AS days_to_appeal,
    t.shop_country_code,
    t.shop_continent,
    a.assessment AS llm_decision,
    a.created_at AS llm_assessment_date
FROM dw.fraud.shop_terminations t
LEFT JOIN dw.fraud.appeal_assessments a
    ON a.shop_id = t.shop_id AND a.dispute_type = 'appeal'
WHERE DATE(t.appealed_at) >= DATE_SUB(CURRENT_DATE(), INTERVAL {days} DAY)
    AND t.termination_reason_category = 'fraud'
    AND t.was_appealed = TRUE
QUALIFY ROW_NUMBER() OVER (PARTITION BY t.shop_id ORDER BY a.created_at DESC NULLS LAST) = 1
ORDER BY t.appealed_at, t.termination_reason, t.shop_id"
    )
}

/// The prior window of the same length, ending where the current one
/// starts. Only the columns the comparison needs.
pub fn previous_period_sql(days: u32) -> String {
    format!(
        "SELECT
    t.termination_reason,
    t.shop_id,
    DATE(t.appealed_at) AS appeal_date,
    a.assessment AS llm_decision
FROM dw.fraud.shop_terminations t
LEFT JOIN dw.fraud.appeal_assessments a
    ON a.shop_id = t.shop_id AND a.dispute_type = 'appeal'
WHERE DATE(t.appealed_at) >= DATE_SUB(CURRENT_DATE(), INTERVAL {prior} DAY)
    AND DATE(t.appealed_at) < DATE_SUB(CURRENT_DATE(), INTERVAL {days} DAY)
    AND t.termination_reason_category = 'fraud'
    AND t.was_appealed = TRUE
QUALIFY ROW_NUMBER() OVER (PARTITION BY t.shop_id ORDER BY a.created_at DESC NULLS LAST) = 1
ORDER BY t.appealed_at, t.termination_reason, t.shop_id",
        prior = days * 2
    )
}

/// Previous-period secondary-channel (payments-rejection) appeals.
pub fn previous_secondary_sql(days: u32) -> String {
    format!(
        "SELECT
    w.ticket_id,
    w.shop_id,
    DATE(d.created_at) AS appeal_date
FROM dw.fraud.platform_tickets w
INNER JOIN dw.fraud.platform_actions p
    ON w.ticket_id = p.actionable_id AND p.action_type IN ({actions})
INNER JOIN dw.fraud.platform_disputes d
    ON w.ticket_id = d.ticket_id AND d.type = 'appeal' AND d.created_at > p.created_at
WHERE DATE(d.created_at) >= DATE_SUB(CURRENT_DATE(), INTERVAL {prior} DAY)
    AND DATE(d.created_at) < DATE_SUB(CURRENT_DATE(), INTERVAL {days} DAY)
    AND w.team = 'Fraud'
ORDER BY d.created_at DESC",
        actions = PAYMENT_REJECT_ACTIONS,
        prior = days * 2
    )
}

/// Fraud termination totals per rule — the appeal-rate denominator.
pub fn termination_counts_sql(days: u32) -> String {
    format!(
        "SELECT
    t.rule_name,
    COUNT(*) AS total_terminations
FROM dw.fraud.shop_terminations t
WHERE DATE(t.terminated_at) >= DATE_SUB(CURRENT_DATE(), INTERVAL {days} DAY)
    AND t.termination_reason_category = 'fraud'
    AND t.rule_name IS NOT NULL
    AND t.rule_name != ''
GROUP BY t.rule_name
ORDER BY total_terminations DESC"
    )
}

/// Current-period secondary-channel appeals.
pub fn secondary_appeals_sql(days: u32) -> String {
    format!(
        "SELECT
    w.ticket_id,
    w.shop_id,
    DATE(d.created_at) AS appeal_date
FROM dw.fraud.platform_tickets w
INNER JOIN dw.fraud.platform_actions p
    ON w.ticket_id = p.actionable_id AND p.action_type IN ({actions})
INNER JOIN dw.fraud.platform_disputes d
    ON w.ticket_id = d.ticket_id AND d.type = 'appeal' AND d.created_at > p.created_at
WHERE DATE(d.created_at) >= DATE_SUB(CURRENT_DATE(), INTERVAL {days} DAY)
    AND w.team = 'Fraud'
ORDER BY d.created_at DESC",
        actions = PAYMENT_REJECT_ACTIONS,
    )
}

const PAYMENT_REJECT_ACTIONS: &str = "'payments_monitor_reject', 'reject_payments', \
'reject_payments_with_communications', 'reject_payments_without_communications'";
