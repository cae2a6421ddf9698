use appeals_core::breakdown::{
    appeal_rates, country_stats, operation_type_distribution, rule_metrics,
    rules_needing_attention, top_rules_by_appeals, AppealRate,
};
use appeals_core::record::{AppealRecord, OperationType, TerminationCount};
use std::collections::HashMap;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn record(rule: Option<&str>, country: Option<&str>, decision: Option<&str>) -> AppealRecord {
    AppealRecord {
        termination_reason: Some("fraud".to_string()),
        shop_id: 1,
        appeal_date: None,
        rule_name: rule.map(str::to_string),
        operation_type: Some(OperationType::AutomatedRule),
        appeal_pathway_detail: None,
        days_to_appeal: None,
        shop_country_code: country.map(str::to_string),
        shop_continent: country.map(|_| "Europe".to_string()),
        llm_decision: decision.map(str::to_string),
        llm_assessment_date: None,
    }
}

fn terminations(rows: &[(&str, i64)]) -> Vec<TerminationCount> {
    rows.iter()
        .map(|(rule, total)| TerminationCount {
            rule_name: rule.to_string(),
            total_terminations: *total,
        })
        .collect()
}

fn rate(appeals: u32, total_terminations: i64, appeal_rate: f64) -> AppealRate {
    AppealRate {
        appeals,
        total_terminations,
        appeal_rate,
    }
}

// ── Rule metrics ─────────────────────────────────────────────────────────────

#[test]
fn rule_metrics_excludes_unknown_and_empty_rules() {
    let records = vec![
        record(Some("R1"), None, Some("approved")),
        record(Some("R1"), None, Some("rejected")),
        record(Some("Unknown"), None, None),
        record(Some(""), None, None),
        record(None, None, None),
    ];
    let metrics = rule_metrics(&records);

    assert_eq!(metrics.len(), 1);
    let r1 = &metrics["R1"];
    assert_eq!(r1.appeals, 2);
    assert_eq!(r1.accepted, 1);
    assert_eq!(r1.rejected, 1);
}

#[test]
fn top_rules_ranked_by_appeals_with_name_tiebreak() {
    let records = vec![
        record(Some("B"), None, None),
        record(Some("B"), None, None),
        record(Some("A"), None, None),
        record(Some("A"), None, None),
        record(Some("C"), None, None),
    ];
    let top = top_rules_by_appeals(&rule_metrics(&records), 8);
    let names: Vec<&str> = top.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

// ── Appeal rates ─────────────────────────────────────────────────────────────

/// The termination rows are the outer key set: a rule with terminations
/// and zero appeals still appears, with rate 0.
#[test]
fn termination_only_rule_appears_with_zero_rate() {
    let metrics = rule_metrics(&[record(Some("R1"), None, None)]);
    let rates = appeal_rates(&metrics, &terminations(&[("R1", 10), ("X", 50)]));

    let x = &rates["X"];
    assert_eq!(x.appeals, 0);
    assert_eq!(x.total_terminations, 50);
    assert_eq!(format!("{:.1}", x.appeal_rate), "0.0");
}

/// The converse: a rule with appeals but no termination-count row is
/// silently absent. Preserved, not fixed.
#[test]
fn rule_without_termination_row_is_absent() {
    let metrics = rule_metrics(&[record(Some("OrphanRule"), None, None)]);
    let rates = appeal_rates(&metrics, &terminations(&[("R1", 10)]));
    assert!(!rates.contains_key("OrphanRule"));
}

#[test]
fn appeal_rate_bounds() {
    let records: Vec<AppealRecord> = (0..5).map(|_| record(Some("R1"), None, None)).collect();
    let metrics = rule_metrics(&records);
    let rates = appeal_rates(&metrics, &terminations(&[("R1", 20), ("Z", 0)]));

    let r1 = &rates["R1"];
    assert!(r1.appeal_rate >= 0.0 && r1.appeal_rate <= 100.0);
    assert_eq!(r1.appeal_rate, 25.0);
    // Zero denominator is exactly 0, never NaN or infinity.
    assert_eq!(rates["Z"].appeal_rate, 0.0);
}

// ── Country stats ────────────────────────────────────────────────────────────

#[test]
fn country_stats_keeps_explicit_unknown_bucket() {
    let records = vec![
        record(None, Some("DE"), Some("approved")),
        record(None, Some("DE"), None),
        record(None, None, Some("rejected")),
    ];
    let stats = country_stats(&records);

    assert_eq!(stats["DE"].appeals, 2);
    assert_eq!(stats["DE"].approved, 1);
    assert_eq!(stats["DE"].continent, "Europe");
    assert_eq!(stats["Unknown"].appeals, 1);
    assert_eq!(stats["Unknown"].rejected, 1);
}

#[test]
fn operation_distribution_counts_unknown() {
    let mut records = vec![record(None, None, None)];
    records[0].operation_type = None;
    records.push(record(None, None, None));
    let dist = operation_type_distribution(&records);

    assert_eq!(dist["Unknown"], 1);
    assert_eq!(dist["Automated Rule"], 1);
}

// ── Cascading high-rate selection ────────────────────────────────────────────

#[test]
fn primary_tier_takes_top_five_by_rate() {
    let mut rates = HashMap::new();
    for (i, name) in ["R1", "R2", "R3", "R4", "R5", "R6"].iter().enumerate() {
        rates.insert(name.to_string(), rate(10, 50, 12.0 + i as f64));
    }
    let selected = rules_needing_attention(&rates);

    assert_eq!(selected.len(), 5);
    assert_eq!(selected[0].0, "R6"); // highest rate first
    assert!(!selected.iter().any(|(name, _)| name == "R1"));
}

/// Fewer than three rules pass the primary filter: fall back to the top
/// three by rate among rules with more than three appeals.
#[test]
fn fallback_tier_fires_when_primary_is_thin() {
    let mut rates = HashMap::new();
    rates.insert("Big".to_string(), rate(20, 50, 40.0)); // passes primary
    rates.insert("MidA".to_string(), rate(4, 100, 4.0));
    rates.insert("MidB".to_string(), rate(4, 50, 8.0));
    rates.insert("Tiny".to_string(), rate(2, 100, 2.0)); // appeals too low
    let selected = rules_needing_attention(&rates);

    assert_eq!(selected.len(), 3);
    let names: Vec<&str> = selected.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Big", "MidB", "MidA"]);
}

#[test]
fn selection_is_empty_only_when_no_rule_has_volume() {
    let mut rates = HashMap::new();
    rates.insert("Tiny".to_string(), rate(1, 100, 1.0));
    assert!(rules_needing_attention(&rates).is_empty());
    assert!(rules_needing_attention(&HashMap::new()).is_empty());
}
