//! Deterministic substitute dataset for fallback runs.
//!
//! RULE: No platform RNG. The generator is seeded explicitly, so a
//! fallback run with the same seed and date always yields the same
//! dataset — demos and tests stay reproducible.

use crate::record::{AppealRecord, OperationType, SecondaryAppealRecord, TerminationCount};
use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

const RULE_CATALOG: [&str; 8] = [
    "Stolen Card Velocity",
    "Chargeback Ratio Breach",
    "Synthetic Identity Cluster",
    "High-Risk Vertical Signup",
    "Rapid Inventory Swap",
    "Linked Terminated Account",
    "Proxy Checkout Abuse",
    "Mismatched Fulfilment Signals",
];

const COUNTRY_CATALOG: [(&str, &str); 8] = [
    ("US", "North America"),
    ("CA", "North America"),
    ("GB", "Europe"),
    ("DE", "Europe"),
    ("FR", "Europe"),
    ("BR", "South America"),
    ("AU", "Oceania"),
    ("IN", "Asia"),
];

const OPERATION_CATALOG: [OperationType; 5] = [
    OperationType::AutomatedRule,
    OperationType::BulkShopProcess,
    OperationType::MultiShopReview,
    OperationType::ManualReview,
    OperationType::Other,
];

pub struct SampleDataset {
    pub current: Vec<AppealRecord>,
    pub previous: Vec<AppealRecord>,
    pub terminations: Vec<TerminationCount>,
    pub secondary: Vec<SecondaryAppealRecord>,
    pub previous_secondary: Vec<SecondaryAppealRecord>,
}

/// Generate a plausible week of appeal activity ending at `today`.
pub fn generate(seed: u64, today: NaiveDate) -> SampleDataset {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);

    let current_total = 450 + rng.gen_range(0..100);
    let previous_total = 420 + rng.gen_range(0..100);

    let current = appeal_batch(&mut rng, today, 0, current_total);
    let previous = appeal_batch(&mut rng, today, 7, previous_total);

    let terminations = RULE_CATALOG
        .iter()
        .map(|rule| TerminationCount {
            rule_name: rule.to_string(),
            total_terminations: rng.gen_range(60..400),
        })
        .collect();

    let secondary_total = rng.gen_range(25..60);
    let previous_secondary_total = rng.gen_range(25..60);
    let secondary = secondary_batch(&mut rng, today, 0, secondary_total);
    let previous_secondary = secondary_batch(&mut rng, today, 7, previous_secondary_total);

    SampleDataset {
        current,
        previous,
        terminations,
        secondary,
        previous_secondary,
    }
}

fn appeal_batch(
    rng: &mut Pcg64Mcg,
    today: NaiveDate,
    offset_days: i64,
    count: u32,
) -> Vec<AppealRecord> {
    (0..count)
        .map(|i| {
            let rule = *pick(rng, &RULE_CATALOG);
            let (country, continent) = *pick(rng, &COUNTRY_CATALOG);
            let operation = *pick(rng, &OPERATION_CATALOG);
            let date = today - Duration::days(offset_days + rng.gen_range(0..7));

            // Roughly 65% approved, 25% rejected, 10% still pending.
            let roll: f64 = rng.gen();
            let llm_decision = if roll < 0.65 {
                Some("approved".to_string())
            } else if roll < 0.90 {
                Some("rejected".to_string())
            } else {
                None
            };

            AppealRecord {
                termination_reason: Some("fraud".to_string()),
                shop_id: 10_000_000 + offset_days * 1_000_000 + i as i64,
                appeal_date: Some(date),
                rule_name: Some(rule.to_string()),
                operation_type: Some(operation),
                appeal_pathway_detail: Some("support_escalation".to_string()),
                days_to_appeal: if rng.gen::<f64>() < 0.9 {
                    Some(rng.gen_range(0..30))
                } else {
                    None
                },
                shop_country_code: Some(country.to_string()),
                shop_continent: Some(continent.to_string()),
                llm_decision,
                llm_assessment_date: Some(date.format("%Y-%m-%d").to_string()),
            }
        })
        .collect()
}

fn secondary_batch(
    rng: &mut Pcg64Mcg,
    today: NaiveDate,
    offset_days: i64,
    count: u32,
) -> Vec<SecondaryAppealRecord> {
    (0..count)
        .map(|i| SecondaryAppealRecord {
            ticket_id: 900_000 + offset_days * 100_000 + i as i64,
            shop_id: 20_000_000 + i as i64,
            appeal_date: Some(today - Duration::days(offset_days + rng.gen_range(0..7))),
        })
        .collect()
}

fn pick<'a, T>(rng: &mut Pcg64Mcg, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}
