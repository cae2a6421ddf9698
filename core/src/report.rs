//! Slack-markup report composition.
//!
//! Pure text construction with a fixed section order: title + date
//! header, key metrics, daily trends (when the detector found any),
//! high-appeal-rate rules, footer. The report type changes only the
//! title, never the numbers.

use crate::breakdown::rules_needing_attention;
use crate::period::{ChangeDirection, PercentChange};
use crate::pipeline::AnalysisRun;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const RULE_NAME_MAX: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Weekly,
    Trends,
    Full,
}

impl ReportType {
    pub fn title(&self) -> &'static str {
        match self {
            ReportType::Weekly => "Weekly Appeals Report",
            ReportType::Trends => "Appeal Trends Analysis",
            ReportType::Full => "Comprehensive Appeals Report",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Weekly => "weekly",
            ReportType::Trends => "trends",
            ReportType::Full => "full",
        }
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(ReportType::Weekly),
            "trends" => Ok(ReportType::Trends),
            "full" => Ok(ReportType::Full),
            other => Err(format!("unknown report type '{other}'")),
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compose the full report text for one analysis run.
pub fn compose_report(
    run: &AnalysisRun,
    report_type: ReportType,
    generated_on: NaiveDate,
    user_name: &str,
    dashboard_url: &str,
) -> String {
    let mut report = format!(
        "*{}* | {}\n\n*📊 Key Metrics (vs previous week):*\n",
        report_type.title(),
        generated_on.format("%Y-%m-%d"),
    );

    report.push_str(&format!(
        "• Termination Appeals: *{}* {} {}\n",
        run.current.total_appeals,
        volume_glyph(run.volume_change),
        run.volume_change,
    ));
    report.push_str(&format!(
        "   └ LLM Accepted: *{}* {} {}\n",
        run.current.accepted_appeals,
        acceptance_glyph(run.acceptance_change),
        run.acceptance_change,
    ));
    report.push_str(&format!(
        "• SP Rejection Appeals: *{}* {} {}\n",
        run.secondary_appeals,
        volume_glyph(run.secondary_change),
        run.secondary_change,
    ));

    if !run.daily_trends.is_empty() {
        report.push_str("\n*📅 Daily Trends:*\n");
        for line in &run.daily_trends {
            report.push_str(line);
            report.push('\n');
        }
    }

    let attention = rules_needing_attention(&run.appeal_rates);
    if !attention.is_empty() {
        report.push_str("\n*Rules with high appeal rates that need attention:*\n");
        for (rule, rate) in &attention {
            report.push_str(&format!(
                "• {}: *{:.1}%*\n",
                truncate_rule_name(rule),
                rate.appeal_rate,
            ));
        }
    }

    report.push_str(&format!(
        "\n---\n<{dashboard_url}|View Appeal Trends Dashboard>\n\
         _Generated by Appeal Trends Analyzer | {user_name}_",
    ));

    report
}

fn volume_glyph(change: PercentChange) -> &'static str {
    match change.direction() {
        ChangeDirection::Up => "📈",
        ChangeDirection::Down => "📉",
        ChangeDirection::Level => "➡️",
    }
}

fn acceptance_glyph(change: PercentChange) -> &'static str {
    match change.direction() {
        ChangeDirection::Up => "✅",
        ChangeDirection::Down => "❌",
        ChangeDirection::Level => "➡️",
    }
}

/// Long warehouse rule names blow up the message layout; clip them.
fn truncate_rule_name(rule: &str) -> String {
    if rule.chars().count() <= RULE_NAME_MAX {
        rule.to_string()
    } else {
        let clipped: String = rule.chars().take(RULE_NAME_MAX).collect();
        format!("{clipped}...")
    }
}
