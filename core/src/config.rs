//! Runtime configuration, loadable from a JSON file with full defaults.

use crate::daily_trends::TrendThresholds;
use crate::error::ReportResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Length of the comparison window in days. The previous period is the
    /// window of the same length immediately before it.
    pub period_days: u32,
    /// How many historical snapshots to read back for trend context.
    pub history_limit: usize,
    /// Seed for the substitute dataset used when the warehouse is
    /// unreachable.
    pub sample_seed: u64,
    pub dashboard_url: String,
    pub trends: TrendThresholds,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            period_days: 7,
            history_limit: 8,
            sample_seed: 42,
            dashboard_url: "https://fraud-appeals.example.com/dashboard".to_string(),
            trends: TrendThresholds::default(),
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> ReportResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
