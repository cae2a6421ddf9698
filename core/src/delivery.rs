//! Outbound chat-message boundary.
//!
//! Report text uses Slack-flavored markup (`*bold*`, `_italic_`,
//! `<url|label>` links, `•` bullets); sinks must pass it through
//! untouched.

use crate::error::ReportResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Error => "error",
        }
    }
}

pub trait MessageSink {
    fn send_message(&self, destination: &str, text: &str) -> ReportResult<()>;

    /// Best-effort operational alert, used when a scheduled run fails.
    fn send_alert(&self, destination: &str, text: &str, severity: AlertSeverity)
        -> ReportResult<()>;
}
