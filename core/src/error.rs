use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Access denied by data source: {0}")]
    AccessDenied(String),

    #[error("Warehouse query failed: {0}")]
    Query(String),

    #[error("Record parse failure: {0}")]
    Parse(String),

    #[error("History store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Message delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReportError {
    /// Failures that abort a warehouse fetch and switch the run to the
    /// substitute sample dataset.
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, ReportError::AccessDenied(_) | ReportError::Query(_))
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
