/// Errors surfaced by the monitoring engine.
///
/// Validation failures are raised before any persistence happens;
/// `Storage` wraps an underlying database failure. A storage failure
/// during alert evaluation is *not* reported through this type — the
/// ingestion path keeps the committed metric and reports degradation
/// separately (see `vigil-monitor`).
///
/// # Examples
///
/// ```
/// use vigil_common::MonitorError;
///
/// let err = MonitorError::not_found("alert", "42");
/// assert!(err.to_string().contains("42"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Malformed enum value or missing required field; rejected before
    /// any persistence.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// An alert status write other than `active -> resolved`.
    #[error("invalid alert transition: {0}")]
    InvalidTransition(String),

    /// The underlying persistence layer failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl MonitorError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        MonitorError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        MonitorError::Storage(err.to_string())
    }
}

/// Convenience `Result` alias for monitoring operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
