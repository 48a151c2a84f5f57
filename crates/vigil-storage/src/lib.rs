//! Persistence layer for metric samples, alert definitions and the alert
//! fire audit trail.
//!
//! The default implementation ([`store::SqliteStore`]) keeps the three
//! logical collections (`metrics`, `alerts`, `alert_history`) in a single
//! SQLite database with WAL mode for concurrent reads. Metrics and
//! history rows are append-only; alerts support exactly one status write
//! (`active -> resolved`).

pub mod store;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use vigil_common::types::{Alert, AlertStatus, Condition, HistoryEntry, MetricSample, Severity};
use vigil_common::Result;

/// Input for one metric sample insert. `id` and `timestamp` are assigned
/// by the store.
#[derive(Debug, Clone, Default)]
pub struct NewMetric {
    pub name: String,
    pub value: f64,
    pub labels: HashMap<String, String>,
    pub metadata: Option<serde_json::Value>,
}

/// Optional filters for a metric range query. All filters combine; with
/// none set the query returns the unfiltered series bounded by `limit`.
///
/// # Examples
///
/// ```
/// use vigil_storage::MetricQuery;
///
/// let query = MetricQuery {
///     name: Some("system.cpu.percent".into()),
///     ..MetricQuery::default()
/// };
/// assert_eq!(query.limit, 20);
/// ```
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub name: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

impl MetricQuery {
    pub const DEFAULT_LIMIT: usize = 20;
}

impl Default for MetricQuery {
    fn default() -> Self {
        Self {
            name: None,
            from: None,
            to: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Input for one alert definition. Status starts as `active` with
/// `resolved_at` null.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub metric_name: String,
    pub condition: Condition,
    pub threshold: f64,
    pub severity: Severity,
    pub metadata: Option<serde_json::Value>,
}

/// Input for one fire-event audit record.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub alert_id: String,
    pub metric_value: f64,
    pub metadata: Option<serde_json::Value>,
}

/// Append-only persistence of metric samples.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because ingestion and the REST API access the store concurrently.
pub trait MetricStore: Send + Sync {
    /// Persists one sample, assigning its id and server timestamp.
    fn insert(&self, new: &NewMetric) -> Result<MetricSample>;

    /// Queries samples matching the filters, newest first. Consumers
    /// depend on newest-first ordering for latest-value semantics.
    fn query(&self, query: &MetricQuery) -> Result<Vec<MetricSample>>;

    /// Returns the total count matching the filters (ignores paging).
    fn count(&self, query: &MetricQuery) -> Result<u64>;

    /// Returns the total number of persisted samples.
    fn count_total(&self) -> Result<u64>;

    /// Returns sample counts grouped by metric name.
    fn count_by_name(&self) -> Result<HashMap<String, u64>>;
}

/// Persistence and lifecycle management of alert definitions.
pub trait AlertRegistry: Send + Sync {
    /// Creates an alert in `active` state.
    fn create(&self, new: &NewAlert) -> Result<Alert>;

    /// Fetches one alert by id.
    fn get(&self, id: &str) -> Result<Option<Alert>>;

    /// Marks an alert resolved, stamping `resolved_at` with the current
    /// time. Resolving an already-resolved alert leaves the row
    /// untouched (stable `resolved_at`). Returns `None` if the id does
    /// not exist.
    fn mark_resolved(&self, id: &str) -> Result<Option<Alert>>;

    /// Replaces an alert's metadata. Returns `None` if the id does not
    /// exist.
    fn set_metadata(&self, id: &str, metadata: &serde_json::Value) -> Result<Option<Alert>>;

    /// Lists alerts with optional status/severity filters, ordered by
    /// `created_at` descending.
    fn list(&self, status: Option<AlertStatus>, severity: Option<Severity>) -> Result<Vec<Alert>>;

    /// Returns the `active` alerts watching `metric_name` (exact match,
    /// no wildcards). This is the filter evaluation runs against.
    fn active_for_metric(&self, metric_name: &str) -> Result<Vec<Alert>>;

    /// Counts alerts currently in the given status.
    fn count_with_status(&self, status: AlertStatus) -> Result<u64>;

    /// Returns alert counts grouped by severity (all statuses).
    fn count_by_severity(&self) -> Result<HashMap<String, u64>>;
}

/// Append-only audit trail of alert fire events.
pub trait AlertHistoryLog: Send + Sync {
    /// Appends one fire event. No update/delete operations exist.
    fn append(&self, new: &NewHistoryEntry) -> Result<HistoryEntry>;

    /// Queries fire events for one alert within an optional time range,
    /// newest first.
    fn query(
        &self,
        alert_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryEntry>>;
}
