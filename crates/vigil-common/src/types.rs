use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One immutable data point in a metric time series.
///
/// Samples are write-once: the server assigns `id` and `timestamp` on
/// insert and nothing updates or deletes them afterwards. A metric `name`
/// is not unique — every sample sharing a name belongs to the same series.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricSample {
    pub id: String,
    pub name: String,
    pub value: f64,
    /// Server-assigned creation time (millisecond precision).
    pub timestamp: DateTime<Utc>,
    /// Grouping/filtering dimensions (e.g. mount=/data); may be empty.
    pub labels: HashMap<String, String>,
    /// Opaque caller-supplied JSON.
    pub metadata: Option<serde_json::Value>,
}

/// Comparison operator of a threshold watch.
///
/// # Examples
///
/// ```
/// use vigil_common::types::Condition;
///
/// let cond: Condition = "gt".parse().unwrap();
/// assert_eq!(cond, Condition::Gt);
/// assert_eq!(cond.to_string(), "gt");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Gt,
    Lt,
    Eq,
    Neq,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Gt => write!(f, "gt"),
            Condition::Lt => write!(f, "lt"),
            Condition::Eq => write!(f, "eq"),
            Condition::Neq => write!(f, "neq"),
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gt" => Ok(Condition::Gt),
            "lt" => Ok(Condition::Lt),
            "eq" => Ok(Condition::Eq),
            "neq" => Ok(Condition::Neq),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use vigil_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Lifecycle state of an alert. The only legal transition is
/// `Active -> Resolved`; a resolved alert is permanently excluded from
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AlertStatus::Active),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

/// A standing threshold watch over one metric name.
///
/// Alerts are bound to a series by exact name match, not by reference:
/// an alert may be created before any sample with that name exists.
/// Invariant: `resolved_at` is non-null iff `status == Resolved`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Alert {
    pub id: String,
    pub metric_name: String,
    pub condition: Condition,
    pub threshold: f64,
    pub severity: Severity,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

/// Immutable audit record of one fire event: a sample whose value
/// satisfied the owning alert's condition.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HistoryEntry {
    pub id: String,
    pub alert_id: String,
    /// The sample value that caused the fire.
    pub metric_value: f64,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

/// Dashboard rollup computed over the current persisted state.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MonitoringSummary {
    pub total_metrics: u64,
    pub active_alerts: u64,
    pub critical_alerts: u64,
    pub warning_alerts: u64,
    pub info_alerts: u64,
    pub metrics_by_name: HashMap<String, u64>,
    pub alerts_by_severity: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_round_trips_through_str() {
        for s in ["gt", "lt", "eq", "neq"] {
            let cond: Condition = s.parse().unwrap();
            assert_eq!(cond.to_string(), s);
        }
        assert!("gte".parse::<Condition>().is_err());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert!("open".parse::<AlertStatus>().is_err());
        assert_eq!("RESOLVED".parse::<AlertStatus>().unwrap(), AlertStatus::Resolved);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Condition::Neq).unwrap(), "\"neq\"");
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&AlertStatus::Active).unwrap(), "\"active\"");
    }
}
