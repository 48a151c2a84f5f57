use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use vigil_common::error::MonitorError;
use vigil_common::types::{Alert, AlertStatus, HistoryEntry, MetricSample, Severity};
use vigil_common::{id, Result};

use crate::{
    AlertHistoryLog, AlertRegistry, MetricQuery, MetricStore, NewAlert, NewHistoryEntry, NewMetric,
};

const METRICS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metrics (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    value REAL NOT NULL,
    timestamp INTEGER NOT NULL,
    labels TEXT NOT NULL DEFAULT '{}',
    metadata TEXT
);
CREATE INDEX IF NOT EXISTS idx_metrics_name_time
    ON metrics(name, timestamp);
CREATE INDEX IF NOT EXISTS idx_metrics_time
    ON metrics(timestamp);
";

const ALERTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    metric_name TEXT NOT NULL,
    condition TEXT NOT NULL,
    threshold REAL NOT NULL,
    severity TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at INTEGER NOT NULL,
    resolved_at INTEGER,
    metadata TEXT
);
CREATE INDEX IF NOT EXISTS idx_alerts_metric_status
    ON alerts(metric_name, status);
CREATE INDEX IF NOT EXISTS idx_alerts_created
    ON alerts(created_at);
";

const HISTORY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alert_history (
    id TEXT PRIMARY KEY,
    alert_id TEXT NOT NULL REFERENCES alerts(id) ON DELETE CASCADE,
    metric_value REAL NOT NULL,
    timestamp INTEGER NOT NULL,
    metadata TEXT
);
CREATE INDEX IF NOT EXISTS idx_history_alert_time
    ON alert_history(alert_id, timestamp);
";

/// SQLite-backed implementation of all three storage traits.
///
/// One connection guarded by a mutex; every public method takes the lock
/// exactly once. WAL mode keeps readers unblocked during writes.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(MonitorError::storage)?;
        }
        let conn = Connection::open(path).map_err(MonitorError::storage)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(MonitorError::storage)?;
        tracing::info!(path = %path.display(), "opened monitoring database");
        Self::with_conn(conn)
    }

    /// In-memory database, used by tests and ephemeral setups.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(MonitorError::storage)?;
        Self::with_conn(conn)
    }

    fn with_conn(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(MonitorError::storage)?;
        conn.execute_batch(METRICS_SCHEMA)
            .map_err(MonitorError::storage)?;
        conn.execute_batch(ALERTS_SCHEMA)
            .map_err(MonitorError::storage)?;
        conn.execute_batch(HISTORY_SCHEMA)
            .map_err(MonitorError::storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    pub(crate) fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn metadata_to_sql(metadata: &Option<serde_json::Value>) -> Result<Option<String>> {
    metadata
        .as_ref()
        .map(|m| serde_json::to_string(m).map_err(MonitorError::storage))
        .transpose()
}

fn metadata_from_sql(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

fn timestamp_from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Builds the WHERE clause and parameter list shared by metric query
/// and count.
fn metric_filters(query: &MetricQuery) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(name) = &query.name {
        params.push(Box::new(name.clone()));
        sql.push_str(&format!(" AND name = ?{}", params.len()));
    }
    if let Some(from) = query.from {
        params.push(Box::new(from.timestamp_millis()));
        sql.push_str(&format!(" AND timestamp >= ?{}", params.len()));
    }
    if let Some(to) = query.to {
        params.push(Box::new(to.timestamp_millis()));
        sql.push_str(&format!(" AND timestamp <= ?{}", params.len()));
    }
    (sql, params)
}

fn row_to_metric(row: &rusqlite::Row<'_>) -> rusqlite::Result<MetricSample> {
    let ts_ms: i64 = row.get(3)?;
    let labels_str: String = row.get(4)?;
    let metadata_str: Option<String> = row.get(5)?;
    let labels: HashMap<String, String> = serde_json::from_str(&labels_str).unwrap_or_default();
    Ok(MetricSample {
        id: row.get(0)?,
        name: row.get(1)?,
        value: row.get(2)?,
        timestamp: timestamp_from_ms(ts_ms),
        labels,
        metadata: metadata_from_sql(metadata_str),
    })
}

/// Parses an enum column, surfacing a corrupt value as a column error
/// instead of silently coercing it to a default.
fn parse_enum_column<T>(raw: String, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e: String| rusqlite::Error::InvalidColumnType(idx, e, rusqlite::types::Type::Text))
}

fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    let condition_str: String = row.get(2)?;
    let severity_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_ms: i64 = row.get(6)?;
    let resolved_ms: Option<i64> = row.get(7)?;
    let metadata_str: Option<String> = row.get(8)?;
    Ok(Alert {
        id: row.get(0)?,
        metric_name: row.get(1)?,
        condition: parse_enum_column(condition_str, 2)?,
        threshold: row.get(3)?,
        severity: parse_enum_column(severity_str, 4)?,
        status: parse_enum_column(status_str, 5)?,
        created_at: timestamp_from_ms(created_ms),
        resolved_at: resolved_ms.and_then(DateTime::from_timestamp_millis),
        metadata: metadata_from_sql(metadata_str),
    })
}

fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let ts_ms: i64 = row.get(3)?;
    let metadata_str: Option<String> = row.get(4)?;
    Ok(HistoryEntry {
        id: row.get(0)?,
        alert_id: row.get(1)?,
        metric_value: row.get(2)?,
        timestamp: timestamp_from_ms(ts_ms),
        metadata: metadata_from_sql(metadata_str),
    })
}

fn get_alert_with(conn: &Connection, alert_id: &str) -> Result<Option<Alert>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, metric_name, condition, threshold, severity, status, created_at, resolved_at, metadata
             FROM alerts WHERE id = ?1",
        )
        .map_err(MonitorError::storage)?;
    let mut rows = stmt
        .query_map(rusqlite::params![alert_id], row_to_alert)
        .map_err(MonitorError::storage)?;
    match rows.next() {
        Some(row) => Ok(Some(row.map_err(MonitorError::storage)?)),
        None => Ok(None),
    }
}

impl MetricStore for SqliteStore {
    fn insert(&self, new: &NewMetric) -> Result<MetricSample> {
        let conn = self.lock_conn();
        let sample = MetricSample {
            id: id::next_id(),
            name: new.name.clone(),
            value: new.value,
            timestamp: Utc::now(),
            labels: new.labels.clone(),
            metadata: new.metadata.clone(),
        };
        let labels_json = serde_json::to_string(&sample.labels).map_err(MonitorError::storage)?;
        conn.execute(
            "INSERT INTO metrics (id, name, value, timestamp, labels, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                &sample.id,
                &sample.name,
                sample.value,
                sample.timestamp.timestamp_millis(),
                labels_json,
                metadata_to_sql(&sample.metadata)?,
            ],
        )
        .map_err(MonitorError::storage)?;
        Ok(sample)
    }

    fn query(&self, query: &MetricQuery) -> Result<Vec<MetricSample>> {
        let conn = self.lock_conn();
        let (filters, params) = metric_filters(query);
        // Snowflake ids are monotonic, so id breaks ties for samples
        // landing in the same millisecond.
        let sql = format!(
            "SELECT id, name, value, timestamp, labels, metadata FROM metrics{filters}
             ORDER BY timestamp DESC, id DESC LIMIT {} OFFSET {}",
            query.limit, query.offset
        );
        let mut stmt = conn.prepare(&sql).map_err(MonitorError::storage)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_metric)
            .map_err(MonitorError::storage)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(MonitorError::storage)?);
        }
        Ok(results)
    }

    fn count(&self, query: &MetricQuery) -> Result<u64> {
        let conn = self.lock_conn();
        let (filters, params) = metric_filters(query);
        let sql = format!("SELECT COUNT(*) FROM metrics{filters}");
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(MonitorError::storage)?;
        Ok(count as u64)
    }

    fn count_total(&self) -> Result<u64> {
        let conn = self.lock_conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM metrics", [], |row| row.get(0))
            .map_err(MonitorError::storage)?;
        Ok(count as u64)
    }

    fn count_by_name(&self) -> Result<HashMap<String, u64>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare_cached("SELECT name, COUNT(*) FROM metrics GROUP BY name")
            .map_err(MonitorError::storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(MonitorError::storage)?;
        let mut counts = HashMap::new();
        for row in rows {
            let (name, count) = row.map_err(MonitorError::storage)?;
            counts.insert(name, count as u64);
        }
        Ok(counts)
    }
}

impl AlertRegistry for SqliteStore {
    fn create(&self, new: &NewAlert) -> Result<Alert> {
        let conn = self.lock_conn();
        let alert = Alert {
            id: id::next_id(),
            metric_name: new.metric_name.clone(),
            condition: new.condition,
            threshold: new.threshold,
            severity: new.severity,
            status: AlertStatus::Active,
            created_at: Utc::now(),
            resolved_at: None,
            metadata: new.metadata.clone(),
        };
        conn.execute(
            "INSERT INTO alerts (id, metric_name, condition, threshold, severity, status, created_at, resolved_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                &alert.id,
                &alert.metric_name,
                alert.condition.to_string(),
                alert.threshold,
                alert.severity.to_string(),
                alert.status.to_string(),
                alert.created_at.timestamp_millis(),
                Option::<i64>::None,
                metadata_to_sql(&alert.metadata)?,
            ],
        )
        .map_err(MonitorError::storage)?;
        Ok(alert)
    }

    fn get(&self, alert_id: &str) -> Result<Option<Alert>> {
        let conn = self.lock_conn();
        get_alert_with(&conn, alert_id)
    }

    fn mark_resolved(&self, alert_id: &str) -> Result<Option<Alert>> {
        let conn = self.lock_conn();
        // Guarded update: a second resolve matches zero rows, so the
        // original resolved_at stamp survives.
        conn.execute(
            "UPDATE alerts SET status = ?1, resolved_at = ?2 WHERE id = ?3 AND status = ?4",
            rusqlite::params![
                AlertStatus::Resolved.to_string(),
                Utc::now().timestamp_millis(),
                alert_id,
                AlertStatus::Active.to_string(),
            ],
        )
        .map_err(MonitorError::storage)?;
        get_alert_with(&conn, alert_id)
    }

    fn set_metadata(&self, alert_id: &str, metadata: &serde_json::Value) -> Result<Option<Alert>> {
        let conn = self.lock_conn();
        let json = serde_json::to_string(metadata).map_err(MonitorError::storage)?;
        let updated = conn
            .execute(
                "UPDATE alerts SET metadata = ?1 WHERE id = ?2",
                rusqlite::params![json, alert_id],
            )
            .map_err(MonitorError::storage)?;
        if updated == 0 {
            return Ok(None);
        }
        get_alert_with(&conn, alert_id)
    }

    fn list(&self, status: Option<AlertStatus>, severity: Option<Severity>) -> Result<Vec<Alert>> {
        let conn = self.lock_conn();
        let mut sql = String::from(
            "SELECT id, metric_name, condition, threshold, severity, status, created_at, resolved_at, metadata
             FROM alerts WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(status) = status {
            params.push(Box::new(status.to_string()));
            sql.push_str(&format!(" AND status = ?{}", params.len()));
        }
        if let Some(severity) = severity {
            params.push(Box::new(severity.to_string()));
            sql.push_str(&format!(" AND severity = ?{}", params.len()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = conn.prepare(&sql).map_err(MonitorError::storage)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_alert)
            .map_err(MonitorError::storage)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(MonitorError::storage)?);
        }
        Ok(results)
    }

    fn active_for_metric(&self, metric_name: &str) -> Result<Vec<Alert>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, metric_name, condition, threshold, severity, status, created_at, resolved_at, metadata
                 FROM alerts WHERE metric_name = ?1 AND status = ?2 ORDER BY created_at DESC, id DESC",
            )
            .map_err(MonitorError::storage)?;
        let rows = stmt
            .query_map(
                rusqlite::params![metric_name, AlertStatus::Active.to_string()],
                row_to_alert,
            )
            .map_err(MonitorError::storage)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(MonitorError::storage)?);
        }
        Ok(results)
    }

    fn count_with_status(&self, status: AlertStatus) -> Result<u64> {
        let conn = self.lock_conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM alerts WHERE status = ?1",
                rusqlite::params![status.to_string()],
                |row| row.get(0),
            )
            .map_err(MonitorError::storage)?;
        Ok(count as u64)
    }

    fn count_by_severity(&self) -> Result<HashMap<String, u64>> {
        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare_cached("SELECT severity, COUNT(*) FROM alerts GROUP BY severity")
            .map_err(MonitorError::storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(MonitorError::storage)?;
        let mut counts = HashMap::new();
        for row in rows {
            let (severity, count) = row.map_err(MonitorError::storage)?;
            counts.insert(severity, count as u64);
        }
        Ok(counts)
    }
}

impl AlertHistoryLog for SqliteStore {
    fn append(&self, new: &NewHistoryEntry) -> Result<HistoryEntry> {
        let conn = self.lock_conn();
        let entry = HistoryEntry {
            id: id::next_id(),
            alert_id: new.alert_id.clone(),
            metric_value: new.metric_value,
            timestamp: Utc::now(),
            metadata: new.metadata.clone(),
        };
        conn.execute(
            "INSERT INTO alert_history (id, alert_id, metric_value, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                &entry.id,
                &entry.alert_id,
                entry.metric_value,
                entry.timestamp.timestamp_millis(),
                metadata_to_sql(&entry.metadata)?,
            ],
        )
        .map_err(MonitorError::storage)?;
        Ok(entry)
    }

    fn query(
        &self,
        alert_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryEntry>> {
        let conn = self.lock_conn();
        let mut sql = String::from(
            "SELECT id, alert_id, metric_value, timestamp, metadata
             FROM alert_history WHERE alert_id = ?1",
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(alert_id.to_string())];
        if let Some(from) = from {
            params.push(Box::new(from.timestamp_millis()));
            sql.push_str(&format!(" AND timestamp >= ?{}", params.len()));
        }
        if let Some(to) = to {
            params.push(Box::new(to.timestamp_millis()));
            sql.push_str(&format!(" AND timestamp <= ?{}", params.len()));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC");

        let mut stmt = conn.prepare(&sql).map_err(MonitorError::storage)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_history)
            .map_err(MonitorError::storage)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(MonitorError::storage)?);
        }
        Ok(results)
    }
}
