//! Ingestion and alert lifecycle orchestration.
//!
//! [`MonitoringService`] ties the storage traits and the evaluator
//! together: every ingested sample is persisted first, then checked
//! against the active alerts watching its metric name, and each breach
//! is appended to the audit trail. Persistence of the sample never
//! depends on evaluation succeeding.


use chrono::{DateTime, Utc};
use std::sync::Arc;
use vigil_alert::AlertEvaluator;
use vigil_common::error::MonitorError;
use vigil_common::types::{
    Alert, AlertStatus, HistoryEntry, MetricSample, MonitoringSummary, Severity,
};
use vigil_common::Result;
use vigil_storage::{
    AlertHistoryLog, AlertRegistry, MetricQuery, MetricStore, NewAlert, NewHistoryEntry, NewMetric,
};

/// Result of one metric ingestion.
///
/// `evaluation_error` is set when the sample was durably stored but the
/// alert check against it could not complete. Callers surface it as a
/// degraded-but-accepted signal rather than a failure.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub metric: MetricSample,
    pub fired: Vec<Alert>,
    pub evaluation_error: Option<String>,
}

/// Orchestrates metric ingestion, alert lifecycle and summaries over
/// injected storage backends.
pub struct MonitoringService {
    metrics: Arc<dyn MetricStore>,
    alerts: Arc<dyn AlertRegistry>,
    history: Arc<dyn AlertHistoryLog>,
    evaluator: AlertEvaluator,
}

impl MonitoringService {
    pub fn new(
        metrics: Arc<dyn MetricStore>,
        alerts: Arc<dyn AlertRegistry>,
        history: Arc<dyn AlertHistoryLog>,
    ) -> Self {
        Self {
            metrics,
            alerts,
            history,
            evaluator: AlertEvaluator::new(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: AlertEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Persists one sample and evaluates it against the active alerts
    /// watching its exact metric name.
    ///
    /// The insert is the only fatal step. Failures while fetching
    /// alerts or appending history leave the stored sample in place and
    /// come back in [`RecordOutcome::evaluation_error`].
    ///
    /// Two callers ingesting breaching samples for the same metric may
    /// both see the alert as active and both append a fire event; the
    /// audit trail records every observation, so that is accepted
    /// behavior rather than a race to fix.
    pub fn record_metric(&self, new: &NewMetric) -> Result<RecordOutcome> {
        validate_metric(new)?;
        let metric = self.metrics.insert(new)?;

        let active = match self.alerts.active_for_metric(&metric.name) {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(metric = %metric.name, error = %e, "alert lookup failed after insert");
                return Ok(RecordOutcome {
                    metric,
                    fired: Vec::new(),
                    evaluation_error: Some(e.to_string()),
                });
            }
        };

        let breached: Vec<Alert> = self
            .evaluator
            .evaluate(metric.value, &active)
            .into_iter()
            .cloned()
            .collect();

        let mut fired = Vec::with_capacity(breached.len());
        let mut evaluation_error = None;
        for alert in breached {
            let entry = NewHistoryEntry {
                alert_id: alert.id.clone(),
                metric_value: metric.value,
                metadata: Some(serde_json::json!({ "metric_id": metric.id })),
            };
            match self.history.append(&entry) {
                Ok(_) => fired.push(alert),
                Err(e) => {
                    tracing::warn!(alert_id = %alert.id, error = %e, "history append failed");
                    evaluation_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        Ok(RecordOutcome {
            metric,
            fired,
            evaluation_error,
        })
    }

    pub fn list_metrics(&self, query: &MetricQuery) -> Result<Vec<MetricSample>> {
        self.metrics.query(query)
    }

    pub fn count_metrics(&self, query: &MetricQuery) -> Result<u64> {
        self.metrics.count(query)
    }

    pub fn create_alert(&self, new: &NewAlert) -> Result<Alert> {
        validate_alert(new)?;
        self.alerts.create(new)
    }

    pub fn get_alert(&self, alert_id: &str) -> Result<Alert> {
        self.alerts
            .get(alert_id)?
            .ok_or_else(|| MonitorError::not_found("alert", alert_id))
    }

    pub fn list_alerts(
        &self,
        status: Option<AlertStatus>,
        severity: Option<Severity>,
    ) -> Result<Vec<Alert>> {
        self.alerts.list(status, severity)
    }

    /// Partially updates an alert. The only status an update may carry
    /// is `resolved`; asking for `active` is rejected because there is
    /// no transition back from resolved and re-asserting `active` on an
    /// active alert is equally meaningless.
    pub fn update_alert(
        &self,
        alert_id: &str,
        status: Option<AlertStatus>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<Alert> {
        // Existence check first so an unknown id is 404, not 409.
        let mut alert = self.get_alert(alert_id)?;

        if let Some(status) = status {
            match status {
                AlertStatus::Resolved => {
                    alert = self
                        .alerts
                        .mark_resolved(alert_id)?
                        .ok_or_else(|| MonitorError::not_found("alert", alert_id))?;
                }
                AlertStatus::Active => {
                    return Err(MonitorError::InvalidTransition(format!(
                        "alert '{alert_id}' cannot be set to 'active'; the only legal transition is active -> resolved"
                    )));
                }
            }
        }

        if let Some(metadata) = metadata {
            alert = self
                .alerts
                .set_metadata(alert_id, metadata)?
                .ok_or_else(|| MonitorError::not_found("alert", alert_id))?;
        }

        Ok(alert)
    }

    /// Resolves an alert. Safe to call repeatedly; the first resolution
    /// stamps `resolved_at` and later calls return the same record.
    pub fn resolve_alert(&self, alert_id: &str) -> Result<Alert> {
        self.alerts
            .mark_resolved(alert_id)?
            .ok_or_else(|| MonitorError::not_found("alert", alert_id))
    }

    /// Fire events for one alert, newest first. Unknown ids are an
    /// error rather than an empty list so callers can distinguish "no
    /// fires yet" from "no such alert".
    pub fn alert_history(
        &self,
        alert_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<HistoryEntry>> {
        self.get_alert(alert_id)?;
        self.history.query(alert_id, from, to)
    }

    pub fn summary(&self) -> Result<MonitoringSummary> {
        let total_metrics = self.metrics.count_total()?;
        let metrics_by_name = self.metrics.count_by_name()?;
        let active_alerts = self.alerts.count_with_status(AlertStatus::Active)?;
        let alerts_by_severity = self.alerts.count_by_severity()?;

        let (mut critical_alerts, mut warning_alerts, mut info_alerts) = (0u64, 0u64, 0u64);
        for alert in self.alerts.list(Some(AlertStatus::Active), None)? {
            match alert.severity {
                Severity::Critical => critical_alerts += 1,
                Severity::Warning => warning_alerts += 1,
                Severity::Info => info_alerts += 1,
            }
        }

        Ok(MonitoringSummary {
            total_metrics,
            active_alerts,
            critical_alerts,
            warning_alerts,
            info_alerts,
            metrics_by_name,
            alerts_by_severity,
        })
    }
}

fn validate_metric(new: &NewMetric) -> Result<()> {
    if new.name.trim().is_empty() {
        return Err(MonitorError::Validation(
            "metric name must not be empty".to_string(),
        ));
    }
    if !new.value.is_finite() {
        return Err(MonitorError::Validation(
            "metric value must be a finite number".to_string(),
        ));
    }
    Ok(())
}

fn validate_alert(new: &NewAlert) -> Result<()> {
    if new.metric_name.trim().is_empty() {
        return Err(MonitorError::Validation(
            "alert metric_name must not be empty".to_string(),
        ));
    }
    if !new.threshold.is_finite() {
        return Err(MonitorError::Validation(
            "alert threshold must be a finite number".to_string(),
        ));
    }
    Ok(())
}
