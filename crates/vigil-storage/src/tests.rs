use crate::store::SqliteStore;
use crate::{AlertHistoryLog, AlertRegistry, MetricQuery, MetricStore, NewAlert, NewHistoryEntry, NewMetric};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use vigil_common::error::MonitorError;
use vigil_common::types::{AlertStatus, Condition, Severity};

fn test_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

fn sample(name: &str, value: f64) -> NewMetric {
    NewMetric {
        name: name.to_string(),
        value,
        labels: HashMap::new(),
        metadata: None,
    }
}

fn cpu_alert(threshold: f64) -> NewAlert {
    NewAlert {
        metric_name: "system.cpu.percent".to_string(),
        condition: Condition::Gt,
        threshold,
        severity: Severity::Warning,
        metadata: None,
    }
}

#[test]
fn test_insert_assigns_id_and_timestamp() {
    let store = test_store();
    let before = Utc::now();
    let m = store.insert(&sample("system.cpu.percent", 42.5)).unwrap();
    assert!(!m.id.is_empty());
    assert_eq!(m.name, "system.cpu.percent");
    assert_eq!(m.value, 42.5);
    assert!(m.timestamp >= before - Duration::seconds(1));
}

#[test]
fn test_query_returns_newest_first() {
    let store = test_store();
    store.insert(&sample("system.cpu.percent", 1.0)).unwrap();
    store.insert(&sample("system.cpu.percent", 2.0)).unwrap();
    store.insert(&sample("system.cpu.percent", 3.0)).unwrap();

    let results = MetricStore::query(&store, &MetricQuery::default()).unwrap();
    let values: Vec<f64> = results.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![3.0, 2.0, 1.0]);
}

#[test]
fn test_query_filters_by_exact_name() {
    let store = test_store();
    store.insert(&sample("system.cpu.percent", 10.0)).unwrap();
    store.insert(&sample("system.cpu", 20.0)).unwrap();
    store.insert(&sample("system.memory.percent", 30.0)).unwrap();

    let query = MetricQuery {
        name: Some("system.cpu.percent".to_string()),
        ..MetricQuery::default()
    };
    let results = MetricStore::query(&store, &query).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value, 10.0);
}

#[test]
fn test_query_time_range() {
    let store = test_store();
    store.insert(&sample("system.cpu.percent", 1.0)).unwrap();

    let future = MetricQuery {
        from: Some(Utc::now() + Duration::hours(1)),
        ..MetricQuery::default()
    };
    assert!(MetricStore::query(&store, &future).unwrap().is_empty());

    let past_hour = MetricQuery {
        from: Some(Utc::now() - Duration::hours(1)),
        to: Some(Utc::now() + Duration::hours(1)),
        ..MetricQuery::default()
    };
    assert_eq!(MetricStore::query(&store, &past_hour).unwrap().len(), 1);
}

#[test]
fn test_query_pagination() {
    let store = test_store();
    for i in 0..5 {
        store.insert(&sample("system.cpu.percent", i as f64)).unwrap();
    }

    let page = MetricQuery {
        limit: 2,
        offset: 2,
        ..MetricQuery::default()
    };
    let results = MetricStore::query(&store, &page).unwrap();
    let values: Vec<f64> = results.iter().map(|m| m.value).collect();
    assert_eq!(values, vec![2.0, 1.0]);

    assert_eq!(store.count(&page).unwrap(), 5);
}

#[test]
fn test_labels_and_metadata_round_trip() {
    let store = test_store();
    let mut labels = HashMap::new();
    labels.insert("mount".to_string(), "/".to_string());
    let new = NewMetric {
        name: "system.disk.percent".to_string(),
        value: 63.0,
        labels,
        metadata: Some(serde_json::json!({"source": "collector"})),
    };
    store.insert(&new).unwrap();

    let results = MetricStore::query(&store, &MetricQuery::default()).unwrap();
    assert_eq!(results[0].labels.get("mount"), Some(&"/".to_string()));
    assert_eq!(
        results[0].metadata,
        Some(serde_json::json!({"source": "collector"}))
    );
}

#[test]
fn test_count_by_name() {
    let store = test_store();
    store.insert(&sample("system.cpu.percent", 1.0)).unwrap();
    store.insert(&sample("system.cpu.percent", 2.0)).unwrap();
    store.insert(&sample("system.memory.percent", 3.0)).unwrap();

    assert_eq!(store.count_total().unwrap(), 3);
    let by_name = store.count_by_name().unwrap();
    assert_eq!(by_name.get("system.cpu.percent"), Some(&2));
    assert_eq!(by_name.get("system.memory.percent"), Some(&1));
}

#[test]
fn test_create_alert_starts_active() {
    let store = test_store();
    let alert = store.create(&cpu_alert(90.0)).unwrap();
    assert_eq!(alert.status, AlertStatus::Active);
    assert!(alert.resolved_at.is_none());

    let fetched = store.get(&alert.id).unwrap().unwrap();
    assert_eq!(fetched.id, alert.id);
    assert_eq!(fetched.threshold, 90.0);
    assert_eq!(fetched.condition, Condition::Gt);
}

#[test]
fn test_get_missing_alert_returns_none() {
    let store = test_store();
    assert!(store.get("no-such-id").unwrap().is_none());
}

#[test]
fn test_mark_resolved_is_idempotent() {
    let store = test_store();
    let alert = store.create(&cpu_alert(90.0)).unwrap();

    let first = store.mark_resolved(&alert.id).unwrap().unwrap();
    assert_eq!(first.status, AlertStatus::Resolved);
    let stamp = first.resolved_at.unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = store.mark_resolved(&alert.id).unwrap().unwrap();
    assert_eq!(second.status, AlertStatus::Resolved);
    assert_eq!(second.resolved_at.unwrap(), stamp, "resolved_at must not move");

    assert!(store.mark_resolved("no-such-id").unwrap().is_none());
}

#[test]
fn test_active_for_metric_excludes_resolved_and_other_names() {
    let store = test_store();
    let watching = store.create(&cpu_alert(90.0)).unwrap();
    let resolved = store.create(&cpu_alert(50.0)).unwrap();
    store.mark_resolved(&resolved.id).unwrap();
    store
        .create(&NewAlert {
            metric_name: "system.memory.percent".to_string(),
            condition: Condition::Gt,
            threshold: 80.0,
            severity: Severity::Critical,
            metadata: None,
        })
        .unwrap();

    let active = store.active_for_metric("system.cpu.percent").unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, watching.id);
}

#[test]
fn test_list_alerts_with_filters() {
    let store = test_store();
    store.create(&cpu_alert(90.0)).unwrap();
    let resolved = store.create(&cpu_alert(50.0)).unwrap();
    store.mark_resolved(&resolved.id).unwrap();

    assert_eq!(store.list(None, None).unwrap().len(), 2);
    assert_eq!(store.list(Some(AlertStatus::Active), None).unwrap().len(), 1);
    assert_eq!(
        store.list(None, Some(Severity::Warning)).unwrap().len(),
        2
    );
    assert!(store.list(None, Some(Severity::Critical)).unwrap().is_empty());
}

#[test]
fn test_alert_counters() {
    let store = test_store();
    store.create(&cpu_alert(90.0)).unwrap();
    let resolved = store.create(&cpu_alert(50.0)).unwrap();
    store.mark_resolved(&resolved.id).unwrap();

    assert_eq!(store.count_with_status(AlertStatus::Active).unwrap(), 1);
    assert_eq!(store.count_with_status(AlertStatus::Resolved).unwrap(), 1);
    let by_severity = store.count_by_severity().unwrap();
    assert_eq!(by_severity.get("warning"), Some(&2));
}

#[test]
fn test_set_metadata_replaces_whole_document() {
    let store = test_store();
    let alert = store.create(&cpu_alert(90.0)).unwrap();

    let updated = store
        .set_metadata(&alert.id, &serde_json::json!({"owner": "ops"}))
        .unwrap()
        .unwrap();
    assert_eq!(updated.metadata, Some(serde_json::json!({"owner": "ops"})));

    assert!(store
        .set_metadata("no-such-id", &serde_json::json!({}))
        .unwrap()
        .is_none());
}

#[test]
fn test_history_append_and_query_newest_first() {
    let store = test_store();
    let alert = store.create(&cpu_alert(90.0)).unwrap();

    for v in [91.0, 92.0, 93.0] {
        store
            .append(&NewHistoryEntry {
                alert_id: alert.id.clone(),
                metric_value: v,
                metadata: None,
            })
            .unwrap();
    }

    let entries = AlertHistoryLog::query(&store, &alert.id, None, None).unwrap();
    let values: Vec<f64> = entries.iter().map(|e| e.metric_value).collect();
    assert_eq!(values, vec![93.0, 92.0, 91.0]);

    let future = AlertHistoryLog::query(&store, &alert.id, Some(Utc::now() + Duration::hours(1)), None).unwrap();
    assert!(future.is_empty());
}

#[test]
fn test_history_survives_resolution() {
    let store = test_store();
    let alert = store.create(&cpu_alert(90.0)).unwrap();
    store
        .append(&NewHistoryEntry {
            alert_id: alert.id.clone(),
            metric_value: 95.0,
            metadata: Some(serde_json::json!({"metric_id": "m-1"})),
        })
        .unwrap();
    store.mark_resolved(&alert.id).unwrap();

    let entries = AlertHistoryLog::query(&store, &alert.id, None, None).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].metadata,
        Some(serde_json::json!({"metric_id": "m-1"}))
    );
}

#[test]
fn test_open_creates_parent_dirs() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("vigil.db");
    let store = SqliteStore::open(&path).unwrap();
    store.insert(&sample("system.cpu.percent", 1.0)).unwrap();
    assert!(path.exists());
}

#[test]
fn test_corrupt_alert_enum_columns_error() {
    let store = test_store();
    let alert = store.create(&cpu_alert(90.0)).unwrap();

    store
        .lock_conn()
        .execute(
            "UPDATE alerts SET severity = 'fatal' WHERE id = ?1",
            rusqlite::params![alert.id],
        )
        .unwrap();
    assert!(matches!(
        store.get(&alert.id),
        Err(MonitorError::Storage(_))
    ));

    store
        .lock_conn()
        .execute(
            "UPDATE alerts SET severity = 'warning', status = 'pending' WHERE id = ?1",
            rusqlite::params![alert.id],
        )
        .unwrap();
    assert!(matches!(
        store.get(&alert.id),
        Err(MonitorError::Storage(_))
    ));
}
