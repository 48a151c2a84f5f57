use crate::Collector;
use std::time::Instant;
use vigil_monitor::MonitoringService;
use vigil_storage::NewMetric;

/// Runs every collector once and ingests the readings through the
/// service, so collected metrics are evaluated against alerts exactly
/// like metrics posted over the API.
///
/// Collector failures are recorded as `metrics.collection.error`
/// samples and do not abort the sweep. The sweep itself is timed and
/// reported as `metrics.collection.duration` (milliseconds). Returns
/// the number of samples successfully ingested.
pub fn run_sweep(service: &MonitoringService, collectors: &mut [Box<dyn Collector>]) -> usize {
    let started = Instant::now();
    let mut ingested = 0usize;

    for collector in collectors.iter_mut() {
        let readings = match collector.collect() {
            Ok(readings) => readings,
            Err(e) => {
                tracing::error!(collector = collector.name(), error = %e, "collector failed");
                let error_sample = NewMetric {
                    name: "metrics.collection.error".to_string(),
                    value: 1.0,
                    labels: [("collector".to_string(), collector.name().to_string())]
                        .into_iter()
                        .collect(),
                    metadata: None,
                };
                if let Err(e) = service.record_metric(&error_sample) {
                    tracing::warn!(error = %e, "failed to record collection error");
                }
                continue;
            }
        };

        for reading in readings {
            let new = NewMetric {
                name: reading.name,
                value: reading.value,
                labels: reading.labels,
                metadata: None,
            };
            match service.record_metric(&new) {
                Ok(outcome) => {
                    ingested += 1;
                    if !outcome.fired.is_empty() {
                        tracing::info!(
                            metric = %outcome.metric.name,
                            value = outcome.metric.value,
                            fired = outcome.fired.len(),
                            "collected sample breached alerts"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(collector = collector.name(), error = %e, "failed to record sample");
                }
            }
        }
    }

    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    let duration_sample = NewMetric {
        name: "metrics.collection.duration".to_string(),
        value: duration_ms,
        labels: Default::default(),
        metadata: None,
    };
    if let Err(e) = service.record_metric(&duration_sample) {
        tracing::warn!(error = %e, "failed to record collection duration");
    }

    ingested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reading;
    use std::sync::Arc;
    use vigil_storage::store::SqliteStore;
    use vigil_storage::{MetricQuery, MetricStore};

    struct FixedCollector;

    impl Collector for FixedCollector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn collect(&mut self) -> anyhow::Result<Vec<Reading>> {
            Ok(vec![Reading::new("system.cpu.percent", 12.5)])
        }
    }

    struct BrokenCollector;

    impl Collector for BrokenCollector {
        fn name(&self) -> &str {
            "broken"
        }

        fn collect(&mut self) -> anyhow::Result<Vec<Reading>> {
            Err(anyhow::anyhow!("sensor unavailable"))
        }
    }

    fn service() -> (MonitoringService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let svc = MonitoringService::new(store.clone(), store.clone(), store.clone());
        (svc, store)
    }

    #[test]
    fn test_sweep_ingests_readings_and_duration() {
        let (svc, store) = service();
        let mut collectors: Vec<Box<dyn Collector>> = vec![Box::new(FixedCollector)];

        let ingested = run_sweep(&svc, &mut collectors);
        assert_eq!(ingested, 1);

        let by_name = store.count_by_name().unwrap();
        assert_eq!(by_name.get("system.cpu.percent"), Some(&1));
        assert_eq!(by_name.get("metrics.collection.duration"), Some(&1));
    }

    #[test]
    fn test_sweep_survives_collector_failure() {
        let (svc, store) = service();
        let mut collectors: Vec<Box<dyn Collector>> =
            vec![Box::new(BrokenCollector), Box::new(FixedCollector)];

        let ingested = run_sweep(&svc, &mut collectors);
        assert_eq!(ingested, 1, "working collector still ingests");

        let errors = store
            .query(&MetricQuery {
                name: Some("metrics.collection.error".to_string()),
                ..MetricQuery::default()
            })
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].labels.get("collector"), Some(&"broken".to_string()));
    }

    #[test]
    fn test_default_collectors_produce_system_readings() {
        let mut collectors = crate::default_collectors(true);
        assert_eq!(collectors.len(), 4);
        for collector in collectors.iter_mut() {
            // Host APIs must at least answer without erroring.
            let readings = collector.collect().unwrap();
            for reading in &readings {
                assert!(!reading.name.is_empty());
                assert!(reading.value.is_finite());
            }
        }
    }
}
