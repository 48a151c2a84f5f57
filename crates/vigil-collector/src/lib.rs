//! Built-in system metric collectors.
//!
//! Each [`Collector`] implementation gathers one category of host
//! metrics (CPU, memory, disk, own-process memory) and returns them as
//! plain [`Reading`]s. [`sweep::run_sweep`] feeds the readings through
//! the monitoring service so they flow down the same ingestion path as
//! metrics posted over the API.

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod process;
pub mod sweep;

use anyhow::Result;
use std::collections::HashMap;

/// One collected value, not yet persisted. Ids and timestamps are
/// assigned at ingestion.
#[derive(Debug, Clone)]
pub struct Reading {
    pub name: String,
    pub value: f64,
    pub labels: HashMap<String, String>,
}

impl Reading {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            labels: HashMap::new(),
        }
    }
}

/// A host metric collector, called once per collection interval.
pub trait Collector: Send + Sync {
    /// Collector name (e.g. `"cpu"`, `"disk"`), used for logging and the
    /// error counter label.
    fn name(&self) -> &str;

    /// Gathers current values.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn collect(&mut self) -> Result<Vec<Reading>>;
}

/// The default collector set: CPU, memory and disk, plus own-process
/// memory when `process_metrics` is set.
pub fn default_collectors(process_metrics: bool) -> Vec<Box<dyn Collector>> {
    let mut collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(cpu::CpuCollector::new()),
        Box::new(memory::MemoryCollector::new()),
        Box::new(disk::DiskCollector::new()),
    ];
    if process_metrics {
        collectors.push(Box::new(process::ProcessCollector::new()));
    }
    collectors
}
