use crate::{Collector, Reading};
use anyhow::Result;
use sysinfo::System;

pub struct CpuCollector {
    system: System,
}

impl CpuCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime the usage counters; the first delta needs a baseline.
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn collect(&mut self) -> Result<Vec<Reading>> {
        self.system.refresh_cpu_all();
        Ok(vec![Reading::new(
            "system.cpu.percent",
            self.system.global_cpu_usage() as f64,
        )])
    }
}
