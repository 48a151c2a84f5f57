use crate::{Collector, Reading};
use anyhow::Result;
use sysinfo::System;

const MB: f64 = 1024.0 * 1024.0;

pub struct MemoryCollector {
    system: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn collect(&mut self) -> Result<Vec<Reading>> {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let available = self.system.available_memory();
        let usage_pct = if total > 0 {
            (used as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Ok(vec![
            Reading::new("system.memory.percent", usage_pct),
            Reading::new("system.memory.used", used as f64 / MB),
            Reading::new("system.memory.available", available as f64 / MB),
        ])
    }
}
