use crate::{Collector, Reading};
use anyhow::Result;
use std::collections::HashMap;
use sysinfo::Disks;

const GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct DiskCollector {
    disks: Disks,
}

impl DiskCollector {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for DiskCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for DiskCollector {
    fn name(&self) -> &str {
        "disk"
    }

    fn collect(&mut self) -> Result<Vec<Reading>> {
        self.disks.refresh();
        let mut readings = Vec::new();

        for disk in self.disks.iter() {
            let mount = disk.mount_point().to_string_lossy().to_string();
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            let usage_pct = if total > 0 {
                (used as f64 / total as f64) * 100.0
            } else {
                0.0
            };

            let mut labels = HashMap::new();
            labels.insert("mount".to_string(), mount);

            for (name, value) in [
                ("system.disk.percent", usage_pct),
                ("system.disk.used", used as f64 / GB),
                ("system.disk.free", free as f64 / GB),
            ] {
                readings.push(Reading {
                    name: name.to_string(),
                    value,
                    labels: labels.clone(),
                });
            }
        }

        Ok(readings)
    }
}
