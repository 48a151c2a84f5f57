use crate::{Collector, Reading};
use anyhow::Result;
use sysinfo::{get_current_pid, ProcessesToUpdate, System};

const MB: f64 = 1024.0 * 1024.0;

/// Reports the server's own memory footprint (RSS and virtual size).
pub struct ProcessCollector {
    system: System,
}

impl ProcessCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &str {
        "process"
    }

    fn collect(&mut self) -> Result<Vec<Reading>> {
        let pid = get_current_pid().map_err(|e| anyhow::anyhow!("current pid: {e}"))?;
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        let process = self
            .system
            .process(pid)
            .ok_or_else(|| anyhow::anyhow!("own process {pid} not visible"))?;

        Ok(vec![
            Reading::new("app.memory.rss", process.memory() as f64 / MB),
            Reading::new("app.memory.vms", process.virtual_memory() as f64 / MB),
        ])
    }
}
