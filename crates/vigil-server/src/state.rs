use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use vigil_monitor::MonitoringService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MonitoringService>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}
