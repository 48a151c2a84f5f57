use serde::{Deserialize, Serialize};
use vigil_alert::{AlertEvaluator, Tolerance};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// CORS allowed origins; empty allows all origins (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Record `api.request.*` samples for every API request.
    #[serde(default = "default_api_metrics_enabled")]
    pub api_metrics_enabled: bool,

    /// Absolute tolerance applied to `eq`/`neq` alert conditions.
    /// Unset keeps exact IEEE-754 comparison.
    #[serde(default)]
    pub eq_tolerance: Option<f64>,

    #[serde(default)]
    pub collector: CollectorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            db_path: default_db_path(),
            cors_allowed_origins: Vec::new(),
            api_metrics_enabled: default_api_metrics_enabled(),
            eq_tolerance: None,
            collector: CollectorConfig::default(),
        }
    }
}

/// Built-in host metric collection loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_collector_enabled")]
    pub enabled: bool,
    #[serde(default = "default_collector_interval_secs")]
    pub interval_secs: u64,
    /// Also collect the server's own RSS/VMS memory metrics.
    #[serde(default = "default_process_metrics")]
    pub process_metrics: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: default_collector_enabled(),
            interval_secs: default_collector_interval_secs(),
            process_metrics: default_process_metrics(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "data/vigil.db".to_string()
}

fn default_api_metrics_enabled() -> bool {
    true
}

fn default_collector_enabled() -> bool {
    true
}

fn default_collector_interval_secs() -> u64 {
    30
}

fn default_process_metrics() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Evaluator configured per `eq_tolerance`. Non-positive values are
    /// treated as unset.
    pub fn evaluator(&self) -> AlertEvaluator {
        match self.eq_tolerance {
            Some(eps) if eps > 0.0 => AlertEvaluator::with_tolerance(Tolerance::Epsilon(eps)),
            _ => AlertEvaluator::new(),
        }
    }
}
