use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for job queue
    pub redis_url: String,

    /// Prometheus scrape listener for the worker process (the API serves
    /// its own /metrics endpoint instead)
    #[serde(default = "default_worker_metrics_addr")]
    pub worker_metrics_addr: String,

    /// Detection engine executable (invoked with --input/--output)
    pub engine_command: String,

    /// Directory for per-job engine input/output artifacts
    pub engine_workspace: String,

    /// Pass --debug to the engine
    #[serde(default)]
    pub engine_debug: bool,

    /// Default webhook address used when an AOI has none configured
    pub webhook_url: String,

    /// Email relay API endpoint (fallback channel)
    pub email_api_url: String,

    /// Email relay API token
    pub email_api_token: String,

    /// From address on fallback emails
    #[serde(default = "default_email_from")]
    pub email_from: String,

    /// Base URL for dashboard deep links in notifications
    #[serde(default = "default_dashboard_url")]
    pub dashboard_base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_worker_metrics_addr() -> String {
    "0.0.0.0:9091".to_string()
}

fn default_email_from() -> String {
    "alerts@geosentry.io".to_string()
}

fn default_dashboard_url() -> String {
    "https://app.geosentry.io".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
