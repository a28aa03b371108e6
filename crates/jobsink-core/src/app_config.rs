use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub feeds_path: PathBuf,
    /// Six-field cron expression for the recurring import sweep.
    pub import_cron: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub feed_request_timeout_secs: u64,
    pub feed_user_agent: String,
    pub queue_concurrency: usize,
    pub queue_rate_limit_per_sec: u32,
    pub queue_max_attempts: u32,
    pub queue_backoff_base_secs: u64,
    pub queue_dedup_window_secs: u64,
    pub queue_completed_retention: usize,
    pub queue_completed_retention_secs: u64,
    pub queue_failed_retention_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("feeds_path", &self.feeds_path)
            .field("import_cron", &self.import_cron)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("feed_request_timeout_secs", &self.feed_request_timeout_secs)
            .field("feed_user_agent", &self.feed_user_agent)
            .field("queue_concurrency", &self.queue_concurrency)
            .field("queue_rate_limit_per_sec", &self.queue_rate_limit_per_sec)
            .field("queue_max_attempts", &self.queue_max_attempts)
            .field("queue_backoff_base_secs", &self.queue_backoff_base_secs)
            .field("queue_dedup_window_secs", &self.queue_dedup_window_secs)
            .field("queue_completed_retention", &self.queue_completed_retention)
            .field(
                "queue_completed_retention_secs",
                &self.queue_completed_retention_secs,
            )
            .field(
                "queue_failed_retention_secs",
                &self.queue_failed_retention_secs,
            )
            .field("shutdown_grace_secs", &self.shutdown_grace_secs)
            .finish()
    }
}
