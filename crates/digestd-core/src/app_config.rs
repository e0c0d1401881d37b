use std::net::SocketAddr;
use std::time::Duration;

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

/// Credentials and endpoint for one upstream HTTP API.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for ApiEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEndpoint")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub api_keys: Vec<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub web_search: Option<ApiEndpoint>,
    pub social_search: Option<ApiEndpoint>,
    pub summarizer: Option<ApiEndpoint>,
    pub resend_api_key: Option<String>,
    pub resend_base_url: String,
    pub email_from: String,
    pub retrieval_timeout_secs: u64,
    pub summary_timeout_secs: u64,
    pub email_timeout_secs: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub batch_delay_ms: u64,
    pub run_lease_secs: u64,
    pub cron: String,
}

impl AppConfig {
    /// Batch-driver tuning derived from this config.
    #[must_use]
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size.max(1),
            max_attempts: self.max_attempts.max(1),
            backoff_base: Duration::from_secs(self.backoff_base_secs),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            run_lease: Duration::from_secs(self.run_lease_secs),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("web_search", &self.web_search)
            .field("social_search", &self.social_search)
            .field("summarizer", &self.summarizer)
            .field(
                "resend_api_key",
                &self.resend_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("resend_base_url", &self.resend_base_url)
            .field("email_from", &self.email_from)
            .field("retrieval_timeout_secs", &self.retrieval_timeout_secs)
            .field("summary_timeout_secs", &self.summary_timeout_secs)
            .field("email_timeout_secs", &self.email_timeout_secs)
            .field("batch_size", &self.batch_size)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .field("batch_delay_ms", &self.batch_delay_ms)
            .field("run_lease_secs", &self.run_lease_secs)
            .field("cron", &self.cron)
            .finish()
    }
}

/// Tuning knobs for one batch-driver cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Digests processed concurrently within one batch.
    pub batch_size: usize,
    /// Pipeline attempts per digest per cycle, including the first.
    pub max_attempts: u32,
    /// Backoff after failed attempt `n` (1-based) is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
    /// A `processing` run older than this is treated as abandoned.
    pub run_lease: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            batch_delay: Duration::from_secs(1),
            run_lease: Duration::from_secs(30 * 60),
        }
    }
}

impl BatchConfig {
    /// Delay before retrying after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}
