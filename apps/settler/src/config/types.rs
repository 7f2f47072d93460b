use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub db: DbConfig,
    pub signer: SignerConfig,
    pub jobs: JobConfig,
    /// Key material for wallet secrets stored in `settler.wallet_secrets`.
    pub encryption_key: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("db", &self.db)
            .field("signer", &self.signer)
            .field("jobs", &self.jobs)
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SignerConfig {
    pub url: String,
    /// Applied to both signer sidecar and Blockfrost calls.
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub tick_interval: Duration,
    /// Requests become eligible once `submit_result_time <= now - safety_margin`.
    pub safety_margin: Duration,
    /// Half-width of the transaction validity interval.
    pub validity_tolerance: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(super::env::DEFAULT_TICK_INTERVAL_SECS),
            safety_margin: Duration::from_secs(super::env::DEFAULT_SAFETY_MARGIN_SECS),
            validity_tolerance: Duration::from_secs(super::env::DEFAULT_VALIDITY_TOLERANCE_SECS),
        }
    }
}
