use serde::Deserialize;

pub(super) const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub(super) const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub(super) const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub(super) const DEFAULT_TICK_INTERVAL_SECS: u64 = 240;
pub(super) const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
pub(super) const DEFAULT_VALIDITY_TOLERANCE_SECS: u64 = 150;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct Env {
    pub database_url: String,

    pub db_max_connections: u32,

    pub db_acquire_timeout_secs: u64,

    /// Must be longer than 20 characters.
    pub encryption_key: String,

    /// Wallet signer sidecar base URL.
    pub signer_url: String,

    pub http_timeout_secs: u64,

    pub settler_tick_interval_secs: u64,

    pub settler_safety_margin_secs: u64,

    pub settler_validity_tolerance_secs: u64,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            db_acquire_timeout_secs: DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            encryption_key: String::new(),
            signer_url: String::new(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            settler_tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            settler_safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
            settler_validity_tolerance_secs: DEFAULT_VALIDITY_TOLERANCE_SECS,
        }
    }
}
