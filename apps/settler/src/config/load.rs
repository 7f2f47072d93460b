use super::env::Env;
use super::parse::{parse_encryption_key, parse_http_url, require_non_empty};
use super::{AppConfig, DbConfig, JobConfig, SignerConfig};
use anyhow::{Context, Result};
use std::time::Duration;

pub(super) fn load_config() -> Result<AppConfig> {
    let env: Env = envy::from_env().context("load settler env config")?;
    from_env(env)
}

pub(super) fn from_env(env: Env) -> Result<AppConfig> {
    let db_url = require_non_empty("DATABASE_URL", &env.database_url)?;
    let encryption_key = parse_encryption_key("ENCRYPTION_KEY", &env.encryption_key)?;
    let signer_url = parse_http_url("SIGNER_URL", &env.signer_url)?;

    let validity_tolerance = Duration::from_secs(env.settler_validity_tolerance_secs.max(1));
    if validity_tolerance > Duration::from_secs(3600) {
        anyhow::bail!("SETTLER_VALIDITY_TOLERANCE_SECS must be at most 3600");
    }

    Ok(AppConfig {
        db: DbConfig {
            url: db_url,
            max_connections: env.db_max_connections.max(1),
            acquire_timeout: Duration::from_secs(env.db_acquire_timeout_secs.max(1)),
        },
        signer: SignerConfig {
            url: signer_url,
            http_timeout: Duration::from_secs(env.http_timeout_secs.max(1)),
        },
        jobs: JobConfig {
            tick_interval: Duration::from_secs(env.settler_tick_interval_secs.max(1)),
            safety_margin: Duration::from_secs(env.settler_safety_margin_secs),
            validity_tolerance,
        },
        encryption_key,
    })
}
