use crate::store::SettlementStore;
use crate::types::LockedBatch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, Executor, PgConnection, PgPool, Postgres, Row, postgres::PgPoolOptions};
use std::time::Duration;

mod eligibility;
mod migrations;
mod outcomes;

#[derive(Clone)]
pub struct SettlerDb {
    pool: PgPool,
}

impl SettlerDb {
    pub async fn connect(db_url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SettlementStore for SettlerDb {
    async fn lock_eligible(&self, cutoff_ms: i64) -> Result<LockedBatch> {
        SettlerDb::lock_eligible(self, cutoff_ms).await
    }

    async fn record_submitted(&self, request_id: i64, wallet_id: i64, tx_hash: &str) -> Result<()> {
        SettlerDb::record_submitted(self, request_id, wallet_id, tx_hash).await
    }

    async fn record_retry(&self, request_id: i64) -> Result<()> {
        SettlerDb::record_retry(self, request_id).await
    }

    async fn record_escalation(&self, request_id: i64, note: &str) -> Result<()> {
        SettlerDb::record_escalation(self, request_id, note).await
    }
}
