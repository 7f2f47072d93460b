use super::*;
use crate::types::{ErrorType, PaymentStatus};

impl SettlerDb {
    pub async fn record_submitted(&self, request_id: i64, wallet_id: i64, tx_hash: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.context("begin outcome tx")?;

        let updated = sqlx::query(
            "update settler.payment_requests \
             set potential_tx_hash = $2, status = $3, updated_at = now() \
             where id = $1",
        )
        .bind(request_id)
        .bind(tx_hash)
        .bind(PaymentStatus::CompletedInitiated.as_db_str())
        .execute(&mut *tx)
        .await
        .context("update payment request after submit")?
        .rows_affected();
        if updated != 1 {
            anyhow::bail!("payment request {request_id} not found");
        }

        let locked = sqlx::query(
            "update settler.pending_transactions \
             set hash = $2, updated_at = now() \
             where selling_wallet_id = $1 and hash is null",
        )
        .bind(wallet_id)
        .bind(tx_hash)
        .execute(&mut *tx)
        .await
        .context("attach tx hash to pending transaction")?
        .rows_affected();
        if locked != 1 {
            anyhow::bail!("wallet {wallet_id} has no open pending transaction");
        }

        tx.commit().await.context("commit outcome tx")?;
        Ok(())
    }

    pub async fn record_retry(&self, request_id: i64) -> Result<()> {
        let updated = sqlx::query(
            "update settler.payment_requests \
             set error_retries = error_retries + 1, updated_at = now() \
             where id = $1 and error_type is null",
        )
        .bind(request_id)
        .execute(&self.pool)
        .await
        .context("increment error_retries")?
        .rows_affected();
        if updated != 1 {
            anyhow::bail!("payment request {request_id} not retryable");
        }
        Ok(())
    }

    pub async fn record_escalation(&self, request_id: i64, note: &str) -> Result<()> {
        let updated = sqlx::query(
            "update settler.payment_requests \
             set error_type = $2, error_requires_manual_review = true, error_note = $3, \
                 updated_at = now() \
             where id = $1 and error_type is null",
        )
        .bind(request_id)
        .bind(ErrorType::Unknown.as_db_str())
        .bind(note)
        .execute(&self.pool)
        .await
        .context("escalate payment request")?
        .rows_affected();
        if updated != 1 {
            anyhow::bail!("payment request {request_id} already escalated");
        }
        Ok(())
    }
}
