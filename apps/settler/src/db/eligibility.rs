use super::*;
use crate::store::{EligibleRow, HandlerRow, group_by_network, wallets_to_lock};
use crate::types::{EligibleRequest, PAYMENT_TYPE_CARDANO_V1, PaymentStatus, WalletRef};
use sqlx::postgres::PgRow;

impl SettlerDb {
    /// Selects eligible requests and locks their wallets as one atomic unit.
    ///
    /// Runs at serializable isolation: the "wallet has no pending transaction"
    /// predicate and the lock inserts must not interleave with another run.
    /// Any failure, including a unique violation on a racing lock, rolls the
    /// whole transaction back.
    pub async fn lock_eligible(&self, cutoff_ms: i64) -> Result<LockedBatch> {
        let mut tx = self.pool.begin().await.context("begin eligibility tx")?;
        sqlx::query("set transaction isolation level serializable")
            .execute(&mut *tx)
            .await
            .context("set serializable isolation")?;

        let rows = select_eligible(&mut tx, cutoff_ms).await?;
        let (networks, misconfigured) = group_by_network(rows);
        let locked_wallets = wallets_to_lock(&networks);
        lock_wallets(&mut tx, &locked_wallets).await?;

        tx.commit().await.context("commit eligibility tx")?;
        Ok(LockedBatch {
            networks,
            misconfigured,
            locked_wallets,
        })
    }
}

async fn select_eligible(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    cutoff_ms: i64,
) -> Result<Vec<EligibleRow>> {
    let statuses: Vec<&str> = PaymentStatus::SUBMITTABLE
        .iter()
        .map(|s| s.as_db_str())
        .collect();
    let rows = sqlx::query(
        "select \
            nh.id as handler_id, nh.network, nh.rpc_provider_api_key, \
            nh.max_submit_result_retries, nh.payment_contract_address, nh.payment_script_cbor, \
            pr.id, pr.identifier, pr.result_hash, pr.tx_hash, pr.error_retries, \
            bw.wallet_vkey as buyer_vkey, \
            sw.id as wallet_id, sw.wallet_vkey, ws.secret \
         from settler.payment_requests pr \
         join settler.network_handlers nh on nh.id = pr.network_handler_id \
         join settler.selling_wallets sw on sw.id = pr.smart_contract_wallet_id \
         join settler.wallet_secrets ws on ws.id = sw.wallet_secret_id \
         left join settler.buyer_wallets bw on bw.id = pr.buyer_wallet_id \
         where nh.payment_type = $1 \
           and pr.status = any($2) \
           and pr.result_hash is not null \
           and pr.error_type is null \
           and pr.submit_result_time <= $3 \
           and not exists ( \
             select 1 from settler.pending_transactions pt \
             where pt.selling_wallet_id = sw.id \
           ) \
         order by nh.id, pr.submit_result_time, pr.id",
    )
    .bind(PAYMENT_TYPE_CARDANO_V1)
    .bind(&statuses[..])
    .bind(cutoff_ms)
    .fetch_all(&mut **tx)
    .await
    .context("select eligible payment requests")?;

    rows.iter().map(eligible_row).collect()
}

fn eligible_row(row: &PgRow) -> Result<EligibleRow> {
    Ok(EligibleRow {
        handler: HandlerRow {
            id: row.try_get("handler_id")?,
            network: row.try_get("network")?,
            rpc_api_key: row.try_get("rpc_provider_api_key")?,
            max_retries: row.try_get("max_submit_result_retries")?,
            contract_address: row.try_get("payment_contract_address")?,
            script_cbor: row.try_get("payment_script_cbor")?,
        },
        request: EligibleRequest {
            id: row.try_get("id")?,
            identifier: row.try_get("identifier")?,
            result_hash: row.try_get("result_hash")?,
            tx_hash: row.try_get("tx_hash")?,
            error_retries: row.try_get("error_retries")?,
            buyer_vkey: row.try_get("buyer_vkey")?,
            wallet: WalletRef {
                id: row.try_get("wallet_id")?,
                vkey: row.try_get("wallet_vkey")?,
                encrypted_secret: row.try_get("secret")?,
            },
        },
    })
}

async fn lock_wallets(tx: &mut sqlx::Transaction<'_, Postgres>, wallet_ids: &[i64]) -> Result<()> {
    if wallet_ids.is_empty() {
        return Ok(());
    }
    let inserted = sqlx::query(
        "insert into settler.pending_transactions(selling_wallet_id) \
         select unnest($1::bigint[])",
    )
    .bind(wallet_ids)
    .execute(&mut **tx)
    .await
    .context("insert settler.pending_transactions")?
    .rows_affected();
    if inserted != wallet_ids.len() as u64 {
        anyhow::bail!(
            "locked {inserted} of {} wallets; refusing partial lock",
            wallet_ids.len()
        );
    }
    Ok(())
}
