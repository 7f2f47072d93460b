use super::context::RunCtx;
use super::retry::{RetryDecision, decide, error_note};
use super::{RequestOutcome, SubmittedTx};
use crate::error::{RequestError, SettleError};
use crate::types::{EligibleRequest, NetworkContext};

pub(super) async fn record_success(
    ctx: &RunCtx,
    net: &NetworkContext,
    req: &EligibleRequest,
    tx_hash: String,
    submit_ms: u64,
) -> RequestOutcome {
    match ctx
        .store
        .record_submitted(req.id, req.wallet.id, &tx_hash)
        .await
    {
        Ok(()) => {
            ctx.telemetry.submitted(net.network.as_str(), submit_ms);
            tracing::info!(
                request_id = req.id,
                wallet_id = req.wallet.id,
                network = %net.network,
                tx_hash = %tx_hash,
                explorer = %net.network.explorer_tx_url(&tx_hash),
                contract = %net.contract_address,
                "submitted result transaction"
            );
            RequestOutcome::Submitted(SubmittedTx {
                request_id: req.id,
                wallet_id: req.wallet.id,
                tx_hash,
            })
        }
        Err(cause) => {
            // Already on chain: never retried.
            ctx.telemetry.persistence_after_submit();
            tracing::error!(
                request_id = req.id,
                wallet_id = req.wallet.id,
                network = %net.network,
                tx_hash = %tx_hash,
                err = %format_args!("{cause:#}"),
                "submitted transaction not recorded; manual reconciliation required"
            );
            RequestOutcome::Failed(SettleError::PersistenceAfterSubmit {
                request_id: req.id,
                wallet_id: req.wallet.id,
                tx_hash,
                cause,
            })
        }
    }
}

pub(super) async fn record_failure(
    ctx: &RunCtx,
    net: &NetworkContext,
    req: &EligibleRequest,
    err: RequestError,
) -> RequestOutcome {
    ctx.telemetry
        .request_failed(net.network.as_str(), err.kind());

    let decision = decide(req.error_retries, net.max_retries);
    let write = match decision {
        RetryDecision::Retry { next } => {
            tracing::warn!(
                request_id = req.id,
                wallet_id = req.wallet.id,
                network = %net.network,
                kind = err.kind(),
                retries = next,
                max_retries = net.max_retries,
                err = %err,
                "submit result failed; will retry"
            );
            ctx.store.record_retry(req.id).await
        }
        RetryDecision::Escalate => {
            tracing::error!(
                request_id = req.id,
                wallet_id = req.wallet.id,
                network = %net.network,
                kind = err.kind(),
                retries = req.error_retries,
                err = %err,
                "submit result failed; retries exhausted, flagged for manual review"
            );
            ctx.store.record_escalation(req.id, &error_note(&err)).await
        }
    };

    match write {
        Ok(()) => match decision {
            RetryDecision::Retry { .. } => {
                ctx.telemetry.retried();
                RequestOutcome::Retried(req.id)
            }
            RetryDecision::Escalate => {
                ctx.telemetry.escalated();
                RequestOutcome::Escalated(req.id)
            }
        },
        Err(cause) => {
            tracing::error!(
                request_id = req.id,
                err = %format_args!("{cause:#}"),
                "failed to record request failure"
            );
            RequestOutcome::Failed(SettleError::OutcomeWrite {
                request_id: req.id,
                cause,
            })
        }
    }
}
