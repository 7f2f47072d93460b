use crate::{
    config::JobConfig,
    error::{RequestError, SettleError},
    metrics::SettlerTelemetry,
    secrets::SecretBox,
    store::SettlementStore,
    types::{EligibleRequest, NetworkBatch, NetworkContext},
    wallet::{ChainQuery, WalletConnector},
};
use context::RunCtx;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

mod assemble;
mod context;
mod dedup;
mod gate;
mod outcome;
mod retry;
mod submit;

pub use assemble::{AssembledTx, assemble_submit_result};
pub use dedup::dedup_by_wallet;
pub use gate::RunGate;
pub use retry::{RetryDecision, decide, error_note};
pub use submit::execute;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub request_id: i64,
    pub wallet_id: i64,
    pub tx_hash: String,
}

/// What one run did. Failures are collected, never propagated to siblings.
#[derive(Debug, Default)]
pub struct RunReport {
    pub locked_wallets: usize,
    pub selected: usize,
    pub deduplicated: usize,
    pub submitted: Vec<SubmittedTx>,
    pub retried: Vec<i64>,
    pub escalated: Vec<i64>,
    pub errors: Vec<SettleError>,
}

impl RunReport {
    fn merge(&mut self, other: RunReport) {
        self.selected += other.selected;
        self.deduplicated += other.deduplicated;
        self.submitted.extend(other.submitted);
        self.retried.extend(other.retried);
        self.escalated.extend(other.escalated);
        self.errors.extend(other.errors);
    }

    fn absorb(&mut self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Submitted(tx) => self.submitted.push(tx),
            RequestOutcome::Retried(id) => self.retried.push(id),
            RequestOutcome::Escalated(id) => self.escalated.push(id),
            RequestOutcome::Failed(err) => self.errors.push(err),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run was active; this call waited for it and did no work.
    Joined,
}

#[derive(Debug)]
enum RequestOutcome {
    Submitted(SubmittedTx),
    Retried(i64),
    Escalated(i64),
    Failed(SettleError),
}

pub struct Settler {
    ctx: RunCtx,
    gate: RunGate,
}

impl Settler {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        wallets: Arc<dyn WalletConnector>,
        secrets: SecretBox,
        jobs: JobConfig,
        telemetry: SettlerTelemetry,
    ) -> Self {
        Self {
            ctx: RunCtx {
                store,
                wallets,
                secrets,
                jobs,
                telemetry,
            },
            gate: RunGate::new(),
        }
    }

    /// Runs one settlement cycle unless one is already active, in which case
    /// it waits for that cycle to finish and returns `Joined`.
    pub async fn run(&self) -> Result<RunOutcome, SettleError> {
        let Some(_permit) = self.gate.enter().await else {
            self.ctx.telemetry.run_joined();
            tracing::debug!("settlement run already active; joined");
            return Ok(RunOutcome::Joined);
        };

        let started = Instant::now();
        let res = self.run_cycle(unix_now_ms()).await;
        self.ctx
            .telemetry
            .run_done(started.elapsed().as_millis() as u64, res.is_ok());
        res.map(RunOutcome::Completed)
    }

    pub async fn run_cycle(&self, now_ms: i64) -> Result<RunReport, SettleError> {
        let margin_ms = i64::try_from(self.ctx.jobs.safety_margin.as_millis()).unwrap_or(i64::MAX);
        let cutoff_ms = now_ms.saturating_sub(margin_ms);

        let batch = self.ctx.store.lock_eligible(cutoff_ms).await.map_err(|e| {
            self.ctx.telemetry.lock_failed();
            SettleError::LockAcquisition(e)
        })?;
        self.ctx.telemetry.wallets_locked(batch.locked_wallets.len());
        tracing::info!(
            cutoff_ms,
            networks = batch.networks.len(),
            requests = batch.request_count(),
            locked_wallets = batch.locked_wallets.len(),
            "locked eligible requests"
        );

        let mut report = RunReport {
            locked_wallets: batch.locked_wallets.len(),
            ..RunReport::default()
        };

        for m in batch.misconfigured {
            self.ctx.telemetry.misconfigured_network();
            tracing::error!(
                handler_id = m.handler_id,
                network = %m.network,
                requests = m.request_count,
                "unsupported network; skipping handler"
            );
            report.errors.push(SettleError::Configuration {
                handler_id: m.handler_id,
                network: m.network,
            });
        }

        let mut set = JoinSet::new();
        let mut names = HashMap::new();
        for nb in batch.networks {
            let name = format!("{}#{}", nb.ctx.network, nb.ctx.id);
            let ctx = self.ctx.clone();
            let handle = set.spawn(async move { settle_network(ctx, nb, now_ms).await });
            names.insert(handle.id(), name);
        }

        while let Some(res) = set.join_next().await {
            match res {
                Ok(net_report) => report.merge(net_report),
                Err(err) => {
                    let network = names
                        .get(&err.id())
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::error!(network = %network, err = %err, "network task failed");
                    report.errors.push(SettleError::NetworkTask {
                        network,
                        cause: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            selected = report.selected,
            deduplicated = report.deduplicated,
            submitted = report.submitted.len(),
            retried = report.retried.len(),
            escalated = report.escalated.len(),
            errors = report.errors.len(),
            "settlement run finished"
        );
        Ok(report)
    }

    /// Triggers a run every `tick_interval` until `shutdown` fires.
    pub async fn run_forever(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut interval = tokio::time::interval(self.ctx.jobs.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            if let Err(err) = self.run().await {
                tracing::warn!(err = %err, "settlement run aborted");
            }
        }
    }
}

async fn settle_network(ctx: RunCtx, nb: NetworkBatch, now_ms: i64) -> RunReport {
    let (selected, skipped) = dedup_by_wallet(nb.requests);
    let net = Arc::new(nb.ctx);
    if !skipped.is_empty() {
        ctx.telemetry.deduplicated(net.network.as_str(), skipped.len());
        tracing::debug!(
            network = %net.network,
            skipped = ?skipped.iter().map(|r| r.id).collect::<Vec<_>>(),
            "deferred requests sharing a wallet"
        );
    }

    let mut report = RunReport {
        selected: selected.len(),
        deduplicated: skipped.len(),
        ..RunReport::default()
    };

    let chain = ctx.wallets.chain(&net);
    let mut set = JoinSet::new();
    let mut ids = HashMap::new();
    for req in selected {
        let request_id = req.id;
        let ctx = ctx.clone();
        let net = Arc::clone(&net);
        let chain = Arc::clone(&chain);
        let handle = set.spawn(async move { settle_request(ctx, net, chain, req, now_ms).await });
        ids.insert(handle.id(), request_id);
    }

    while let Some(res) = set.join_next().await {
        match res {
            Ok(outcome) => report.absorb(outcome),
            Err(err) => {
                let request_id = ids.get(&err.id()).copied().unwrap_or_default();
                tracing::error!(request_id, err = %err, "request task failed");
                report.errors.push(SettleError::NetworkTask {
                    network: format!("{} request {request_id}", net.network),
                    cause: err.to_string(),
                });
            }
        }
    }
    report
}

async fn settle_request(
    ctx: RunCtx,
    net: Arc<NetworkContext>,
    chain: Arc<dyn ChainQuery>,
    req: EligibleRequest,
    now_ms: i64,
) -> RequestOutcome {
    let started = Instant::now();
    match attempt(&ctx, &net, chain.as_ref(), &req, now_ms).await {
        Ok(tx_hash) => {
            let ms = started.elapsed().as_millis() as u64;
            outcome::record_success(&ctx, &net, &req, tx_hash, ms).await
        }
        Err(err) => outcome::record_failure(&ctx, &net, &req, err).await,
    }
}

/// The mnemonic lives only as long as `wallet` inside this call.
async fn attempt(
    ctx: &RunCtx,
    net: &NetworkContext,
    chain: &dyn ChainQuery,
    req: &EligibleRequest,
    now_ms: i64,
) -> Result<String, RequestError> {
    let mnemonic = ctx.secrets.decrypt(&req.wallet.encrypted_secret)?;
    let wallet = ctx.wallets.open(net, mnemonic);
    let tx = assemble_submit_result(
        wallet.as_ref(),
        chain,
        net,
        req,
        now_ms,
        ctx.jobs.validity_tolerance,
    )
    .await?;
    execute(wallet.as_ref(), &tx).await
}

pub fn unix_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
