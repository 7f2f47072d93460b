use crate::{
    config::JobConfig, metrics::SettlerTelemetry, secrets::SecretBox, store::SettlementStore,
    wallet::WalletConnector,
};
use std::sync::Arc;

#[derive(Clone)]
pub(super) struct RunCtx {
    pub(super) store: Arc<dyn SettlementStore>,
    pub(super) wallets: Arc<dyn WalletConnector>,
    pub(super) secrets: SecretBox,
    pub(super) jobs: JobConfig,
    pub(super) telemetry: SettlerTelemetry,
}
