use crate::datum::DatumError;
use crate::secrets::SecretError;

/// Failures scoped to a single payment request. All of them count toward the
/// network's retry budget.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("decode escrow datum: {0}")]
    Decode(#[from] DatumError),
    #[error("No UTXOs found in the wallet. Wallet is empty.")]
    NoUtxo,
    #[error("UTXO not found: {tx_hash}")]
    UtxoNotFound { tx_hash: String },
    #[error("payment request has no escrow transaction hash")]
    MissingEscrowOutput,
    #[error("decrypt wallet secret: {0}")]
    Secret(#[from] SecretError),
    #[error("wallet: {0:#}")]
    Wallet(anyhow::Error),
    #[error("rpc: {0:#}")]
    Rpc(anyhow::Error),
    #[error("submit transaction: {0:#}")]
    Submission(anyhow::Error),
}

impl RequestError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::NoUtxo => "no_utxo",
            Self::UtxoNotFound { .. } => "utxo_not_found",
            Self::MissingEscrowOutput => "missing_escrow_output",
            Self::Secret(_) => "secret",
            Self::Wallet(_) => "wallet",
            Self::Rpc(_) => "rpc",
            Self::Submission(_) => "submission",
        }
    }
}

/// Failures reported by a settlement run.
#[derive(Debug, thiserror::Error)]
pub enum SettleError {
    #[error("network handler {handler_id} has unsupported network {network:?}")]
    Configuration { handler_id: i64, network: String },
    #[error("lock acquisition failed: {0:#}")]
    LockAcquisition(anyhow::Error),
    #[error(
        "request {request_id} submitted tx {tx_hash} but recording it failed: {cause:#}"
    )]
    PersistenceAfterSubmit {
        request_id: i64,
        wallet_id: i64,
        tx_hash: String,
        cause: anyhow::Error,
    },
    #[error("recording failure of request {request_id}: {cause:#}")]
    OutcomeWrite { request_id: i64, cause: anyhow::Error },
    #[error("network {network} task failed: {cause}")]
    NetworkTask { network: String, cause: String },
}
