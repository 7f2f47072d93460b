use super::assemble::AssembledTx;
use crate::error::RequestError;
use crate::wallet::SettlementWallet;

/// Build, sign and submit. Returns the network transaction id.
pub async fn execute(
    wallet: &dyn SettlementWallet,
    tx: &AssembledTx,
) -> Result<String, RequestError> {
    let unsigned = wallet
        .build(&tx.plan, &tx.wallet_utxos)
        .await
        .map_err(|e| RequestError::Submission(e.context("build")))?;
    let signed = wallet
        .sign(&unsigned)
        .await
        .map_err(|e| RequestError::Submission(e.context("sign")))?;
    wallet
        .submit(&signed)
        .await
        .map_err(|e| RequestError::Submission(e.context("submit")))
}
