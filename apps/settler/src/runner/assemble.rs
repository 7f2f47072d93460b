use crate::datum::{DatumError, decode_datum, submit_result_redeemer};
use crate::error::RequestError;
use crate::types::{EligibleRequest, NetworkContext};
use crate::wallet::{ChainQuery, SettlementWallet};
use cardano::{PlannedOutput, ScriptInput, TxMetadata, TxPlan, Utxo, ValidityWindow};
use std::time::Duration;

/// CIP-20 transaction message label.
const MESSAGE_LABEL: u64 = 674;

/// A submit-result plan plus the wallet outputs it may be balanced against.
#[derive(Debug, Clone)]
pub struct AssembledTx {
    pub plan: TxPlan,
    pub wallet_utxos: Vec<Utxo>,
}

pub async fn assemble_submit_result(
    wallet: &dyn SettlementWallet,
    chain: &dyn ChainQuery,
    net: &NetworkContext,
    req: &EligibleRequest,
    now_ms: i64,
    tolerance: Duration,
) -> Result<AssembledTx, RequestError> {
    let wallet_utxos = wallet.utxos().await.map_err(RequestError::Wallet)?;
    if wallet_utxos.is_empty() {
        return Err(RequestError::NoUtxo);
    }

    let tx_hash = req
        .tx_hash
        .as_deref()
        .ok_or(RequestError::MissingEscrowOutput)?;
    let escrow = chain
        .tx_outputs(tx_hash)
        .await
        .map_err(RequestError::Rpc)?
        .into_iter()
        .find(|u| u.input.tx_hash == tx_hash && u.output.address == net.contract_address)
        .ok_or_else(|| RequestError::UtxoNotFound {
            tx_hash: tx_hash.to_string(),
        })?;

    let datum = decode_datum(escrow.output.plutus_data.as_deref())?;
    let successor = datum.submit_result_successor(
        req.buyer_vkey.as_deref(),
        &req.wallet.vkey,
        &req.identifier,
        &req.result_hash,
    );
    let datum_cbor = successor.encode()?;
    let redeemer_cbor = submit_result_redeemer()
        .to_cbor_hex()
        .map_err(DatumError::from)?;

    let change_address = wallet.change_address().await.map_err(RequestError::Wallet)?;
    let tolerance_ms = i64::try_from(tolerance.as_millis()).unwrap_or(i64::MAX);
    let window = ValidityWindow::around(now_ms, tolerance_ms, net.network.slot_config());

    let plan = TxPlan {
        outputs: vec![PlannedOutput {
            address: net.contract_address.clone(),
            amount: escrow.output.amount.clone(),
            inline_datum_cbor: Some(datum_cbor),
        }],
        script_inputs: vec![ScriptInput {
            utxo: escrow,
            script_cbor: net.script_cbor.clone(),
            redeemer_cbor,
        }],
        required_signers: vec![change_address.clone()],
        change_address,
        invalid_before: window.invalid_before,
        invalid_hereafter: window.invalid_hereafter,
        metadata: vec![TxMetadata {
            label: MESSAGE_LABEL,
            json: serde_json::json!({ "msg": ["Masumi", "SubmitResult"] }),
        }],
    };

    Ok(AssembledTx { plan, wallet_utxos })
}
