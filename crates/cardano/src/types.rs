use serde::{Deserialize, Serialize};

/// One asset quantity. `unit` is `lovelace` or `policy_id ++ asset_name_hex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub unit: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    pub tx_hash: String,
    pub output_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub address: String,
    pub amount: Vec<Asset>,
    /// Inline datum, hex CBOR.
    pub plutus_data: Option<String>,
    pub data_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub input: TxInput,
    pub output: TxOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptInput {
    pub utxo: Utxo,
    /// Validator, hex CBOR.
    pub script_cbor: String,
    /// Redeemer, hex CBOR.
    pub redeemer_cbor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedOutput {
    pub address: String,
    pub amount: Vec<Asset>,
    pub inline_datum_cbor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMetadata {
    pub label: u64,
    pub json: serde_json::Value,
}

/// Everything a wallet needs to balance, build and witness a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPlan {
    pub script_inputs: Vec<ScriptInput>,
    pub outputs: Vec<PlannedOutput>,
    pub change_address: String,
    pub required_signers: Vec<String>,
    pub invalid_before: u64,
    pub invalid_hereafter: u64,
    pub metadata: Vec<TxMetadata>,
}

/// Built but unwitnessed transaction, hex CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnsignedTx(pub String);

/// Fully witnessed transaction, hex CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedTx(pub String);
