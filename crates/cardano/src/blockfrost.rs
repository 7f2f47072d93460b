use crate::slot::Network;
use crate::types::{Asset, SignedTx, TxInput, TxOutput, Utxo};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct AddressUtxo {
    address: String,
    tx_hash: String,
    output_index: u32,
    amount: Vec<Asset>,
    data_hash: Option<String>,
    inline_datum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TxUtxos {
    hash: String,
    outputs: Vec<TxUtxoOutput>,
}

#[derive(Debug, Deserialize)]
struct TxUtxoOutput {
    address: String,
    output_index: u32,
    amount: Vec<Asset>,
    data_hash: Option<String>,
    inline_datum: Option<String>,
    #[serde(default)]
    collateral: bool,
    #[serde(default)]
    consumed_by_tx: Option<String>,
}

/// Minimal Blockfrost REST client: UTXO lookups and transaction submission.
#[derive(Clone)]
pub struct BlockfrostClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
}

impl BlockfrostClient {
    pub fn new(http: reqwest::Client, network: Network, project_id: &str) -> Self {
        Self::with_base_url(http, network.blockfrost_base_url(), project_id)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: &str, project_id: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
        }
    }

    /// All unspent outputs currently held by `address`. Unknown addresses yield an empty set.
    pub async fn address_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
        let mut out = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!(
                "{}/addresses/{address}/utxos?page={page}&count={PAGE_SIZE}",
                self.base_url
            );
            let Some(text) = self.get(&url).await? else {
                return Ok(out);
            };
            let batch = parse_address_utxos(&text)?;
            let n = batch.len();
            out.extend(batch);
            if n < PAGE_SIZE {
                return Ok(out);
            }
        }
        anyhow::bail!("address {address} has more than {} utxos", PAGE_SIZE * MAX_PAGES)
    }

    /// Unspent, non-collateral outputs created by `tx_hash`.
    pub async fn tx_utxos(&self, tx_hash: &str) -> Result<Vec<Utxo>> {
        let url = format!("{}/txs/{tx_hash}/utxos", self.base_url);
        let Some(text) = self.get(&url).await? else {
            return Ok(Vec::new());
        };
        parse_tx_outputs(&text)
    }

    /// Submits a witnessed transaction and returns its id.
    pub async fn submit_tx(&self, tx: &SignedTx) -> Result<String> {
        let body = hex::decode(&tx.0).context("signed tx is not hex")?;
        let url = format!("{}/tx/submit", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("project_id", &self.project_id)
            .header(reqwest::header::CONTENT_TYPE, "application/cbor")
            .body(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        let status = resp.status();
        let text = resp.text().await.context("read tx/submit body")?;
        if !status.is_success() {
            anyhow::bail!("tx/submit http status={} body={text}", status.as_u16());
        }
        let hash: String = serde_json::from_str(&text).context("parse tx/submit response")?;
        Ok(hash)
    }

    async fn get(&self, url: &str) -> Result<Option<String>> {
        let resp = self
            .http
            .get(url)
            .header("project_id", &self.project_id)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("read body {url}"))?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            anyhow::bail!("GET {url} http status={} body={text}", status.as_u16());
        }
        Ok(Some(text))
    }
}

pub fn parse_address_utxos(text: &str) -> Result<Vec<Utxo>> {
    let rows: Vec<AddressUtxo> =
        serde_json::from_str(text).context("parse blockfrost address utxos")?;
    Ok(rows
        .into_iter()
        .map(|r| Utxo {
            input: TxInput {
                tx_hash: r.tx_hash,
                output_index: r.output_index,
            },
            output: TxOutput {
                address: r.address,
                amount: r.amount,
                plutus_data: r.inline_datum,
                data_hash: r.data_hash,
            },
        })
        .collect())
}

pub fn parse_tx_outputs(text: &str) -> Result<Vec<Utxo>> {
    let tx: TxUtxos = serde_json::from_str(text).context("parse blockfrost tx utxos")?;
    let hash = tx.hash;
    Ok(tx
        .outputs
        .into_iter()
        .filter(|o| !o.collateral && o.consumed_by_tx.is_none())
        .map(|o| Utxo {
            input: TxInput {
                tx_hash: hash.clone(),
                output_index: o.output_index,
            },
            output: TxOutput {
                address: o.address,
                amount: o.amount,
                plutus_data: o.inline_datum,
                data_hash: o.data_hash,
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_address_utxos() {
        let text = r#"[{
            "address": "addr_test1qz",
            "tx_hash": "aa",
            "output_index": 1,
            "amount": [{"unit": "lovelace", "quantity": "5000000"}],
            "block": "bb",
            "data_hash": null,
            "inline_datum": null,
            "reference_script_hash": null
        }]"#;
        let utxos = parse_address_utxos(text).unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].input.tx_hash, "aa");
        assert_eq!(utxos[0].input.output_index, 1);
        assert_eq!(utxos[0].output.amount[0].quantity, "5000000");
    }

    #[test]
    fn tx_outputs_skip_spent_and_collateral() {
        let text = r#"{
            "hash": "cc",
            "inputs": [],
            "outputs": [
                {"address": "addr_test1wr", "output_index": 0, "amount": [], "data_hash": "dd", "inline_datum": "d87980", "collateral": false, "reference_script_hash": null, "consumed_by_tx": null},
                {"address": "addr_test1wr", "output_index": 1, "amount": [], "data_hash": null, "inline_datum": null, "collateral": false, "consumed_by_tx": "ee"},
                {"address": "addr_test1qz", "output_index": 2, "amount": [], "data_hash": null, "inline_datum": null, "collateral": true}
            ]
        }"#;
        let utxos = parse_tx_outputs(text).unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].input.tx_hash, "cc");
        assert_eq!(utxos[0].output.plutus_data.as_deref(), Some("d87980"));
    }
}
