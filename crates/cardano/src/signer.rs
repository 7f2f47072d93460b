//! Client for the wallet signer sidecar.
//!
//! The sidecar owns transaction balancing, fee calculation and key derivation.
//! Mnemonics are sent per call and never cached on this side.

use crate::slot::Network;
use crate::types::{SignedTx, TxPlan, UnsignedTx, Utxo};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct AddressRequest<'a> {
    network: &'a str,
    mnemonic: Vec<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressResponse {
    unused_addresses: Vec<String>,
}

#[derive(Serialize)]
struct BuildRequest<'a> {
    network: &'a str,
    plan: &'a TxPlan,
    utxos: &'a [Utxo],
}

#[derive(Serialize)]
struct SignRequest<'a> {
    network: &'a str,
    mnemonic: Vec<&'a str>,
    tx: &'a UnsignedTx,
}

#[derive(Deserialize)]
struct TxResponse {
    tx: String,
}

#[derive(Clone)]
pub struct SignerClient {
    http: reqwest::Client,
    base_url: String,
}

impl SignerClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// First unused base address of the HD wallet behind `mnemonic`.
    pub async fn unused_address(&self, network: Network, mnemonic: &str) -> Result<String> {
        let req = AddressRequest {
            network: network.as_str(),
            mnemonic: mnemonic.split_whitespace().collect(),
        };
        let resp: AddressResponse = self.post("/v1/wallet/address", &req).await?;
        resp.unused_addresses
            .into_iter()
            .next()
            .context("signer returned no unused address")
    }

    /// Balances `plan` against the wallet's `utxos` and returns the unwitnessed body.
    pub async fn build(&self, network: Network, plan: &TxPlan, utxos: &[Utxo]) -> Result<UnsignedTx> {
        let req = BuildRequest {
            network: network.as_str(),
            plan,
            utxos,
        };
        let resp: TxResponse = self.post("/v1/tx/build", &req).await?;
        Ok(UnsignedTx(resp.tx))
    }

    pub async fn sign(&self, network: Network, mnemonic: &str, tx: &UnsignedTx) -> Result<SignedTx> {
        let req = SignRequest {
            network: network.as_str(),
            mnemonic: mnemonic.split_whitespace().collect(),
            tx,
        };
        let resp: TxResponse = self.post("/v1/tx/sign", &req).await?;
        Ok(SignedTx(resp.tx))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;
        let status = resp.status();
        let text = resp.text().await.context("read signer response body")?;
        if !status.is_success() {
            anyhow::bail!("signer {path} http status={} body={text}", status.as_u16());
        }
        serde_json::from_str(&text).with_context(|| format!("parse signer {path} response"))
    }
}
