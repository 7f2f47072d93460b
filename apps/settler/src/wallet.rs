//! Chain and wallet collaborators.
//!
//! The runner only talks to these traits. Production implementations pair a
//! Blockfrost client for reads and submission with the signer sidecar for
//! building and witnessing.

use crate::secrets::Mnemonic;
use crate::types::NetworkContext;
use anyhow::Result;
use async_trait::async_trait;
use cardano::{BlockfrostClient, Network, SignedTx, SignerClient, TxPlan, UnsignedTx, Utxo};
use std::sync::Arc;
use tokio::sync::OnceCell;

#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Unspent outputs created by `tx_hash`.
    async fn tx_outputs(&self, tx_hash: &str) -> Result<Vec<Utxo>>;
}

/// A funded wallet able to build, sign and submit one transaction.
#[async_trait]
pub trait SettlementWallet: Send + Sync {
    /// First unused address. Receives change and is the required signer.
    async fn change_address(&self) -> Result<String>;
    async fn utxos(&self) -> Result<Vec<Utxo>>;
    async fn build(&self, plan: &TxPlan, utxos: &[Utxo]) -> Result<UnsignedTx>;
    async fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx>;
    async fn submit(&self, tx: &SignedTx) -> Result<String>;
}

pub trait WalletConnector: Send + Sync {
    fn chain(&self, ctx: &NetworkContext) -> Arc<dyn ChainQuery>;
    /// Takes ownership of the mnemonic; it is wiped when the wallet is dropped.
    fn open(&self, ctx: &NetworkContext, mnemonic: Mnemonic) -> Box<dyn SettlementWallet>;
}

pub struct BlockfrostChain {
    client: BlockfrostClient,
}

#[async_trait]
impl ChainQuery for BlockfrostChain {
    async fn tx_outputs(&self, tx_hash: &str) -> Result<Vec<Utxo>> {
        self.client.tx_utxos(tx_hash).await
    }
}

#[derive(Clone)]
pub struct SidecarConnector {
    http: reqwest::Client,
    signer: SignerClient,
}

impl SidecarConnector {
    pub fn new(http: reqwest::Client, signer_url: &str) -> Self {
        Self {
            signer: SignerClient::new(http.clone(), signer_url),
            http,
        }
    }

    fn blockfrost(&self, ctx: &NetworkContext) -> BlockfrostClient {
        BlockfrostClient::new(self.http.clone(), ctx.network, &ctx.rpc_api_key)
    }
}

impl WalletConnector for SidecarConnector {
    fn chain(&self, ctx: &NetworkContext) -> Arc<dyn ChainQuery> {
        Arc::new(BlockfrostChain {
            client: self.blockfrost(ctx),
        })
    }

    fn open(&self, ctx: &NetworkContext, mnemonic: Mnemonic) -> Box<dyn SettlementWallet> {
        Box::new(SidecarWallet {
            network: ctx.network,
            blockfrost: self.blockfrost(ctx),
            signer: self.signer.clone(),
            mnemonic,
            address: OnceCell::new(),
        })
    }
}

struct SidecarWallet {
    network: Network,
    blockfrost: BlockfrostClient,
    signer: SignerClient,
    mnemonic: Mnemonic,
    address: OnceCell<String>,
}

#[async_trait]
impl SettlementWallet for SidecarWallet {
    async fn change_address(&self) -> Result<String> {
        let addr = self
            .address
            .get_or_try_init(|| {
                self.signer
                    .unused_address(self.network, self.mnemonic.phrase())
            })
            .await?;
        Ok(addr.clone())
    }

    async fn utxos(&self) -> Result<Vec<Utxo>> {
        let addr = self.change_address().await?;
        self.blockfrost.address_utxos(&addr).await
    }

    async fn build(&self, plan: &TxPlan, utxos: &[Utxo]) -> Result<UnsignedTx> {
        self.signer.build(self.network, plan, utxos).await
    }

    async fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx> {
        self.signer
            .sign(self.network, self.mnemonic.phrase(), tx)
            .await
    }

    async fn submit(&self, tx: &SignedTx) -> Result<String> {
        self.blockfrost.submit_tx(tx).await
    }
}
