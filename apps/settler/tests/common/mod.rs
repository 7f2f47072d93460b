#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use cardano::{Asset, Network, SignedTx, TxInput, TxOutput, TxPlan, UnsignedTx, Utxo};
use settler::config::JobConfig;
use settler::datum::{DatumTiming, EscrowDatum};
use settler::metrics::SettlerTelemetry;
use settler::runner::Settler;
use settler::secrets::{Mnemonic, SecretBox};
use settler::store::{EligibleRow, HandlerRow, SettlementStore, group_by_network, wallets_to_lock};
use settler::types::{
    EligibleRequest, ErrorType, LockedBatch, NetworkContext, PaymentStatus, WalletRef,
};
use settler::wallet::{ChainQuery, SettlementWallet, WalletConnector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ENCRYPTION_KEY: &str = "test-encryption-key-of-sufficient-length";
pub const CONTRACT: &str = "addr_test1wzcontract";

#[derive(Debug, Clone)]
pub struct StoredRequest {
    pub handler_id: i64,
    pub id: i64,
    pub identifier: String,
    pub status: PaymentStatus,
    pub result_hash: Option<String>,
    pub tx_hash: Option<String>,
    pub potential_tx_hash: Option<String>,
    pub error_type: Option<ErrorType>,
    pub error_retries: i32,
    pub error_note: Option<String>,
    pub error_requires_manual_review: bool,
    pub submit_result_time: i64,
    pub wallet_id: i64,
}

#[derive(Default)]
pub struct MemState {
    pub handlers: Vec<HandlerRow>,
    pub wallets: HashMap<i64, WalletRef>,
    pub requests: Vec<StoredRequest>,
    /// wallet id -> attached tx hash
    pub pending: HashMap<i64, Option<String>>,
}

/// In-memory store with the same eligibility and locking rules as Postgres.
#[derive(Default)]
pub struct MemStore {
    pub state: Mutex<MemState>,
    pub lock_delay: Option<Duration>,
    pub fail_lock: AtomicBool,
    pub fail_record_submitted: AtomicBool,
    active_locks: AtomicUsize,
    pub max_concurrent_locks: AtomicUsize,
    pub lock_calls: AtomicUsize,
}

impl MemStore {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            lock_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn add_handler(&self, id: i64, network: &str, max_retries: i32) {
        self.state.lock().unwrap().handlers.push(HandlerRow {
            id,
            network: network.to_string(),
            rpc_api_key: "project".to_string(),
            max_retries,
            contract_address: CONTRACT.to_string(),
            script_cbor: "590abc".to_string(),
        });
    }

    /// Registers a wallet whose secret decrypts to `wallet-{id}`.
    pub fn add_wallet(&self, id: i64) {
        let sealed = SecretBox::new(ENCRYPTION_KEY)
            .encrypt(&format!("wallet-{id}"))
            .unwrap();
        self.state.lock().unwrap().wallets.insert(
            id,
            WalletRef {
                id,
                vkey: hex::encode([id as u8; 28]),
                encrypted_secret: sealed,
            },
        );
    }

    pub fn add_request(&self, handler_id: i64, id: i64, wallet_id: i64, error_retries: i32) {
        self.state.lock().unwrap().requests.push(StoredRequest {
            handler_id,
            id,
            identifier: format!("job-{id}"),
            status: PaymentStatus::PaymentConfirmed,
            result_hash: Some(hex::encode([0xcd; 32])),
            tx_hash: Some(escrow_tx(id)),
            potential_tx_hash: None,
            error_type: None,
            error_retries,
            error_note: None,
            error_requires_manual_review: false,
            submit_result_time: 1_000,
            wallet_id,
        });
    }

    pub fn request(&self, id: i64) -> StoredRequest {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .unwrap()
    }

    pub fn pending(&self, wallet_id: i64) -> Option<Option<String>> {
        self.state.lock().unwrap().pending.get(&wallet_id).cloned()
    }

    pub fn clear_lock(&self, wallet_id: i64) {
        self.state.lock().unwrap().pending.remove(&wallet_id);
    }

    fn select_and_lock(&self, cutoff_ms: i64) -> Result<LockedBatch> {
        let mut st = self.state.lock().unwrap();
        let mut rows = Vec::new();
        for r in &st.requests {
            let eligible = r.status.is_submittable()
                && r.result_hash.is_some()
                && r.error_type.is_none()
                && r.submit_result_time <= cutoff_ms
                && !st.pending.contains_key(&r.wallet_id);
            if !eligible {
                continue;
            }
            let handler = st
                .handlers
                .iter()
                .find(|h| h.id == r.handler_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("missing handler {}", r.handler_id))?;
            let wallet = st
                .wallets
                .get(&r.wallet_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("missing wallet {}", r.wallet_id))?;
            rows.push(EligibleRow {
                handler,
                request: EligibleRequest {
                    id: r.id,
                    identifier: r.identifier.clone(),
                    result_hash: r.result_hash.clone().unwrap_or_default(),
                    tx_hash: r.tx_hash.clone(),
                    error_retries: r.error_retries,
                    buyer_vkey: Some(hex::encode([0xbb; 28])),
                    wallet,
                },
            });
        }

        let (networks, misconfigured) = group_by_network(rows);
        let locked_wallets = wallets_to_lock(&networks);
        if let Some(w) = locked_wallets.iter().find(|w| st.pending.contains_key(w)) {
            anyhow::bail!("duplicate key: pending transaction for wallet {w}");
        }
        for w in &locked_wallets {
            st.pending.insert(*w, None);
        }
        Ok(LockedBatch {
            networks,
            misconfigured,
            locked_wallets,
        })
    }

    fn update<F: FnOnce(&mut StoredRequest)>(&self, id: i64, f: F) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        let r = st
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("request {id} not found"))?;
        f(r);
        Ok(())
    }
}

#[async_trait]
impl SettlementStore for MemStore {
    async fn lock_eligible(&self, cutoff_ms: i64) -> Result<LockedBatch> {
        self.lock_calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active_locks.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_locks
            .fetch_max(now_active, Ordering::SeqCst);
        if let Some(d) = self.lock_delay {
            tokio::time::sleep(d).await;
        }
        let res = if self.fail_lock.load(Ordering::SeqCst) {
            Err(anyhow::anyhow!("could not serialize access"))
        } else {
            self.select_and_lock(cutoff_ms)
        };
        self.active_locks.fetch_sub(1, Ordering::SeqCst);
        res
    }

    async fn record_submitted(&self, request_id: i64, wallet_id: i64, tx_hash: &str) -> Result<()> {
        if self.fail_record_submitted.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset");
        }
        let mut st = self.state.lock().unwrap();
        match st.pending.get(&wallet_id) {
            Some(None) => {}
            _ => anyhow::bail!("wallet {wallet_id} has no open pending transaction"),
        }
        let r = st
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| anyhow::anyhow!("request {request_id} not found"))?;
        r.potential_tx_hash = Some(tx_hash.to_string());
        r.status = PaymentStatus::CompletedInitiated;
        st.pending.insert(wallet_id, Some(tx_hash.to_string()));
        Ok(())
    }

    async fn record_retry(&self, request_id: i64) -> Result<()> {
        self.update(request_id, |r| {
            if r.error_type.is_none() {
                r.error_retries += 1;
            }
        })
    }

    async fn record_escalation(&self, request_id: i64, note: &str) -> Result<()> {
        self.update(request_id, |r| {
            if r.error_type.is_none() {
                r.error_type = Some(ErrorType::Unknown);
                r.error_requires_manual_review = true;
                r.error_note = Some(note.to_string());
            }
        })
    }
}

pub fn escrow_tx(request_id: i64) -> String {
    format!("{:064x}", request_id)
}

pub fn escrow_datum() -> EscrowDatum {
    EscrowDatum {
        buyer: vec![0xbb; 28],
        seller: vec![0x01; 28],
        identifier: b"job".to_vec(),
        result_hash: Vec::new(),
        timing: DatumTiming {
            submit_result_time: 1_000,
            unlock_time: 1_001,
            refund_time: 1_002,
        },
        refund_requested: false,
        refund_denied: false,
    }
}

pub fn escrow_utxo(tx_hash: &str, datum_hex: Option<String>) -> Utxo {
    Utxo {
        input: TxInput {
            tx_hash: tx_hash.to_string(),
            output_index: 0,
        },
        output: TxOutput {
            address: CONTRACT.to_string(),
            amount: vec![Asset {
                unit: "lovelace".to_string(),
                quantity: "10000000".to_string(),
            }],
            plutus_data: datum_hex,
            data_hash: None,
        },
    }
}

pub fn funding_utxo(n: u32) -> Utxo {
    Utxo {
        input: TxInput {
            tx_hash: format!("{:064x}", 0xf000 + n),
            output_index: n,
        },
        output: TxOutput {
            address: "addr_test1qfunding".to_string(),
            amount: vec![Asset {
                unit: "lovelace".to_string(),
                quantity: "50000000".to_string(),
            }],
            plutus_data: None,
            data_hash: None,
        },
    }
}

/// Chain + wallet fake. Wallets are keyed by their decrypted mnemonic.
#[derive(Default)]
pub struct FakeChain {
    pub tx_outputs: Mutex<HashMap<String, Vec<Utxo>>>,
    pub wallet_utxos: Mutex<HashMap<String, Vec<Utxo>>>,
    pub failing_submit: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<(String, TxPlan)>>,
}

impl FakeChain {
    pub fn with_escrow(&self, request_id: i64) {
        let tx = escrow_tx(request_id);
        let datum = escrow_datum().encode().unwrap();
        self.tx_outputs
            .lock()
            .unwrap()
            .insert(tx.clone(), vec![escrow_utxo(&tx, Some(datum))]);
    }

    pub fn fund(&self, wallet_id: i64) {
        self.wallet_utxos
            .lock()
            .unwrap()
            .insert(format!("wallet-{wallet_id}"), vec![funding_utxo(wallet_id as u32)]);
    }

    pub fn submissions(&self) -> Vec<(String, TxPlan)> {
        self.submitted.lock().unwrap().clone()
    }
}

pub struct FakeConnector(pub Arc<FakeChain>);

struct FakeChainQuery(Arc<FakeChain>);

#[async_trait]
impl ChainQuery for FakeChainQuery {
    async fn tx_outputs(&self, tx_hash: &str) -> Result<Vec<Utxo>> {
        Ok(self
            .0
            .tx_outputs
            .lock()
            .unwrap()
            .get(tx_hash)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct FakeWallet {
    chain: Arc<FakeChain>,
    name: String,
}

#[async_trait]
impl SettlementWallet for FakeWallet {
    async fn change_address(&self) -> Result<String> {
        Ok(format!("addr_test1q-{}", self.name))
    }

    async fn utxos(&self) -> Result<Vec<Utxo>> {
        Ok(self
            .chain
            .wallet_utxos
            .lock()
            .unwrap()
            .get(&self.name)
            .cloned()
            .unwrap_or_default())
    }

    async fn build(&self, plan: &TxPlan, _utxos: &[Utxo]) -> Result<UnsignedTx> {
        self.chain
            .submitted
            .lock()
            .unwrap()
            .push((self.name.clone(), plan.clone()));
        Ok(UnsignedTx(format!("unsigned-{}", self.name)))
    }

    async fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx> {
        Ok(SignedTx(tx.0.replace("unsigned", "signed")))
    }

    async fn submit(&self, _tx: &SignedTx) -> Result<String> {
        if self.chain.failing_submit.lock().unwrap().contains(&self.name) {
            anyhow::bail!("node rejected transaction");
        }
        Ok(format!("tx-{}", self.name))
    }
}

impl WalletConnector for FakeConnector {
    fn chain(&self, _ctx: &NetworkContext) -> Arc<dyn ChainQuery> {
        Arc::new(FakeChainQuery(Arc::clone(&self.0)))
    }

    fn open(&self, _ctx: &NetworkContext, mnemonic: Mnemonic) -> Box<dyn SettlementWallet> {
        Box::new(FakeWallet {
            chain: Arc::clone(&self.0),
            name: mnemonic.phrase().to_string(),
        })
    }
}

pub fn settler(store: Arc<MemStore>, chain: Arc<FakeChain>) -> Settler {
    Settler::new(
        store,
        Arc::new(FakeConnector(chain)),
        SecretBox::new(ENCRYPTION_KEY),
        JobConfig::default(),
        SettlerTelemetry::new(),
    )
}

pub fn preprod_ctx() -> NetworkContext {
    NetworkContext {
        id: 1,
        network: Network::Preprod,
        rpc_api_key: "project".to_string(),
        max_retries: 5,
        contract_address: CONTRACT.to_string(),
        script_cbor: "590abc".to_string(),
    }
}

/// A clock well past every test deadline.
pub const NOW_MS: i64 = 1_700_000_000_000;
