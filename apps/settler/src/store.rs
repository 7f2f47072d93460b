use crate::types::{EligibleRequest, LockedBatch, MisconfiguredNetwork, NetworkBatch, NetworkContext};
use anyhow::Result;
use async_trait::async_trait;
use cardano::Network;
use std::collections::HashMap;

/// Persistence seam for the settlement runner.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Selects every eligible request with `submit_result_time <= cutoff_ms` and,
    /// in the same serializable transaction, locks each wallet they reference.
    async fn lock_eligible(&self, cutoff_ms: i64) -> Result<LockedBatch>;

    /// Advances the request to `CompletedInitiated` and attaches `tx_hash` to
    /// the wallet's pending transaction, atomically.
    async fn record_submitted(&self, request_id: i64, wallet_id: i64, tx_hash: &str) -> Result<()>;

    async fn record_retry(&self, request_id: i64) -> Result<()>;

    async fn record_escalation(&self, request_id: i64, note: &str) -> Result<()>;
}

/// Network handler columns as read from the store, before the network name is validated.
#[derive(Debug, Clone)]
pub struct HandlerRow {
    pub id: i64,
    pub network: String,
    pub rpc_api_key: String,
    pub max_retries: i32,
    pub contract_address: String,
    pub script_cbor: String,
}

#[derive(Debug, Clone)]
pub struct EligibleRow {
    pub handler: HandlerRow,
    pub request: EligibleRequest,
}

/// Groups rows by network handler, keeping first-seen order for handlers and
/// selection order within each handler.
pub fn group_by_network(rows: Vec<EligibleRow>) -> (Vec<NetworkBatch>, Vec<MisconfiguredNetwork>) {
    let mut order: Vec<(HandlerRow, Vec<EligibleRequest>)> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();
    for row in rows {
        let i = *index.entry(row.handler.id).or_insert_with(|| {
            order.push((row.handler.clone(), Vec::new()));
            order.len() - 1
        });
        order[i].1.push(row.request);
    }

    let mut batches = Vec::new();
    let mut misconfigured = Vec::new();
    for (handler, requests) in order {
        match Network::parse(&handler.network) {
            Ok(network) => batches.push(NetworkBatch {
                ctx: NetworkContext {
                    id: handler.id,
                    network,
                    rpc_api_key: handler.rpc_api_key,
                    max_retries: handler.max_retries,
                    contract_address: handler.contract_address,
                    script_cbor: handler.script_cbor,
                },
                requests,
            }),
            Err(_) => misconfigured.push(MisconfiguredNetwork {
                handler_id: handler.id,
                network: handler.network,
                request_count: requests.len(),
            }),
        }
    }
    (batches, misconfigured)
}

/// Distinct wallet ids across all batches, ascending.
pub fn wallets_to_lock(batches: &[NetworkBatch]) -> Vec<i64> {
    let mut ids: Vec<i64> = batches
        .iter()
        .flat_map(|b| b.requests.iter().map(|r| r.wallet.id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WalletRef;

    fn row(handler_id: i64, network: &str, req_id: i64, wallet_id: i64) -> EligibleRow {
        EligibleRow {
            handler: HandlerRow {
                id: handler_id,
                network: network.to_string(),
                rpc_api_key: "key".to_string(),
                max_retries: 5,
                contract_address: "addr_test1w".to_string(),
                script_cbor: "59".to_string(),
            },
            request: EligibleRequest {
                id: req_id,
                identifier: format!("req-{req_id}"),
                result_hash: "aa".to_string(),
                tx_hash: Some("bb".to_string()),
                error_retries: 0,
                buyer_vkey: None,
                wallet: WalletRef {
                    id: wallet_id,
                    vkey: "cc".to_string(),
                    encrypted_secret: "00".to_string(),
                },
            },
        }
    }

    #[test]
    fn groups_preserve_selection_order() {
        let (batches, bad) = group_by_network(vec![
            row(2, "PREPROD", 10, 1),
            row(1, "MAINNET", 11, 2),
            row(2, "PREPROD", 12, 3),
        ]);
        assert!(bad.is_empty());
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].ctx.id, 2);
        let ids: Vec<i64> = batches[0].requests.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 12]);
        assert_eq!(batches[1].ctx.network, Network::Mainnet);
    }

    #[test]
    fn unknown_network_is_reported_not_batched() {
        let (batches, bad) = group_by_network(vec![
            row(1, "PREPROD", 10, 1),
            row(3, "PREVIEW", 11, 2),
            row(3, "PREVIEW", 12, 2),
        ]);
        assert_eq!(batches.len(), 1);
        assert_eq!(
            bad,
            vec![MisconfiguredNetwork {
                handler_id: 3,
                network: "PREVIEW".to_string(),
                request_count: 2,
            }]
        );
        assert_eq!(wallets_to_lock(&batches), vec![1]);
    }

    #[test]
    fn locks_each_wallet_once_before_dedup() {
        let (batches, _) = group_by_network(vec![
            row(1, "PREPROD", 10, 7),
            row(1, "PREPROD", 11, 7),
            row(1, "PREPROD", 12, 3),
        ]);
        assert_eq!(wallets_to_lock(&batches), vec![3, 7]);
    }
}
