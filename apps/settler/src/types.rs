use cardano::Network;

/// Only network handlers of this payment type are settled.
pub const PAYMENT_TYPE_CARDANO_V1: &str = "WEB3_CARDANO_V1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    PaymentRequested,
    PaymentConfirmed,
    PaymentInvalid,
    RefundRequested,
    RefundInitiated,
    Refunded,
    WithdrawInitiated,
    Withdrawn,
    Disputed,
    CompletedInitiated,
    CompletedConfirmed,
}

impl PaymentStatus {
    /// Statuses from which a result may be submitted.
    pub const SUBMITTABLE: [PaymentStatus; 2] = [Self::PaymentConfirmed, Self::RefundRequested];

    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::PaymentRequested => "PaymentRequested",
            Self::PaymentConfirmed => "PaymentConfirmed",
            Self::PaymentInvalid => "PaymentInvalid",
            Self::RefundRequested => "RefundRequested",
            Self::RefundInitiated => "RefundInitiated",
            Self::Refunded => "Refunded",
            Self::WithdrawInitiated => "WithdrawInitiated",
            Self::Withdrawn => "Withdrawn",
            Self::Disputed => "Disputed",
            Self::CompletedInitiated => "CompletedInitiated",
            Self::CompletedConfirmed => "CompletedConfirmed",
        }
    }

    pub fn is_submittable(self) -> bool {
        Self::SUBMITTABLE.contains(&self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Unknown,
}

impl ErrorType {
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// One configured Cardano deployment of the escrow contract.
#[derive(Debug, Clone)]
pub struct NetworkContext {
    pub id: i64,
    pub network: Network,
    /// Blockfrost project id.
    pub rpc_api_key: String,
    pub max_retries: i32,
    pub contract_address: String,
    pub script_cbor: String,
}

#[derive(Clone)]
pub struct WalletRef {
    pub id: i64,
    pub vkey: String,
    pub encrypted_secret: String,
}

impl std::fmt::Debug for WalletRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletRef")
            .field("id", &self.id)
            .field("vkey", &self.vkey)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct EligibleRequest {
    pub id: i64,
    pub identifier: String,
    pub result_hash: String,
    /// Transaction that created the escrow output.
    pub tx_hash: Option<String>,
    pub error_retries: i32,
    pub buyer_vkey: Option<String>,
    pub wallet: WalletRef,
}

#[derive(Debug, Clone)]
pub struct NetworkBatch {
    pub ctx: NetworkContext,
    pub requests: Vec<EligibleRequest>,
}

/// A network handler whose `network` column is not a supported Cardano network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisconfiguredNetwork {
    pub handler_id: i64,
    pub network: String,
    pub request_count: usize,
}

/// Result of one eligibility-and-lock transaction.
#[derive(Debug, Clone, Default)]
pub struct LockedBatch {
    pub networks: Vec<NetworkBatch>,
    pub misconfigured: Vec<MisconfiguredNetwork>,
    pub locked_wallets: Vec<i64>,
}

impl LockedBatch {
    pub fn request_count(&self) -> usize {
        self.networks.iter().map(|n| n.requests.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_names_match_stored_values() {
        assert_eq!(PaymentStatus::PaymentConfirmed.as_db_str(), "PaymentConfirmed");
        assert_eq!(PaymentStatus::RefundRequested.as_db_str(), "RefundRequested");
        assert_eq!(PaymentStatus::CompletedInitiated.as_db_str(), "CompletedInitiated");
        assert_eq!(ErrorType::Unknown.as_db_str(), "UNKNOWN");
    }

    #[test]
    fn only_confirmed_and_refund_requested_are_submittable() {
        assert!(PaymentStatus::PaymentConfirmed.is_submittable());
        assert!(PaymentStatus::RefundRequested.is_submittable());
        assert!(!PaymentStatus::CompletedInitiated.is_submittable());
        assert!(!PaymentStatus::Disputed.is_submittable());
    }

    #[test]
    fn wallet_debug_hides_secret() {
        let w = WalletRef {
            id: 1,
            vkey: "aa".to_string(),
            encrypted_secret: "deadbeef".to_string(),
        };
        assert!(!format!("{w:?}").contains("deadbeef"));
    }
}
