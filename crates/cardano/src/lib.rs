pub mod blockfrost;
pub mod plutus;
pub mod signer;
pub mod slot;
pub mod types;

pub use blockfrost::BlockfrostClient;
pub use plutus::{PlutusData, PlutusError};
pub use signer::SignerClient;
pub use slot::{Network, SlotConfig, ValidityWindow, unix_time_to_enclosing_slot};
pub use types::{
    Asset, PlannedOutput, ScriptInput, SignedTx, TxInput, TxMetadata, TxOutput, TxPlan,
    UnsignedTx, Utxo,
};
