//! Batch settler that submits "submit result" transactions against the
//! Cardano escrow contract for payment requests past their result deadline.

pub mod config;
pub mod datum;
pub mod db;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod secrets;
pub mod store;
pub mod types;
pub mod wallet;

pub use error::{RequestError, SettleError};
pub use runner::{RunOutcome, RunReport, Settler};
