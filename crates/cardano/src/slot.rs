use anyhow::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Preprod,
}

impl Network {
    /// Parses the network names used in the service database (`MAINNET` / `PREPROD`).
    pub fn parse(v: &str) -> Result<Self> {
        match v.trim().to_ascii_uppercase().as_str() {
            "MAINNET" => Ok(Self::Mainnet),
            "PREPROD" => Ok(Self::Preprod),
            other => anyhow::bail!("unknown cardano network: {other}"),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Preprod => "preprod",
        }
    }

    pub const fn is_testnet(self) -> bool {
        matches!(self, Self::Preprod)
    }

    pub const fn slot_config(self) -> SlotConfig {
        match self {
            Self::Mainnet => SlotConfig {
                zero_time_ms: 1_596_059_091_000,
                zero_slot: 4_492_800,
                slot_length_ms: 1000,
            },
            Self::Preprod => SlotConfig {
                zero_time_ms: 1_655_769_600_000,
                zero_slot: 86_400,
                slot_length_ms: 1000,
            },
        }
    }

    pub const fn blockfrost_base_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://cardano-mainnet.blockfrost.io/api/v0",
            Self::Preprod => "https://cardano-preprod.blockfrost.io/api/v0",
        }
    }

    pub fn explorer_tx_url(self, tx_hash: &str) -> String {
        let prefix = if self.is_testnet() { "preprod." } else { "" };
        format!("https://{prefix}cardanoscan.io/transaction/{tx_hash}")
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shelley-era slot timing for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotConfig {
    pub zero_time_ms: i64,
    pub zero_slot: u64,
    pub slot_length_ms: u64,
}

/// Returns the slot containing `unix_time_ms`. Times before the era start clamp to `zero_slot`.
pub fn unix_time_to_enclosing_slot(unix_time_ms: i64, cfg: SlotConfig) -> u64 {
    let elapsed = unix_time_ms.saturating_sub(cfg.zero_time_ms).max(0);
    let slot_length = i64::try_from(cfg.slot_length_ms.max(1)).unwrap_or(i64::MAX);
    let slots = u64::try_from(elapsed / slot_length).unwrap_or(0);
    cfg.zero_slot.saturating_add(slots)
}

/// Transaction validity interval in slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub invalid_before: u64,
    pub invalid_hereafter: u64,
}

impl ValidityWindow {
    /// `now ± tolerance`, widened by one slot on each side so node clock skew
    /// does not reject a freshly built transaction.
    pub fn around(now_ms: i64, tolerance_ms: i64, cfg: SlotConfig) -> Self {
        let lower = unix_time_to_enclosing_slot(now_ms.saturating_sub(tolerance_ms), cfg);
        let upper = unix_time_to_enclosing_slot(now_ms.saturating_add(tolerance_ms), cfg);
        Self {
            invalid_before: lower.saturating_sub(1),
            invalid_hereafter: upper.saturating_add(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_at_era_start_is_zero_slot() {
        let cfg = Network::Mainnet.slot_config();
        assert_eq!(unix_time_to_enclosing_slot(cfg.zero_time_ms, cfg), 4_492_800);
        assert_eq!(
            unix_time_to_enclosing_slot(cfg.zero_time_ms + 1_999, cfg),
            4_492_801
        );
        assert_eq!(unix_time_to_enclosing_slot(0, cfg), 4_492_800);
    }

    #[test]
    fn preprod_slot_tracks_seconds() {
        let cfg = Network::Preprod.slot_config();
        let t = cfg.zero_time_ms + 3_600_000;
        assert_eq!(unix_time_to_enclosing_slot(t, cfg), 86_400 + 3_600);
    }

    #[test]
    fn validity_window_spans_tolerance_plus_one_slot() {
        let cfg = Network::Preprod.slot_config();
        let now = cfg.zero_time_ms + 1_000_000;
        let w = ValidityWindow::around(now, 150_000, cfg);
        assert_eq!(w.invalid_before, 86_400 + 850 - 1);
        assert_eq!(w.invalid_hereafter, 86_400 + 1_150 + 1);
    }

    #[test]
    fn parses_db_network_names() {
        assert_eq!(Network::parse("MAINNET").unwrap(), Network::Mainnet);
        assert_eq!(Network::parse("preprod").unwrap(), Network::Preprod);
        assert!(Network::parse("PREVIEW").is_err());
    }

    #[test]
    fn explorer_url_uses_preprod_subdomain_on_testnet() {
        assert_eq!(
            Network::Preprod.explorer_tx_url("ab"),
            "https://preprod.cardanoscan.io/transaction/ab"
        );
        assert_eq!(
            Network::Mainnet.explorer_tx_url("ab"),
            "https://cardanoscan.io/transaction/ab"
        );
    }
}
