//! Configuration types for the OpenEscrow platform.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountRef, constants};

/// Platform-wide settings shared by the lifecycle services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Fiat currency all order prices and windows are denominated in.
    pub fiat_currency: String,
    /// Custodian sub-account holding all escrowed funds.
    pub escrow_wallet: AccountRef,
    /// Payment window granted to buyers, in minutes.
    pub payment_window_minutes: i64,
    /// How long a timed-out transfer may stay unverified before
    /// reconciliation compensates it, in minutes.
    pub verification_window_minutes: i64,
    /// Interval between expiry-sweep runs, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            fiat_currency: constants::DEFAULT_FIAT_CURRENCY.to_string(),
            escrow_wallet: AccountRef::new(constants::DEFAULT_ESCROW_WALLET),
            payment_window_minutes: constants::DEFAULT_PAYMENT_WINDOW_MINUTES,
            verification_window_minutes: constants::DEFAULT_VERIFICATION_WINDOW_MINUTES,
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Custodian REST client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodianConfig {
    pub base_url: String,
    pub bearer_token: String,
    /// Per-call RPC timeout, in milliseconds. Timeouts surface as
    /// outcome-unknown errors, never as success or failure.
    pub timeout_ms: u64,
}

impl Default for CustodianConfig {
    fn default() -> Self {
        Self {
            base_url: "https://custodian.example.com/api/v1".to_string(),
            bearer_token: String::new(),
            timeout_ms: constants::DEFAULT_CUSTODIAN_TIMEOUT_MS,
        }
    }
}

/// Monitoring detector thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorThresholds {
    /// Transactions at or above this amount raise a LARGE_TRANSACTION alert.
    pub large_transaction: Decimal,
    /// Escrow-wallet balances at or below this raise a LOW_BALANCE alert.
    pub low_balance: Decimal,
    /// Per-currency daily volume at or above this raises HIGH_DAILY_VOLUME.
    pub high_daily_volume: Decimal,
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self {
            large_transaction: Decimal::new(10_000, 0),
            low_balance: Decimal::new(100, 0),
            high_daily_volume: Decimal::new(100_000, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_defaults() {
        let cfg = PlatformConfig::default();
        assert_eq!(cfg.payment_window_minutes, 30);
        assert_eq!(cfg.fiat_currency, "NGN");
        assert_eq!(cfg.escrow_wallet.as_str(), "platform_escrow");
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = MonitorThresholds::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: MonitorThresholds = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.large_transaction, back.large_transaction);
    }
}
