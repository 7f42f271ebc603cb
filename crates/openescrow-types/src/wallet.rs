//! Local mirrors of custodian ledger state.
//!
//! The custodian is the sole source of truth for balances. `WalletMirror`
//! is a lagging cache the reconciliation engine converges toward custodian
//! values with bounded staleness; `ExternalTransaction` rows mirror the
//! custodian's transaction feed, keyed by the custodian-assigned id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TransferId;

/// Cached custodian balance for one currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletMirror {
    pub currency: String,
    pub balance: Decimal,
    pub last_reconciled_at: Option<DateTime<Utc>>,
}

impl WalletMirror {
    #[must_use]
    pub fn new(currency: impl Into<String>, balance: Decimal) -> Self {
        Self {
            currency: currency.into(),
            balance,
            last_reconciled_at: None,
        }
    }
}

/// One detected drift between custodian truth and the local mirror/log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    /// Currency (wallet drift) or external transaction id (log backfill).
    pub subject: String,
    pub custodian_value: Decimal,
    pub local_value: Decimal,
    pub detected_at: DateTime<Utc>,
}

/// Direction of a custodian ledger entry relative to the platform account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credit => write!(f, "CREDIT"),
            Self::Debit => write!(f, "DEBIT"),
        }
    }
}

/// Local copy of one custodian transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTransaction {
    /// Custodian-assigned id; uniqueness key for the local log.
    pub external_id: TransferId,
    pub currency: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    /// Free-form note; platform transfers carry a structured client
    /// reference here (e.g. `escrow:<id>:lock`).
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Set by monitoring once a detector has fired for this row, so
    /// repeated detector runs stay idempotent.
    pub is_alerted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_mirror_never_reconciled() {
        let m = WalletMirror::new("BTC", Decimal::new(123, 1));
        assert_eq!(m.currency, "BTC");
        assert!(m.last_reconciled_at.is_none());
    }

    #[test]
    fn transaction_serde_roundtrip() {
        let tx = ExternalTransaction {
            external_id: TransferId::new("bn_001"),
            currency: "USDT".into(),
            amount: Decimal::new(30, 0),
            kind: TransactionKind::Debit,
            note: Some("escrow:abc:lock".into()),
            occurred_at: Utc::now(),
            is_alerted: false,
        };
        let json = serde_json::to_string(&tx).unwrap();
        let back: ExternalTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.external_id, tx.external_id);
        assert_eq!(back.kind, TransactionKind::Debit);
    }
}
