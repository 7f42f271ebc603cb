//! Wallet mirror store — the lagging local cache of custodian balances.
//!
//! The custodian is the sole source of truth; reconciliation overwrites
//! the mirror with custodian values and stamps `last_reconciled_at`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use openescrow_types::WalletMirror;

/// Per-currency balance mirror.
#[derive(Default)]
pub struct WalletMirrorStore {
    mirrors: HashMap<String, WalletMirror>,
}

impl WalletMirrorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, currency: &str) -> Option<WalletMirror> {
        self.mirrors.get(currency).cloned()
    }

    /// Overwrite (or create) the mirror with the custodian's value.
    pub fn overwrite(&mut self, currency: &str, balance: Decimal, reconciled_at: DateTime<Utc>) {
        let entry = self
            .mirrors
            .entry(currency.to_string())
            .or_insert_with(|| WalletMirror::new(currency, balance));
        entry.balance = balance;
        entry.last_reconciled_at = Some(reconciled_at);
    }

    /// Seed a mirror value without a reconciliation stamp (live bookkeeping).
    pub fn set_unreconciled(&mut self, currency: &str, balance: Decimal) {
        self.mirrors
            .insert(currency.to_string(), WalletMirror::new(currency, balance));
    }

    #[must_use]
    pub fn all(&self) -> Vec<WalletMirror> {
        let mut out: Vec<WalletMirror> = self.mirrors.values().cloned().collect();
        out.sort_by(|a, b| a.currency.cmp(&b.currency));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_stamps_reconciliation_time() {
        let mut store = WalletMirrorStore::new();
        store.set_unreconciled("BTC", Decimal::new(123, 1));
        assert!(store.get("BTC").unwrap().last_reconciled_at.is_none());

        let now = Utc::now();
        store.overwrite("BTC", Decimal::new(125, 1), now);
        let mirror = store.get("BTC").unwrap();
        assert_eq!(mirror.balance, Decimal::new(125, 1));
        assert_eq!(mirror.last_reconciled_at, Some(now));
    }
}
