//! Local transaction log — mirror of the custodian's transaction feed,
//! keyed by the custodian-assigned external id.
//!
//! `insert_if_absent` makes reconciliation backfill idempotent: re-reading
//! a window after a partial failure re-inserts nothing.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use openescrow_types::{ExternalTransaction, TransferId};

/// Append-mostly log of custodian ledger rows.
#[derive(Default)]
pub struct TransactionLog {
    by_id: HashMap<TransferId, ExternalTransaction>,
}

impl TransactionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless a row with the same external id exists.
    /// Returns whether the row was inserted.
    pub fn insert_if_absent(&mut self, tx: ExternalTransaction) -> bool {
        if self.by_id.contains_key(&tx.external_id) {
            return false;
        }
        self.by_id.insert(tx.external_id.clone(), tx);
        true
    }

    #[must_use]
    pub fn contains(&self, external_id: &TransferId) -> bool {
        self.by_id.contains_key(external_id)
    }

    #[must_use]
    pub fn get(&self, external_id: &TransferId) -> Option<ExternalTransaction> {
        self.by_id.get(external_id).cloned()
    }

    /// First row whose note contains `fragment`. Used by reconciliation to
    /// correlate a timed-out transfer back to its escrow client reference.
    #[must_use]
    pub fn find_by_note(&self, fragment: &str) -> Option<ExternalTransaction> {
        self.by_id
            .values()
            .find(|tx| tx.note.as_deref().is_some_and(|n| n.contains(fragment)))
            .cloned()
    }

    /// Rows no detector has fired for yet.
    #[must_use]
    pub fn unalerted(&self) -> Vec<ExternalTransaction> {
        self.by_id.values().filter(|tx| !tx.is_alerted).cloned().collect()
    }

    /// Mark a row as consumed by a detector (idempotency for monitoring).
    pub fn mark_alerted(&mut self, external_id: &TransferId) {
        if let Some(tx) = self.by_id.get_mut(external_id) {
            tx.is_alerted = true;
        }
    }

    /// Distinct currencies seen in the log, sorted.
    #[must_use]
    pub fn currencies(&self) -> Vec<String> {
        let mut out: Vec<String> = self.by_id.values().map(|tx| tx.currency.clone()).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Total volume for a currency over the 24h window ending at `now`.
    #[must_use]
    pub fn daily_volume(&self, currency: &str, now: DateTime<Utc>) -> Decimal {
        let window_start = now - Duration::hours(24);
        self.by_id
            .values()
            .filter(|tx| tx.currency == currency && tx.occurred_at > window_start)
            .map(|tx| tx.amount)
            .sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openescrow_types::TransactionKind;

    fn tx(id: &str, currency: &str, amount: Decimal, note: Option<&str>) -> ExternalTransaction {
        ExternalTransaction {
            external_id: TransferId::new(id),
            currency: currency.to_string(),
            amount,
            kind: TransactionKind::Credit,
            note: note.map(str::to_string),
            occurred_at: Utc::now(),
            is_alerted: false,
        }
    }

    #[test]
    fn insert_is_idempotent_by_external_id() {
        let mut log = TransactionLog::new();
        assert!(log.insert_if_absent(tx("t1", "USDT", Decimal::ONE, None)));
        assert!(!log.insert_if_absent(tx("t1", "USDT", Decimal::ONE, None)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn find_by_note_fragment() {
        let mut log = TransactionLog::new();
        log.insert_if_absent(tx("t1", "USDT", Decimal::ONE, Some("escrow:abc:lock")));
        log.insert_if_absent(tx("t2", "USDT", Decimal::ONE, None));

        assert!(log.find_by_note("escrow:abc:lock").is_some());
        assert!(log.find_by_note("escrow:zzz").is_none());
    }

    #[test]
    fn alert_marking() {
        let mut log = TransactionLog::new();
        let id = TransferId::new("t1");
        log.insert_if_absent(tx("t1", "USDT", Decimal::ONE, None));
        assert_eq!(log.unalerted().len(), 1);

        log.mark_alerted(&id);
        assert!(log.unalerted().is_empty());
    }

    #[test]
    fn daily_volume_window() {
        let mut log = TransactionLog::new();
        let now = Utc::now();
        log.insert_if_absent(tx("t1", "USDT", Decimal::new(40, 0), None));
        log.insert_if_absent(tx("t2", "USDT", Decimal::new(60, 0), None));
        log.insert_if_absent(tx("t3", "BTC", Decimal::ONE, None));
        let mut old = tx("t4", "USDT", Decimal::new(999, 0), None);
        old.occurred_at = now - Duration::hours(25);
        log.insert_if_absent(old);

        assert_eq!(log.daily_volume("USDT", now), Decimal::new(100, 0));
    }
}
