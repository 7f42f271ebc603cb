//! Monitoring detectors over the local ledger.
//!
//! Detectors read only local state (the transaction log and the wallet
//! mirror), so a scan never blocks on the custodian. Each detector is
//! idempotent across runs: transaction alerts mark their source rows,
//! balance and volume alerts dedupe against the active alert list.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use openescrow_store::{lock, Ledger};
use openescrow_types::{
    Alert, AlertId, AlertKind, MonitorThresholds, OpenescrowError, Permission, Result, Severity,
    UserId,
};

/// Outcome of one detector scan.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanReport {
    pub large_transactions: usize,
    pub low_balances: usize,
    pub high_volumes: usize,
}

impl ScanReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.large_transactions + self.low_balances + self.high_volumes
    }
}

/// Threshold-based detectors producing [`Alert`] rows.
pub struct Monitor {
    ledger: Arc<Ledger>,
    thresholds: MonitorThresholds,
}

impl Monitor {
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, thresholds: MonitorThresholds) -> Self {
        Self { ledger, thresholds }
    }

    /// Run all detectors once.
    pub fn scan(&self) -> ScanReport {
        ScanReport {
            large_transactions: self.detect_large_transactions(),
            low_balances: self.detect_low_balances(),
            high_volumes: self.detect_high_volumes(),
        }
    }

    /// Unresolved alerts, newest first.
    #[must_use]
    pub fn active_alerts(&self) -> Vec<Alert> {
        lock(&self.ledger.alerts).active()
    }

    /// Close out an alert after investigation.
    ///
    /// # Errors
    /// - `Unauthorized` without the alert-resolution permission
    /// - `StateConflict` if already resolved
    pub fn resolve_alert(&self, alert_id: AlertId, resolved_by: UserId) -> Result<Alert> {
        let role = lock(&self.ledger.roles).resolve_role(resolved_by);
        if !role.has_permission(Permission::ResolveAlerts) {
            return Err(OpenescrowError::Unauthorized {
                reason: format!("role '{}' may not resolve alerts", role.name),
            });
        }
        lock(&self.ledger.alerts).resolve(alert_id, resolved_by)
    }

    fn detect_large_transactions(&self) -> usize {
        let candidates: Vec<_> = lock(&self.ledger.tx_log)
            .unalerted()
            .into_iter()
            .filter(|tx| tx.amount >= self.thresholds.large_transaction)
            .collect();
        let mut raised = 0;
        for tx in candidates {
            lock(&self.ledger.alerts).append(Alert::new(
                AlertKind::LargeTransaction,
                Severity::Warning,
                format!("transaction {} moved {} {}", tx.external_id, tx.amount, tx.currency),
                serde_json::json!({
                    "transfer_id": tx.external_id.to_string(),
                    "currency": tx.currency,
                    "amount": tx.amount.to_string(),
                }),
            ));
            lock(&self.ledger.tx_log).mark_alerted(&tx.external_id);
            raised += 1;
        }
        raised
    }

    fn detect_low_balances(&self) -> usize {
        let mirrors = lock(&self.ledger.wallets).all();
        let mut raised = 0;
        for mirror in mirrors {
            if mirror.balance > self.thresholds.low_balance {
                continue;
            }
            if self.has_active(AlertKind::LowBalance, &mirror.currency) {
                continue;
            }
            lock(&self.ledger.alerts).append(Alert::new(
                AlertKind::LowBalance,
                Severity::Warning,
                format!("escrow wallet {} balance at {}", mirror.currency, mirror.balance),
                serde_json::json!({
                    "currency": mirror.currency,
                    "balance": mirror.balance.to_string(),
                }),
            ));
            raised += 1;
        }
        raised
    }

    fn detect_high_volumes(&self) -> usize {
        let now = Utc::now();
        let currencies = lock(&self.ledger.tx_log).currencies();
        let mut raised = 0;
        for currency in currencies {
            let volume = lock(&self.ledger.tx_log).daily_volume(&currency, now);
            if volume < self.thresholds.high_daily_volume {
                continue;
            }
            if self.has_active(AlertKind::HighDailyVolume, &currency) {
                continue;
            }
            lock(&self.ledger.alerts).append(Alert::new(
                AlertKind::HighDailyVolume,
                Severity::Warning,
                format!("24h volume for {currency} at {volume}"),
                serde_json::json!({
                    "currency": currency,
                    "volume": volume.to_string(),
                }),
            ));
            raised += 1;
        }
        raised
    }

    /// Whether an unresolved alert of `kind` already covers `currency`.
    fn has_active(&self, kind: AlertKind, currency: &str) -> bool {
        lock(&self.ledger.alerts)
            .active()
            .iter()
            .any(|a| a.kind == kind && a.metadata["currency"] == currency)
    }
}

/// Record a CRITICAL ledger-inconsistency alert.
///
/// Called from saga code when money moved at the custodian but the local
/// write-back did not commit. The alert is the durable trace an operator
/// (or reconciliation) repairs from.
pub fn raise_critical(
    ledger: &Ledger,
    message: impl Into<String>,
    metadata: serde_json::Value,
) -> AlertId {
    let message = message.into();
    warn!(%message, "raising critical alert");
    lock(&ledger.alerts).append(Alert::new(
        AlertKind::LedgerInconsistency,
        Severity::Critical,
        message,
        metadata,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use openescrow_types::{ExternalTransaction, Role, TransactionKind, TransferId};
    use rust_decimal::Decimal;

    fn tx(id: &str, amount: Decimal) -> ExternalTransaction {
        ExternalTransaction {
            external_id: TransferId::new(id),
            currency: "USDT".to_string(),
            amount,
            kind: TransactionKind::Credit,
            note: None,
            occurred_at: Utc::now(),
            is_alerted: false,
        }
    }

    fn monitor() -> (Monitor, Arc<Ledger>) {
        let ledger = Arc::new(Ledger::new());
        let monitor = Monitor::new(Arc::clone(&ledger), MonitorThresholds::default());
        (monitor, ledger)
    }

    #[test]
    fn large_transaction_fires_once() {
        let (monitor, ledger) = monitor();
        lock(&ledger.tx_log).insert_if_absent(tx("t1", Decimal::new(15_000, 0)));
        lock(&ledger.tx_log).insert_if_absent(tx("t2", Decimal::new(50, 0)));

        let report = monitor.scan();
        assert_eq!(report.large_transactions, 1);

        // Re-scan raises nothing new.
        assert_eq!(monitor.scan().large_transactions, 0);
    }

    #[test]
    fn low_balance_dedupes_per_currency() {
        let (monitor, ledger) = monitor();
        lock(&ledger.wallets).set_unreconciled("USDT", Decimal::new(40, 0));

        assert_eq!(monitor.scan().low_balances, 1);
        assert_eq!(monitor.scan().low_balances, 0);

        // Once the alert is resolved a persisting low balance re-fires.
        let admin = UserId::new();
        lock(&ledger.roles).assign(admin, Role::admin());
        let alert_id = monitor.active_alerts()[0].id;
        monitor.resolve_alert(alert_id, admin).unwrap();
        assert_eq!(monitor.scan().low_balances, 1);
    }

    #[test]
    fn high_volume_uses_24h_window() {
        let (monitor, ledger) = monitor();
        lock(&ledger.tx_log).insert_if_absent(tx("t1", Decimal::new(60_000, 0)));
        lock(&ledger.tx_log).insert_if_absent(tx("t2", Decimal::new(50_000, 0)));
        let mut stale = tx("t3", Decimal::new(500_000, 0));
        stale.occurred_at = Utc::now() - Duration::hours(30);
        lock(&ledger.tx_log).insert_if_absent(stale);

        let report = monitor.scan();
        assert_eq!(report.high_volumes, 1);
        // 110k current volume also trips two large-transaction alerts.
        assert_eq!(report.large_transactions, 3);
    }

    #[test]
    fn alert_resolution_requires_permission() {
        let (monitor, ledger) = monitor();
        let id = raise_critical(&ledger, "broken", serde_json::json!({}));

        let user = UserId::new();
        let err = monitor.resolve_alert(id, user).unwrap_err();
        assert!(matches!(err, OpenescrowError::Unauthorized { .. }));

        let admin = UserId::new();
        lock(&ledger.roles).assign(admin, Role::admin());
        let resolved = monitor.resolve_alert(id, admin).unwrap();
        assert!(resolved.resolved);
    }

    #[test]
    fn critical_alerts_carry_metadata() {
        let (_, ledger) = monitor();
        let id = raise_critical(
            &ledger,
            "transfer not committed",
            serde_json::json!({ "transfer_id": "tx_1" }),
        );
        let alert = lock(&ledger.alerts).get(id).unwrap();
        assert_eq!(alert.kind, AlertKind::LedgerInconsistency);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.metadata["transfer_id"], "tx_1");
    }
}
