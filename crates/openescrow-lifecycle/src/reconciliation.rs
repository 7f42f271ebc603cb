//! Reconciliation engine — converges local state onto the custodian's.
//!
//! Three passes, all idempotent:
//! - wallet pass: overwrite the local mirror with custodian balances,
//!   logging every drift (the custodian always wins);
//! - transaction pass: backfill the local transaction log from the
//!   custodian feed, advancing the checkpoint only after a complete batch;
//! - awaiting pass: settle trades whose last custodian call timed out by
//!   searching the (freshly backfilled) transaction log for the escrow's
//!   client reference.
//!
//! The awaiting pass writes trades only through compare-and-set guarded by
//! the awaiting sub-status, so it never races a live transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use openescrow_custodian::CustodianGateway;
use openescrow_store::{lock, Ledger};
use openescrow_types::{
    EscrowStatus, OpenescrowError, PlatformConfig, Result, Trade, TradeStatus, TradeSubStatus,
};

/// Counters from one reconciliation run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconciliationReport {
    pub wallets_checked: usize,
    pub drifts_detected: usize,
    pub transactions_fetched: usize,
    pub transactions_inserted: usize,
    pub awaiting_confirmed: usize,
    pub awaiting_compensated: usize,
    /// Rows left for the next run after a per-trade failure.
    pub awaiting_skipped: usize,
    pub checkpoint_advanced: bool,
}

enum Healing {
    Confirmed,
    Compensated,
    Waiting,
}

/// Periodic custodian-vs-local convergence.
pub struct ReconciliationEngine {
    ledger: Arc<Ledger>,
    custodian: Arc<dyn CustodianGateway>,
    config: PlatformConfig,
}

impl ReconciliationEngine {
    #[must_use]
    pub fn new(
        ledger: Arc<Ledger>,
        custodian: Arc<dyn CustodianGateway>,
        config: PlatformConfig,
    ) -> Self {
        Self {
            ledger,
            custodian,
            config,
        }
    }

    /// One full run: wallets, then transactions, then awaiting trades.
    /// The transaction pass must precede the awaiting pass so the log
    /// holds the freshest evidence.
    pub async fn run(&self) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport::default();
        self.reconcile_wallets(&mut report).await?;
        self.reconcile_transactions(&mut report).await?;
        self.resolve_awaiting(&mut report)?;
        info!(
            wallets = report.wallets_checked,
            drifts = report.drifts_detected,
            inserted = report.transactions_inserted,
            confirmed = report.awaiting_confirmed,
            compensated = report.awaiting_compensated,
            skipped = report.awaiting_skipped,
            "reconciliation run complete"
        );
        Ok(report)
    }

    /// Compare the escrow wallet's custodian balances against the local
    /// mirror; the custodian value always wins.
    pub async fn reconcile_wallets(&self, report: &mut ReconciliationReport) -> Result<()> {
        let wallets = self.custodian.list_wallets(&self.config.escrow_wallet).await?;
        let now = Utc::now();
        for wallet in wallets {
            report.wallets_checked += 1;
            let local = lock(&self.ledger.wallets)
                .get(&wallet.currency)
                .map_or(Decimal::ZERO, |m| m.balance);
            if local != wallet.balance {
                warn!(
                    currency = %wallet.currency,
                    custodian = %wallet.balance,
                    %local,
                    "wallet drift detected"
                );
                lock(&self.ledger.recon_log).append(&wallet.currency, wallet.balance, local);
                report.drifts_detected += 1;
            }
            lock(&self.ledger.wallets).overwrite(&wallet.currency, wallet.balance, now);
        }
        Ok(())
    }

    /// Backfill the local transaction log from the custodian feed.
    ///
    /// The checkpoint advances only after every row in the batch has been
    /// ingested; a failed batch leaves it put so the next run re-reads the
    /// same window (inserts are idempotent by external id). The fetch
    /// window is inclusive of the checkpoint, so a row sharing its exact
    /// timestamp but landing in the feed after the fetch is still picked
    /// up by the next run.
    pub async fn reconcile_transactions(&self, report: &mut ReconciliationReport) -> Result<()> {
        let since = lock(&self.ledger.recon_state)
            .checkpoint()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let rows = self
            .custodian
            .list_transactions(&self.config.escrow_wallet, since)
            .await?;
        report.transactions_fetched = rows.len();

        let mut high_water: Option<DateTime<Utc>> = None;
        for row in rows {
            let occurred_at = row.occurred_at;
            if lock(&self.ledger.tx_log).insert_if_absent(row) {
                report.transactions_inserted += 1;
            }
            high_water = Some(high_water.map_or(occurred_at, |hw| hw.max(occurred_at)));
        }
        if let Some(hw) = high_water {
            lock(&self.ledger.recon_state).advance(hw);
            report.checkpoint_advanced = true;
        }
        Ok(())
    }

    /// Settle trades stuck in an awaiting-confirmation sub-status.
    ///
    /// Evidence found in the transaction log confirms the timed-out call;
    /// no evidence after the verification window compensates it. A failure
    /// on one row never blocks the rest of the pass: the row is logged,
    /// counted, and left for the next run.
    pub fn resolve_awaiting(&self, report: &mut ReconciliationReport) -> Result<()> {
        let now = Utc::now();
        // Snapshot first: the temporary guard in a `for` expression would
        // otherwise stay held across the body's own trade-table locks.
        let awaiting = lock(&self.ledger.trades).list_awaiting();
        for trade in awaiting {
            match self.heal_one(&trade, now) {
                Ok(Healing::Confirmed) => report.awaiting_confirmed += 1,
                Ok(Healing::Compensated) => report.awaiting_compensated += 1,
                Ok(Healing::Waiting) => {}
                Err(err) => {
                    warn!(trade_id = %trade.id, %err, "awaiting trade left for next run");
                    report.awaiting_skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn heal_one(&self, trade: &Trade, now: DateTime<Utc>) -> Result<Healing> {
        let escrow = lock(&self.ledger.escrows)
            .get(trade.escrow_id)
            .ok_or(OpenescrowError::EscrowNotFound(trade.escrow_id))?;
        let suffix = match trade.sub_status {
            TradeSubStatus::AwaitingLockConfirmation => "lock",
            TradeSubStatus::AwaitingReleaseConfirmation => "release",
            _ => return Ok(Healing::Waiting),
        };
        let needle = format!("{}:{suffix}", escrow.client_ref);
        let evidence = lock(&self.ledger.tx_log).find_by_note(&needle);

        match (trade.sub_status, evidence) {
            (TradeSubStatus::AwaitingLockConfirmation, Some(tx)) => {
                // The lock landed; the trade proceeds as a normal
                // PENDING trade from here.
                info!(trade_id = %trade.id, transfer_id = %tx.external_id, "fund lock confirmed");
                lock(&self.ledger.trades).set_sub_status(trade.id, TradeSubStatus::None)?;
                Ok(Healing::Confirmed)
            }
            (TradeSubStatus::AwaitingReleaseConfirmation, Some(tx)) => {
                info!(trade_id = %trade.id, transfer_id = %tx.external_id, "release confirmed");
                self.complete_released(trade)?;
                Ok(Healing::Confirmed)
            }
            (TradeSubStatus::AwaitingLockConfirmation, None)
                if self.window_lapsed(trade, now) =>
            {
                // No lock ever landed: unwind the reservation. The
                // transition goes first so a lost compare-and-set leaves
                // the row untouched.
                warn!(trade_id = %trade.id, "fund lock unverified past window; compensating");
                let mut trades = lock(&self.ledger.trades);
                trades.transition(trade.id, TradeStatus::Pending, TradeStatus::Cancelled)?;
                trades.set_sub_status(trade.id, TradeSubStatus::None)?;
                drop(trades);
                lock(&self.ledger.escrows).transition(
                    escrow.id,
                    EscrowStatus::Pending,
                    EscrowStatus::Cancelled,
                )?;
                lock(&self.ledger.orders)
                    .restore_amount(escrow.order_id, escrow.crypto_amount)?;
                Ok(Healing::Compensated)
            }
            (TradeSubStatus::AwaitingReleaseConfirmation, None)
                if self.window_lapsed(trade, now) =>
            {
                // No release ever landed: the escrow still holds the
                // funds, so the trade returns to a retryable PAID.
                warn!(trade_id = %trade.id, "release unverified past window; back to PAID");
                lock(&self.ledger.trades).set_sub_status(trade.id, TradeSubStatus::None)?;
                Ok(Healing::Compensated)
            }
            _ => Ok(Healing::Waiting), // still inside the verification window
        }
    }

    /// Finish a trade whose release transfer is now proven.
    fn complete_released(&self, trade: &Trade) -> Result<()> {
        {
            let mut trades = lock(&self.ledger.trades);
            trades.set_sub_status(trade.id, TradeSubStatus::None)?;
            trades.transition(trade.id, TradeStatus::Paid, TradeStatus::Completed)?;
        }
        lock(&self.ledger.escrows).transition(
            trade.escrow_id,
            EscrowStatus::Pending,
            EscrowStatus::Completed,
        )?;
        let mut profiles = lock(&self.ledger.profiles);
        profiles.increment_completed(trade.buyer_id);
        profiles.increment_completed(trade.seller_id);
        Ok(())
    }

    fn window_lapsed(&self, trade: &Trade, now: DateTime<Utc>) -> bool {
        now > trade.updated_at + chrono::Duration::minutes(self.config.verification_window_minutes)
    }
}
