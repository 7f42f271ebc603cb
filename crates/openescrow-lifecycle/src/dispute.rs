//! Dispute handling — filing complaints and executing admin verdicts.
//!
//! The `PENDING → RESOLVING` compare-and-set is the double-payout guard:
//! a resolver claims the dispute before any custodian call, so of two
//! concurrent resolutions exactly one holds the claim when the payout
//! transfer runs. The claim is returned on a refused payout and committed
//! to a verdict on a successful one.

use std::sync::Arc;

use tracing::{error, info, warn};

use openescrow_custodian::CustodianGateway;
use openescrow_store::{lock, Ledger};
use openescrow_types::{
    Dispute, DisputeId, DisputeOutcome, DisputeStatus, Escrow, EscrowStatus, OpenescrowError,
    Permission, Result, Trade, TradeId, TradeStatus, TradeSubStatus, UserId,
};

use crate::monitoring::raise_critical;

/// Files and resolves disputes.
pub struct DisputeResolver {
    ledger: Arc<Ledger>,
    custodian: Arc<dyn CustodianGateway>,
}

impl DisputeResolver {
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, custodian: Arc<dyn CustodianGateway>) -> Self {
        Self { ledger, custodian }
    }

    /// File a complaint against a trade, freezing it in DISPUTED.
    ///
    /// # Errors
    /// - `Unauthorized` if the filer is not a party to the trade
    /// - `DisputeNotEligible` unless the trade is PENDING or PAID without
    ///   an open dispute
    /// - `StateConflict` if a custodian call on the trade is unverified
    pub fn open_dispute(
        &self,
        trade_id: TradeId,
        filer_id: UserId,
        reason: &str,
    ) -> Result<Dispute> {
        let trade = self.trade(trade_id)?;
        if !trade.is_party(filer_id) {
            return Err(OpenescrowError::Unauthorized {
                reason: "only a trade party may open a dispute".to_string(),
            });
        }
        if !matches!(trade.status, TradeStatus::Pending | TradeStatus::Paid) {
            return Err(OpenescrowError::DisputeNotEligible {
                reason: format!("trade {trade_id} is {}", trade.status),
            });
        }
        // Until the fund lock (or a release) is verified there is no known
        // escrow balance to dispute over.
        if trade.sub_status != TradeSubStatus::None {
            return Err(OpenescrowError::state_conflict(
                "trade sub-status",
                TradeSubStatus::None,
                trade.sub_status,
            ));
        }
        if lock(&self.ledger.disputes).open_for_trade(trade_id).is_some() {
            return Err(OpenescrowError::DisputeNotEligible {
                reason: format!("trade {trade_id} already has an open dispute"),
            });
        }

        // Freeze the trade first; losing this compare-and-set to a
        // concurrent release or sweep means there is nothing to dispute.
        lock(&self.ledger.trades).transition(trade_id, trade.status, TradeStatus::Disputed)?;
        let dispute = Dispute::new(trade_id, filer_id, reason);
        lock(&self.ledger.disputes).insert(dispute.clone());
        info!(%trade_id, dispute_id = %dispute.id, "dispute opened");
        Ok(dispute)
    }

    /// Execute an admin verdict: pay out the escrow and close the dispute,
    /// trade, and escrow records.
    ///
    /// Upholding the complaint refunds the buyer and cancels the trade;
    /// rejecting it releases to the seller and completes the trade. A
    /// definite transfer failure leaves the dispute PENDING and retryable.
    ///
    /// # Errors
    /// - `Unauthorized` without the dispute-resolution permission
    /// - `StateConflict` if the dispute is already resolved or another
    ///   resolution holds the claim
    pub async fn resolve_dispute(
        &self,
        dispute_id: DisputeId,
        admin_id: UserId,
        outcome: DisputeOutcome,
        notes: &str,
    ) -> Result<Dispute> {
        let role = lock(&self.ledger.roles).resolve_role(admin_id);
        if !role.has_permission(Permission::ResolveDisputes) {
            return Err(OpenescrowError::Unauthorized {
                reason: format!("role '{}' may not resolve disputes", role.name),
            });
        }

        // Claim the verdict before any custodian call; a concurrent or
        // repeated resolution dies here with no second payout.
        let dispute = lock(&self.ledger.disputes).claim(dispute_id)?;
        let (trade, escrow) = match self.records_of(&dispute) {
            Ok(found) => found,
            Err(err) => {
                self.unclaim(dispute_id);
                return Err(err);
            }
        };

        let recipient = match outcome {
            DisputeOutcome::UpholdComplaint => &trade.buyer_account,
            DisputeOutcome::RejectComplaint => &trade.seller_account,
        };
        let payout_note = format!("{}:dispute_payout", escrow.client_ref);
        let receipt = match self
            .custodian
            .transfer_internal(
                &escrow.escrow_wallet,
                recipient,
                &escrow.currency,
                escrow.crypto_amount,
                &payout_note,
            )
            .await
        {
            Ok(receipt) => receipt,
            Err(err) if err.is_outcome_unknown() => {
                // Unknown payout outcome with no sub-status slot on the
                // dispute: escalate and keep the dispute PENDING so an
                // operator re-runs it after reconciliation catches up.
                warn!(%dispute_id, %err, "dispute payout outcome unknown");
                raise_critical(
                    &self.ledger,
                    format!("dispute {dispute_id} payout timed out; outcome unverified"),
                    serde_json::json!({
                        "dispute_id": dispute_id.to_string(),
                        "trade_id": trade.id.to_string(),
                        "client_ref": escrow.client_ref,
                    }),
                );
                self.unclaim(dispute_id);
                return Err(err);
            }
            Err(err) => {
                warn!(%dispute_id, %err, "dispute payout refused; dispute stays PENDING");
                self.unclaim(dispute_id);
                return Err(err);
            }
        };

        match self.close_records(&dispute, &trade, &escrow, outcome, admin_id, notes) {
            Ok(resolved) => {
                info!(%dispute_id, transfer_id = %receipt.id, verdict = %resolved.status, "dispute resolved");
                Ok(resolved)
            }
            Err(err) => {
                error!(%dispute_id, transfer_id = %receipt.id, %err, "payout transferred but bookkeeping failed");
                raise_critical(
                    &self.ledger,
                    format!("dispute payout {} not committed for trade {}", receipt.id, trade.id),
                    serde_json::json!({
                        "dispute_id": dispute_id.to_string(),
                        "trade_id": trade.id.to_string(),
                        "transfer_id": receipt.id.to_string(),
                        "error": err.to_string(),
                    }),
                );
                Err(err)
            }
        }
    }

    fn close_records(
        &self,
        dispute: &Dispute,
        trade: &Trade,
        escrow: &Escrow,
        outcome: DisputeOutcome,
        admin_id: UserId,
        notes: &str,
    ) -> Result<Dispute> {
        let (verdict, trade_next, escrow_next) = match outcome {
            DisputeOutcome::UpholdComplaint => {
                (DisputeStatus::Approved, TradeStatus::Cancelled, EscrowStatus::Cancelled)
            }
            DisputeOutcome::RejectComplaint => {
                (DisputeStatus::Rejected, TradeStatus::Completed, EscrowStatus::Completed)
            }
        };
        let resolved =
            lock(&self.ledger.disputes).resolve(dispute.id, verdict, admin_id, notes)?;
        lock(&self.ledger.trades).transition(trade.id, TradeStatus::Disputed, trade_next)?;
        lock(&self.ledger.escrows).transition(escrow.id, EscrowStatus::Pending, escrow_next)?;
        Ok(resolved)
    }

    fn records_of(&self, dispute: &Dispute) -> Result<(Trade, Escrow)> {
        let trade = self.trade(dispute.trade_id)?;
        let escrow = lock(&self.ledger.escrows)
            .get(trade.escrow_id)
            .ok_or(OpenescrowError::EscrowNotFound(trade.escrow_id))?;
        Ok((trade, escrow))
    }

    /// Hand the claimed dispute back to PENDING after a payout that did
    /// not verifiably execute.
    fn unclaim(&self, dispute_id: DisputeId) {
        if let Err(err) = lock(&self.ledger.disputes).release_claim(dispute_id) {
            error!(%dispute_id, %err, "dispute claim could not be returned");
        }
    }

    fn trade(&self, trade_id: TradeId) -> Result<Trade> {
        lock(&self.ledger.trades)
            .get(trade_id)
            .ok_or(OpenescrowError::TradeNotFound(trade_id))
    }
}
