//! Trade repository.
//!
//! The only status mutation is [`TradeStore::transition`] — a compare-and-set
//! on the expected current status, the in-process equivalent of a
//! `WHERE status = expected` guard. Payment-proof submission and
//! dispute-opening on the same trade are mutually exclusive because both
//! funnel through it.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;

use openescrow_types::{
    EscrowId, OpenescrowError, Result, Trade, TradeId, TradeStatus, TradeSubStatus,
};

/// All trades, keyed by id.
#[derive(Default)]
pub struct TradeStore {
    trades: HashMap<TradeId, Trade>,
}

impl TradeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, trade: Trade) {
        self.trades.insert(trade.id, trade);
    }

    #[must_use]
    pub fn get(&self, trade_id: TradeId) -> Option<Trade> {
        self.trades.get(&trade_id).cloned()
    }

    fn get_mut(&mut self, trade_id: TradeId) -> Result<&mut Trade> {
        self.trades
            .get_mut(&trade_id)
            .ok_or(OpenescrowError::TradeNotFound(trade_id))
    }

    /// Compare-and-set status transition.
    ///
    /// Fails with `StateConflict` if the current status is not `expected`,
    /// or if `expected → next` is not in the legal transition graph (which
    /// in particular forbids leaving a terminal state). Terminal transitions
    /// stamp `completed_at`.
    pub fn transition(
        &mut self,
        trade_id: TradeId,
        expected: TradeStatus,
        next: TradeStatus,
    ) -> Result<Trade> {
        let trade = self.get_mut(trade_id)?;
        if trade.status != expected {
            return Err(OpenescrowError::state_conflict("trade", expected, trade.status));
        }
        if !expected.can_transition_to(next) {
            return Err(OpenescrowError::state_conflict("trade", expected, next));
        }
        trade.status = next;
        let now = Utc::now();
        trade.updated_at = now;
        if next.is_terminal() {
            trade.completed_at = Some(now);
        }
        Ok(trade.clone())
    }

    /// Record the buyer's payment evidence. Caller transitions separately.
    pub fn set_payment_proof(&mut self, trade_id: TradeId, proof: &str) -> Result<()> {
        let trade = self.get_mut(trade_id)?;
        trade.payment_proof = Some(proof.to_string());
        trade.updated_at = Utc::now();
        Ok(())
    }

    /// Claim a PAID trade for release: compare-and-set on both the status
    /// and a clear sub-status. Exactly one concurrent caller wins; the
    /// `RELEASE_IN_PROGRESS` marker it leaves behind keeps any other path
    /// from moving the escrowed funds while the transfer is in flight.
    pub fn claim_release(&mut self, trade_id: TradeId) -> Result<Trade> {
        let trade = self.get_mut(trade_id)?;
        if trade.status != TradeStatus::Paid {
            return Err(OpenescrowError::state_conflict("trade", TradeStatus::Paid, trade.status));
        }
        if trade.sub_status != TradeSubStatus::None {
            return Err(OpenescrowError::state_conflict(
                "trade sub-status",
                TradeSubStatus::None,
                trade.sub_status,
            ));
        }
        trade.sub_status = TradeSubStatus::ReleaseInProgress;
        trade.updated_at = Utc::now();
        Ok(trade.clone())
    }

    /// Return a claimed release to a retryable state (compare-and-set)
    /// after a definite custodian refusal.
    pub fn clear_release_claim(&mut self, trade_id: TradeId) -> Result<()> {
        let trade = self.get_mut(trade_id)?;
        if trade.sub_status != TradeSubStatus::ReleaseInProgress {
            return Err(OpenescrowError::state_conflict(
                "trade sub-status",
                TradeSubStatus::ReleaseInProgress,
                trade.sub_status,
            ));
        }
        trade.sub_status = TradeSubStatus::None;
        trade.updated_at = Utc::now();
        Ok(())
    }

    /// Record or clear the awaiting-confirmation sub-status.
    pub fn set_sub_status(&mut self, trade_id: TradeId, sub: TradeSubStatus) -> Result<()> {
        let trade = self.get_mut(trade_id)?;
        trade.sub_status = sub;
        trade.updated_at = Utc::now();
        Ok(())
    }

    /// Record the custodian-attested execution price at release.
    pub fn set_execution_price(&mut self, trade_id: TradeId, price: Decimal) -> Result<()> {
        let trade = self.get_mut(trade_id)?;
        trade.execution_price = Some(price);
        trade.updated_at = Utc::now();
        Ok(())
    }

    /// The trade owning an escrow, if any. Exactly one by construction.
    #[must_use]
    pub fn find_by_escrow(&self, escrow_id: EscrowId) -> Option<Trade> {
        self.trades.values().find(|t| t.escrow_id == escrow_id).cloned()
    }

    /// Trades whose last custodian call timed out and awaits verification.
    /// Claimed in-flight releases are not awaiting anything.
    #[must_use]
    pub fn list_awaiting(&self) -> Vec<Trade> {
        self.trades
            .values()
            .filter(|t| {
                matches!(
                    t.sub_status,
                    TradeSubStatus::AwaitingLockConfirmation
                        | TradeSubStatus::AwaitingReleaseConfirmation
                )
            })
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
