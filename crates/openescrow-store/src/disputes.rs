//! Dispute repository.
//!
//! Resolution is a two-step compare-and-set: a resolver first claims the
//! dispute (`PENDING → RESOLVING`) before any transfer is attempted, then
//! commits the verdict (`RESOLVING → APPROVED|REJECTED`). Exactly one
//! concurrent resolver wins the claim, which is the double-payout guard.

use std::collections::HashMap;

use chrono::Utc;

use openescrow_types::{Dispute, DisputeId, DisputeStatus, OpenescrowError, Result, TradeId, UserId};

/// All disputes, keyed by id.
#[derive(Default)]
pub struct DisputeStore {
    disputes: HashMap<DisputeId, Dispute>,
}

impl DisputeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dispute: Dispute) {
        self.disputes.insert(dispute.id, dispute);
    }

    #[must_use]
    pub fn get(&self, dispute_id: DisputeId) -> Option<Dispute> {
        self.disputes.get(&dispute_id).cloned()
    }

    /// The unresolved dispute for a trade, if one exists.
    #[must_use]
    pub fn open_for_trade(&self, trade_id: TradeId) -> Option<Dispute> {
        self.disputes
            .values()
            .find(|d| d.trade_id == trade_id && !d.is_resolved())
            .cloned()
    }

    /// Claim a PENDING dispute for resolution (compare-and-set). The claim
    /// must be held before any payout transfer is attempted; a concurrent
    /// second resolver loses here with `StateConflict`.
    pub fn claim(&mut self, dispute_id: DisputeId) -> Result<Dispute> {
        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or(OpenescrowError::DisputeNotFound(dispute_id))?;
        if dispute.status != DisputeStatus::Pending {
            return Err(OpenescrowError::state_conflict(
                "dispute",
                DisputeStatus::Pending,
                dispute.status,
            ));
        }
        dispute.status = DisputeStatus::Resolving;
        Ok(dispute.clone())
    }

    /// Return a claimed dispute to PENDING (compare-and-set) after a payout
    /// that did not verifiably execute.
    pub fn release_claim(&mut self, dispute_id: DisputeId) -> Result<()> {
        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or(OpenescrowError::DisputeNotFound(dispute_id))?;
        if dispute.status != DisputeStatus::Resolving {
            return Err(OpenescrowError::state_conflict(
                "dispute",
                DisputeStatus::Resolving,
                dispute.status,
            ));
        }
        dispute.status = DisputeStatus::Pending;
        Ok(())
    }

    /// Commit the verdict on a RESOLVING dispute (compare-and-set),
    /// stamping the audit trail.
    ///
    /// # Errors
    /// `StateConflict` unless the caller holds the claim.
    pub fn resolve(
        &mut self,
        dispute_id: DisputeId,
        verdict: DisputeStatus,
        admin_id: UserId,
        notes: &str,
    ) -> Result<Dispute> {
        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or(OpenescrowError::DisputeNotFound(dispute_id))?;
        if dispute.status != DisputeStatus::Resolving {
            return Err(OpenescrowError::state_conflict(
                "dispute",
                DisputeStatus::Resolving,
                dispute.status,
            ));
        }
        dispute.status = verdict;
        dispute.admin_notes = Some(notes.to_string());
        dispute.resolved_at = Some(Utc::now());
        dispute.resolved_by = Some(admin_id);
        Ok(dispute.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.disputes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disputes.is_empty()
    }
}
