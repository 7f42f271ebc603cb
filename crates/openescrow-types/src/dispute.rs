//! Dispute types — administrator-resolved disagreements over a trade.
//!
//! A dispute exists only while its trade is DISPUTED; resolving the dispute
//! is the only exit from that trade state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DisputeId, TradeId, UserId};

/// Lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum DisputeStatus {
    Pending,
    /// A resolver holds the verdict; the payout transfer is in flight.
    Resolving,
    /// Complaint upheld: escrow refunded to the buyer.
    Approved,
    /// Complaint rejected: escrow released to the seller.
    Rejected,
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Resolving => write!(f, "RESOLVING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Administrator's verdict on a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeOutcome {
    /// The complaint stands: refund the buyer, cancel the trade.
    UpholdComplaint,
    /// The complaint fails: release to the seller, complete the trade.
    RejectComplaint,
}

/// A filed complaint awaiting (or carrying) an admin verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub trade_id: TradeId,
    pub filer_id: UserId,
    pub reason: String,
    pub status: DisputeStatus,
    pub admin_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Dispute {
    #[must_use]
    pub fn new(trade_id: TradeId, filer_id: UserId, reason: impl Into<String>) -> Self {
        Self {
            id: DisputeId::new(),
            trade_id,
            filer_id,
            reason: reason.into(),
            status: DisputeStatus::Pending,
            admin_notes: None,
            resolved_at: None,
            resolved_by: None,
            created_at: Utc::now(),
        }
    }

    /// Whether a verdict has been committed. A RESOLVING dispute is still
    /// unresolved; its payout may yet fail and return it to PENDING.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, DisputeStatus::Approved | DisputeStatus::Rejected)
    }
}
