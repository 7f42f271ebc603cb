//! Trade types — one matched exchange between a buyer and a seller.
//!
//! A trade is created together with its escrow at match time and moves
//! through `PENDING → PAID → COMPLETED`, with `DISPUTED` reachable from
//! `PENDING` and `PAID`. Terminal states are never left.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountRef, EscrowId, OrderId, TradeId, UserId};

/// Lifecycle status of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TradeStatus {
    Pending,
    Paid,
    Disputed,
    Completed,
    Rejected,
    Cancelled,
}

impl TradeStatus {
    /// Terminal states admit no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Whether the legal transition graph contains `self → next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Pending | Self::Paid, Self::Disputed)
                | (Self::Paid, Self::Completed)
                | (Self::Disputed, Self::Completed | Self::Cancelled)
                | (Self::Pending, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Sub-status recording an in-flight custodian call whose outcome is
/// unknown (timeout). Neither success nor failure: the reconciliation
/// engine resolves it against the custodian's transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TradeSubStatus {
    #[default]
    None,
    /// The escrow fund-lock transfer timed out; liquidity stays reserved.
    AwaitingLockConfirmation,
    /// The release transfer to the buyer timed out.
    AwaitingReleaseConfirmation,
    /// A release claimed the trade and its custodian calls are in flight.
    /// Blocks every other path that would move the escrowed funds.
    ReleaseInProgress,
}

impl std::fmt::Display for TradeSubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::AwaitingLockConfirmation => write!(f, "AWAITING_LOCK_CONFIRMATION"),
            Self::AwaitingReleaseConfirmation => write!(f, "AWAITING_RELEASE_CONFIRMATION"),
            Self::ReleaseInProgress => write!(f, "RELEASE_IN_PROGRESS"),
        }
    }
}

/// One matched exchange. Owns exactly one [`EscrowId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub order_id: OrderId,
    pub escrow_id: EscrowId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    /// Custodian sub-account that receives the crypto on release.
    pub buyer_account: AccountRef,
    /// Custodian sub-account the crypto was locked from.
    pub seller_account: AccountRef,
    /// Crypto asset traded (e.g. "USDT").
    pub currency: String,
    pub fiat_amount: Decimal,
    pub crypto_amount: Decimal,
    pub status: TradeStatus,
    pub sub_status: TradeSubStatus,
    /// Off-platform payment evidence submitted by the buyer.
    pub payment_proof: Option<String>,
    /// Execution price attested by the custodian swap quote at release.
    pub execution_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Trade {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `user` is the buyer or seller on this trade.
    #[must_use]
    pub fn is_party(&self, user: UserId) -> bool {
        self.buyer_id == user || self.seller_id == user
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Trade {
    #[must_use]
    pub fn dummy(buyer_id: UserId, seller_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: TradeId::new(),
            order_id: OrderId::new(),
            escrow_id: EscrowId::new(),
            buyer_id,
            seller_id,
            buyer_account: AccountRef::new(format!("sub_{buyer_id}")),
            seller_account: AccountRef::new(format!("sub_{seller_id}")),
            currency: "USDT".to_string(),
            fiat_amount: Decimal::new(45_000, 0),
            crypto_amount: Decimal::new(30, 0),
            status: TradeStatus::Pending,
            sub_status: TradeSubStatus::None,
            payment_proof: None,
            execution_price: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}
