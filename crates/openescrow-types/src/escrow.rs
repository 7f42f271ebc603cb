//! Escrow types — a custodian-held balance earmarked for one trade.
//!
//! `Escrow.amount` equals the owning trade's fiat amount by construction.
//! The escrowed crypto sits in the platform escrow wallet at the custodian,
//! never with buyer or seller, until the trade reaches a terminal state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountRef, EscrowId, OrderId, UserId};

/// Lifecycle status of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum EscrowStatus {
    Pending,
    Completed,
    Cancelled,
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Funds held for one trade, with a payment deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    /// Fiat amount the buyer owes off-platform.
    pub amount: Decimal,
    /// Fiat price per crypto unit at match time.
    pub price: Decimal,
    /// Total fiat due (amount; fees are out of scope).
    pub total: Decimal,
    /// Crypto quantity locked at the custodian.
    pub crypto_amount: Decimal,
    /// Crypto asset locked (e.g. "USDT").
    pub currency: String,
    /// Custodian sub-account holding the locked funds.
    pub escrow_wallet: AccountRef,
    /// Code the buyer quotes in the off-platform payment reference.
    pub confirmation_code: String,
    /// Correlation reference carried in custodian transfer notes, used by
    /// reconciliation to resolve unknown-outcome transfers.
    pub client_ref: String,
    pub payment_window_minutes: i64,
    pub expires_at: DateTime<Utc>,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Escrow {
    /// Whether the payment window has lapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Escrow {
    #[must_use]
    pub fn dummy(buyer_id: UserId, seller_id: UserId, fiat: Decimal, crypto: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: EscrowId::new(),
            order_id: OrderId::new(),
            buyer_id,
            seller_id,
            amount: fiat,
            price: if crypto.is_zero() { Decimal::ZERO } else { fiat / crypto },
            total: fiat,
            crypto_amount: crypto,
            currency: "USDT".to_string(),
            escrow_wallet: AccountRef::new("escrow_wallet"),
            confirmation_code: "TESTCODE".to_string(),
            client_ref: format!("escrow:{}", EscrowId::new().0),
            payment_window_minutes: 30,
            expires_at: now + chrono::Duration::minutes(30),
            status: EscrowStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}
