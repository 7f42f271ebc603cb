//! Order types for the OpenEscrow order book.
//!
//! An order advertises liquidity: `amount` is the remaining quantity still
//! matchable and is monotonically non-increasing while the order is ACTIVE.
//! It never goes negative — the store enforces the conditional decrement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, UserId};

/// Which side of the market the order creator is on.
///
/// A SELL order's creator is the crypto seller; the responding trader is the
/// buyer. A BUY order inverts the roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Completed,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A posted buy/sell advertisement with remaining liquidity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub creator_id: UserId,
    pub side: OrderSide,
    /// Crypto asset being bought/sold (e.g. "USDT").
    pub currency: String,
    /// Fiat price per unit of `currency`.
    pub price: Decimal,
    /// Remaining matchable quantity in `currency` units.
    pub amount: Decimal,
    /// Smallest acceptable trade, in fiat.
    pub min_order: Decimal,
    /// Largest acceptable trade, in fiat.
    pub max_order: Decimal,
    pub payment_methods: Vec<String>,
    pub terms: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Whether a fiat amount falls within the order's min/max window.
    #[must_use]
    pub fn accepts_fiat(&self, fiat_amount: Decimal) -> bool {
        fiat_amount >= self.min_order && fiat_amount <= self.max_order
    }

    /// Crypto quantity a fiat amount buys at this order's price.
    #[must_use]
    pub fn crypto_for_fiat(&self, fiat_amount: Decimal) -> Decimal {
        fiat_amount / self.price
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    #[must_use]
    pub fn dummy(side: OrderSide, price: Decimal, amount: Decimal) -> Self {
        Self::dummy_for_user(UserId::new(), side, price, amount)
    }

    #[must_use]
    pub fn dummy_for_user(
        creator_id: UserId,
        side: OrderSide,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            creator_id,
            side,
            currency: "USDT".to_string(),
            price,
            amount,
            min_order: Decimal::new(10_000, 0),
            max_order: Decimal::new(150_000, 0),
            payment_methods: vec!["bank_transfer".to_string()],
            terms: String::new(),
            status: OrderStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
