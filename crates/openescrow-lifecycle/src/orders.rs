//! Order intake — posting, listing, and cancelling advertisements.
//!
//! Sell orders are balance-checked against the creator's custodian
//! sub-account before they are persisted: an order advertising crypto the
//! creator doesn't hold is never matchable.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use openescrow_custodian::{require_balance, CustodianGateway};
use openescrow_store::{lock, Ledger};
use openescrow_types::{
    OpenescrowError, Order, OrderId, OrderSide, OrderStatus, Result, UserId,
};

/// Parameters for a new order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub currency: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub min_order: Decimal,
    pub max_order: Decimal,
    pub payment_methods: Vec<String>,
    pub terms: String,
}

/// Posts and lists orders.
pub struct OrderIntake {
    ledger: Arc<Ledger>,
    custodian: Arc<dyn CustodianGateway>,
}

impl OrderIntake {
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, custodian: Arc<dyn CustodianGateway>) -> Self {
        Self { ledger, custodian }
    }

    /// Validate and persist a new order.
    ///
    /// # Errors
    /// - `ValidationFailed` on missing/invalid fields
    /// - `InsufficientBalance` if a sell order exceeds the creator's free
    ///   custodian balance
    pub async fn create_order(&self, creator_id: UserId, request: OrderRequest) -> Result<Order> {
        Self::validate(&request)?;

        if request.side == OrderSide::Sell {
            let account = lock(&self.ledger.profiles).account_of(creator_id)?;
            require_balance(
                self.custodian.as_ref(),
                &account,
                &request.currency,
                request.amount,
            )
            .await?;
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            creator_id,
            side: request.side,
            currency: request.currency,
            price: request.price,
            amount: request.amount,
            min_order: request.min_order,
            max_order: request.max_order,
            payment_methods: request.payment_methods,
            terms: request.terms,
            status: OrderStatus::Active,
            created_at: now,
            updated_at: now,
        };
        info!(order_id = %order.id, side = %order.side, amount = %order.amount, "order created");
        lock(&self.ledger.orders).insert(order.clone());
        Ok(order)
    }

    /// Active orders for a currency and side, most recent first.
    #[must_use]
    pub fn list_orders(&self, currency: &str, side: OrderSide) -> Vec<Order> {
        lock(&self.ledger.orders).list_active(currency, side)
    }

    /// Cancel an order. Only the creator may cancel, and only while ACTIVE.
    pub fn cancel_order(&self, order_id: OrderId, caller: UserId) -> Result<Order> {
        let order = lock(&self.ledger.orders)
            .get(order_id)
            .ok_or(OpenescrowError::OrderNotFound(order_id))?;
        if order.creator_id != caller {
            return Err(OpenescrowError::Unauthorized {
                reason: "only the order creator may cancel".to_string(),
            });
        }
        lock(&self.ledger.orders).cancel(order_id)
    }

    fn validate(request: &OrderRequest) -> Result<()> {
        let fail = |reason: &str| {
            Err(OpenescrowError::ValidationFailed {
                reason: reason.to_string(),
            })
        };
        if request.currency.trim().is_empty() {
            return fail("currency is required");
        }
        if request.price <= Decimal::ZERO {
            return fail("price must be positive");
        }
        if request.amount <= Decimal::ZERO {
            return fail("amount must be positive");
        }
        if request.min_order <= Decimal::ZERO || request.max_order < request.min_order {
            return fail("order window must satisfy 0 < min_order <= max_order");
        }
        if request.payment_methods.is_empty() {
            return fail("at least one payment method is required");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openescrow_custodian::MockCustodian;
    use openescrow_types::AccountRef;

    fn request() -> OrderRequest {
        OrderRequest {
            side: OrderSide::Sell,
            currency: "USDT".to_string(),
            price: Decimal::new(1500, 0),
            amount: Decimal::new(100, 0),
            min_order: Decimal::new(10_000, 0),
            max_order: Decimal::new(150_000, 0),
            payment_methods: vec!["bank_transfer".to_string()],
            terms: "pay within the window".to_string(),
        }
    }

    fn setup() -> (OrderIntake, Arc<Ledger>, Arc<MockCustodian>, UserId) {
        let ledger = Arc::new(Ledger::new());
        let custodian = Arc::new(MockCustodian::new());
        let creator = UserId::new();
        lock(&ledger.profiles).register(creator, AccountRef::new("sub_creator"));
        let gateway: Arc<dyn CustodianGateway> = Arc::clone(&custodian) as Arc<dyn CustodianGateway>;
        let intake = OrderIntake::new(Arc::clone(&ledger), gateway);
        (intake, ledger, custodian, creator)
    }

    #[tokio::test]
    async fn sell_order_requires_custodian_balance() {
        let (intake, _, custodian, creator) = setup();
        custodian.deposit(&AccountRef::new("sub_creator"), "USDT", Decimal::new(50, 0));

        let err = intake.create_order(creator, request()).await.unwrap_err();
        assert!(matches!(err, OpenescrowError::InsufficientBalance { .. }));

        custodian.deposit(&AccountRef::new("sub_creator"), "USDT", Decimal::new(50, 0));
        let order = intake.create_order(creator, request()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Active);
    }

    #[tokio::test]
    async fn buy_order_skips_balance_check() {
        let (intake, _, _, creator) = setup();
        let mut req = request();
        req.side = OrderSide::Buy;
        let order = intake.create_order(creator, req).await.unwrap();
        assert_eq!(order.side, OrderSide::Buy);
    }

    #[tokio::test]
    async fn validation_failures() {
        let (intake, _, _, creator) = setup();
        for broken in [
            {
                let mut r = request();
                r.currency = "  ".to_string();
                r
            },
            {
                let mut r = request();
                r.price = Decimal::ZERO;
                r
            },
            {
                let mut r = request();
                r.max_order = Decimal::ONE;
                r
            },
            {
                let mut r = request();
                r.payment_methods.clear();
                r
            },
        ] {
            let err = intake.create_order(creator, broken).await.unwrap_err();
            assert!(matches!(err, OpenescrowError::ValidationFailed { .. }));
        }
    }

    #[tokio::test]
    async fn cancel_requires_creator() {
        let (intake, _, _, creator) = setup();
        let mut req = request();
        req.side = OrderSide::Buy;
        let order = intake.create_order(creator, req).await.unwrap();

        let err = intake.cancel_order(order.id, UserId::new()).unwrap_err();
        assert!(matches!(err, OpenescrowError::Unauthorized { .. }));

        let cancelled = intake.cancel_order(order.id, creator).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(intake.list_orders("USDT", OrderSide::Buy).is_empty());
    }
}
