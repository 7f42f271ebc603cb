//! Order book store — active buy/sell advertisements and their remaining
//! liquidity.
//!
//! `decrement_amount` is the concurrency-critical operation: a single
//! conditional mutation under one store lock. It either reserves the full
//! delta or leaves the row byte-for-byte unchanged. A read-then-write
//! pattern here would let concurrent trades jointly over-reserve.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;

use openescrow_types::{OpenescrowError, Order, OrderId, OrderSide, OrderStatus, Result};

/// All orders, keyed by id.
#[derive(Default)]
pub struct OrderBookStore {
    orders: HashMap<OrderId, Order>,
}

impl OrderBookStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new order.
    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.id, order);
    }

    #[must_use]
    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).cloned()
    }

    /// Active orders for a currency and side, most recent first.
    #[must_use]
    pub fn list_active(&self, currency: &str, side: OrderSide) -> Vec<Order> {
        let mut out: Vec<Order> = self
            .orders
            .values()
            .filter(|o| o.is_active() && o.side == side && o.currency == currency)
            .cloned()
            .collect();
        // UUIDv7 ids are time-ordered; descending id = most recent first.
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out
    }

    /// Reserve `delta` from the order's remaining amount.
    ///
    /// Succeeds only if the order is ACTIVE and `amount >= delta`; otherwise
    /// the row is unchanged. Reaching zero completes the order.
    ///
    /// # Errors
    /// - `OrderNotFound` / `OrderNotActive`
    /// - `InsufficientLiquidity` if `amount < delta`
    pub fn decrement_amount(&mut self, order_id: OrderId, delta: Decimal) -> Result<Order> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(OpenescrowError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Active {
            return Err(OpenescrowError::OrderNotActive(order_id));
        }
        if order.amount < delta {
            return Err(OpenescrowError::InsufficientLiquidity {
                requested: delta,
                remaining: order.amount,
            });
        }
        order.amount -= delta;
        if order.amount.is_zero() {
            order.status = OrderStatus::Completed;
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    /// Compensating inverse of [`decrement_amount`]: give reserved liquidity
    /// back after a failed fund lock or an expired escrow.
    ///
    /// An order auto-completed by the decrement becomes ACTIVE again; a
    /// CANCELLED order keeps its status (the liquidity is returned but no
    /// longer matchable).
    pub fn restore_amount(&mut self, order_id: OrderId, delta: Decimal) -> Result<Order> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(OpenescrowError::OrderNotFound(order_id))?;
        order.amount += delta;
        if order.status == OrderStatus::Completed {
            order.status = OrderStatus::Active;
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    /// Cancel an ACTIVE order (compare-and-set).
    ///
    /// # Errors
    /// `StateConflict` if the order is not ACTIVE.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Order> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(OpenescrowError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Active {
            return Err(OpenescrowError::state_conflict(
                "order",
                OrderStatus::Active,
                order.status,
            ));
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sell_order(amount: Decimal) -> Order {
        Order::dummy(OrderSide::Sell, Decimal::new(1500, 0), amount)
    }

    #[test]
    fn decrement_reserves_liquidity() {
        let mut store = OrderBookStore::new();
        let order = sell_order(Decimal::new(100, 0));
        let id = order.id;
        store.insert(order);

        let updated = store.decrement_amount(id, Decimal::new(30, 0)).unwrap();
        assert_eq!(updated.amount, Decimal::new(70, 0));
        assert_eq!(updated.status, OrderStatus::Active);
    }

    #[test]
    fn decrement_insufficient_leaves_row_unchanged() {
        let mut store = OrderBookStore::new();
        let order = sell_order(Decimal::new(100, 0));
        let id = order.id;
        store.insert(order);

        let err = store.decrement_amount(id, Decimal::new(150, 0)).unwrap_err();
        assert!(matches!(err, OpenescrowError::InsufficientLiquidity { .. }));
        assert_eq!(store.get(id).unwrap().amount, Decimal::new(100, 0));
    }

    #[test]
    fn decrement_to_zero_completes_order() {
        let mut store = OrderBookStore::new();
        let order = sell_order(Decimal::new(100, 0));
        let id = order.id;
        store.insert(order);

        let updated = store.decrement_amount(id, Decimal::new(100, 0)).unwrap();
        assert_eq!(updated.amount, Decimal::ZERO);
        assert_eq!(updated.status, OrderStatus::Completed);

        // No further reservations possible.
        let err = store.decrement_amount(id, Decimal::ONE).unwrap_err();
        assert!(matches!(err, OpenescrowError::OrderNotActive(_)));
    }

    #[test]
    fn restore_reactivates_auto_completed_order() {
        let mut store = OrderBookStore::new();
        let order = sell_order(Decimal::new(100, 0));
        let id = order.id;
        store.insert(order);

        store.decrement_amount(id, Decimal::new(100, 0)).unwrap();
        let restored = store.restore_amount(id, Decimal::new(100, 0)).unwrap();
        assert_eq!(restored.amount, Decimal::new(100, 0));
        assert_eq!(restored.status, OrderStatus::Active);
    }

    #[test]
    fn restore_does_not_resurrect_cancelled_order() {
        let mut store = OrderBookStore::new();
        let order = sell_order(Decimal::new(100, 0));
        let id = order.id;
        store.insert(order);

        store.decrement_amount(id, Decimal::new(40, 0)).unwrap();
        store.cancel(id).unwrap();
        let restored = store.restore_amount(id, Decimal::new(40, 0)).unwrap();
        assert_eq!(restored.status, OrderStatus::Cancelled);
        assert_eq!(restored.amount, Decimal::new(100, 0));
    }

    #[test]
    fn cancel_is_compare_and_set() {
        let mut store = OrderBookStore::new();
        let order = sell_order(Decimal::new(100, 0));
        let id = order.id;
        store.insert(order);

        store.cancel(id).unwrap();
        let err = store.cancel(id).unwrap_err();
        assert!(matches!(err, OpenescrowError::StateConflict { .. }));
    }

    #[test]
    fn list_active_most_recent_first() {
        let mut store = OrderBookStore::new();
        let first = sell_order(Decimal::new(10, 0));
        let second = sell_order(Decimal::new(20, 0));
        let (first_id, second_id) = (first.id, second.id);
        store.insert(first);
        store.insert(second);
        // A cancelled order and a different side must not show up.
        let mut cancelled = sell_order(Decimal::new(5, 0));
        cancelled.status = OrderStatus::Cancelled;
        store.insert(cancelled);
        store.insert(Order::dummy(OrderSide::Buy, Decimal::new(1500, 0), Decimal::ONE));

        let listed = store.list_active("USDT", OrderSide::Sell);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second_id);
        assert_eq!(listed[1].id, first_id);
    }
}
