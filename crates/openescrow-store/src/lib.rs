//! # openescrow-store
//!
//! The persistent-store layer: relational-shaped in-memory stores with
//! compare-and-set status transitions.
//!
//! ## Concurrency model
//!
//! Inbound operations run on independent workers; the [`Ledger`] is the
//! only shared mutable resource. Each table sits behind its own mutex and
//! every status change is a compare-and-set (`transition(id, expected,
//! next)`), the in-process equivalent of a `WHERE status = expected`
//! write guard. Locks are held only across synchronous store calls, never
//! across a custodian RPC.

pub mod alerts;
pub mod disputes;
pub mod escrows;
pub mod order_book;
pub mod profiles;
pub mod reconciliation;
pub mod roles;
pub mod trades;
pub mod tx_log;
pub mod wallets;

pub use alerts::AlertStore;
pub use disputes::DisputeStore;
pub use escrows::EscrowStore;
pub use order_book::OrderBookStore;
pub use profiles::{Profile, ProfileStore};
pub use reconciliation::{ReconciliationLog, ReconciliationState};
pub use roles::RoleDirectory;
pub use trades::TradeStore;
pub use tx_log::TransactionLog;
pub use wallets::WalletMirrorStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Acquire a table lock, recovering from poisoning.
///
/// A poisoned mutex means a worker panicked mid-write; the stored data is
/// still the most recent committed copy, so we keep serving it rather than
/// propagating panics across every worker.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// All platform tables behind their own locks.
#[derive(Default)]
pub struct Ledger {
    pub orders: Mutex<OrderBookStore>,
    pub trades: Mutex<TradeStore>,
    pub escrows: Mutex<EscrowStore>,
    pub disputes: Mutex<DisputeStore>,
    pub wallets: Mutex<WalletMirrorStore>,
    pub tx_log: Mutex<TransactionLog>,
    pub recon_state: Mutex<ReconciliationState>,
    pub recon_log: Mutex<ReconciliationLog>,
    pub alerts: Mutex<AlertStore>,
    pub profiles: Mutex<ProfileStore>,
    pub roles: Mutex<RoleDirectory>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openescrow_types::{Order, OrderSide};
    use rust_decimal::Decimal;

    #[test]
    fn ledger_tables_are_independent() {
        let ledger = Ledger::new();
        let order = Order::dummy(OrderSide::Sell, Decimal::new(1500, 0), Decimal::new(100, 0));
        let id = order.id;
        lock(&ledger.orders).insert(order);
        // Holding one table must not block another.
        let _orders = lock(&ledger.orders);
        let _trades = lock(&ledger.trades);
        assert!(_orders.get(id).is_some());
        assert!(_trades.is_empty());
    }
}
