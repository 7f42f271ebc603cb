//! Escrow manager — the `create_trade` saga and the expiry sweep.
//!
//! The external fund lock cannot be rolled back transactionally with the
//! local store, so trade creation is a saga:
//!
//! 1. reserve liquidity (atomic conditional decrement)
//! 2. lock funds at the custodian
//! 3. on success persist Trade + Escrow as PENDING;
//!    on definite failure restore the reservation and persist nothing;
//!    on timeout persist with an awaiting-confirmation sub-status and let
//!    reconciliation decide.

use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{info, warn};

use openescrow_custodian::CustodianGateway;
use openescrow_store::{lock, Ledger};
use openescrow_types::{
    constants, Escrow, EscrowId, EscrowStatus, OpenescrowError, OrderId, OrderSide,
    PlatformConfig, Result, Trade, TradeId, TradeStatus, TradeSubStatus, UserId,
};

use crate::monitoring::raise_critical;

/// Outcome of one expiry-sweep run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub scanned: usize,
    pub cancelled: usize,
    pub refund_failures: usize,
}

/// Reserves order liquidity and locks funds with the custodian.
pub struct EscrowService {
    ledger: Arc<Ledger>,
    custodian: Arc<dyn CustodianGateway>,
    config: PlatformConfig,
}

impl EscrowService {
    #[must_use]
    pub fn new(
        ledger: Arc<Ledger>,
        custodian: Arc<dyn CustodianGateway>,
        config: PlatformConfig,
    ) -> Self {
        Self {
            ledger,
            custodian,
            config,
        }
    }

    /// Match a trader against an order, reserving liquidity and locking the
    /// seller's crypto into the platform escrow wallet.
    ///
    /// # Errors
    /// - `OrderNotActive` / `AmountOutOfRange` / `SelfTrade`
    /// - `InsufficientLiquidity` if the reservation loses the race
    /// - `FundsLockFailed` if the custodian definitively refuses; the
    ///   reservation is restored and nothing is persisted
    pub async fn create_trade(
        &self,
        order_id: OrderId,
        trader_id: UserId,
        fiat_amount: Decimal,
    ) -> Result<(Trade, Escrow)> {
        let order = lock(&self.ledger.orders)
            .get(order_id)
            .ok_or(OpenescrowError::OrderNotFound(order_id))?;
        if !order.is_active() {
            return Err(OpenescrowError::OrderNotActive(order_id));
        }
        if !order.accepts_fiat(fiat_amount) {
            return Err(OpenescrowError::AmountOutOfRange {
                amount: fiat_amount,
                min: order.min_order,
                max: order.max_order,
            });
        }
        if trader_id == order.creator_id {
            return Err(OpenescrowError::SelfTrade(trader_id));
        }

        // A SELL order's creator is the seller; a BUY order's creator buys.
        let (buyer_id, seller_id) = match order.side {
            OrderSide::Sell => (trader_id, order.creator_id),
            OrderSide::Buy => (order.creator_id, trader_id),
        };
        // Resolve sub-accounts before reserving so a missing profile
        // needs no compensation.
        let (buyer_account, seller_account) = {
            let profiles = lock(&self.ledger.profiles);
            (profiles.account_of(buyer_id)?, profiles.account_of(seller_id)?)
        };

        let crypto_amount = order.crypto_for_fiat(fiat_amount);
        lock(&self.ledger.orders).decrement_amount(order_id, crypto_amount)?;

        let escrow_id = EscrowId::new();
        let client_ref = format!("escrow:{}", escrow_id.0);
        let lock_note = format!("{client_ref}:lock");
        let sub_status = match self
            .custodian
            .transfer_internal(
                &seller_account,
                &self.config.escrow_wallet,
                &order.currency,
                crypto_amount,
                &lock_note,
            )
            .await
        {
            Ok(receipt) => {
                info!(%escrow_id, transfer_id = %receipt.id, "escrow funds locked");
                TradeSubStatus::None
            }
            Err(err) if err.is_outcome_unknown() => {
                // Unknown outcome: keep the reservation, persist the trade
                // with a verification marker for reconciliation.
                warn!(%escrow_id, %err, "fund lock timed out; awaiting verification");
                TradeSubStatus::AwaitingLockConfirmation
            }
            Err(err) => {
                warn!(%escrow_id, %err, "fund lock refused; restoring reservation");
                lock(&self.ledger.orders).restore_amount(order_id, crypto_amount)?;
                return Err(OpenescrowError::FundsLockFailed {
                    reason: err.to_string(),
                });
            }
        };

        let now = Utc::now();
        let escrow = Escrow {
            id: escrow_id,
            order_id,
            buyer_id,
            seller_id,
            amount: fiat_amount,
            price: order.price,
            total: fiat_amount,
            crypto_amount,
            currency: order.currency.clone(),
            escrow_wallet: self.config.escrow_wallet.clone(),
            confirmation_code: confirmation_code(),
            client_ref,
            payment_window_minutes: self.config.payment_window_minutes,
            expires_at: now + chrono::Duration::minutes(self.config.payment_window_minutes),
            status: EscrowStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let trade = Trade {
            id: TradeId::new(),
            order_id,
            escrow_id,
            buyer_id,
            seller_id,
            buyer_account,
            seller_account,
            currency: order.currency.clone(),
            fiat_amount,
            crypto_amount,
            status: TradeStatus::Pending,
            sub_status,
            payment_proof: None,
            execution_price: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        lock(&self.ledger.escrows).insert(escrow.clone());
        lock(&self.ledger.trades).insert(trade.clone());
        info!(trade_id = %trade.id, %escrow_id, %fiat_amount, %crypto_amount, "trade created");
        Ok((trade, escrow))
    }

    /// Cancel PENDING escrows past their payment window, restore the
    /// reserved liquidity, and refund the locked crypto to the seller.
    ///
    /// Idempotent under concurrent or repeated runs: each escrow is claimed
    /// by winning the trade's `PENDING → CANCELLED` compare-and-set; losers
    /// skip the row.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let now = Utc::now();
        let expired = lock(&self.ledger.escrows).expired_pending(now);
        let mut report = SweepReport {
            scanned: expired.len(),
            ..SweepReport::default()
        };

        for escrow in expired {
            let Some(trade) = lock(&self.ledger.trades).find_by_escrow(escrow.id) else {
                continue;
            };
            // An unverified fund lock is reconciliation's problem, not the
            // sweep's: refunding a lock that never landed would mint money.
            if trade.sub_status != TradeSubStatus::None {
                continue;
            }
            // Claim the row; a paid or disputed trade keeps its escrow, and
            // a concurrent sweep run loses this compare-and-set.
            if lock(&self.ledger.trades)
                .transition(trade.id, TradeStatus::Pending, TradeStatus::Cancelled)
                .is_err()
            {
                continue;
            }
            lock(&self.ledger.escrows).transition(
                escrow.id,
                EscrowStatus::Pending,
                EscrowStatus::Cancelled,
            )?;
            lock(&self.ledger.orders).restore_amount(escrow.order_id, escrow.crypto_amount)?;
            report.cancelled += 1;

            let refund_note = format!("{}:refund", escrow.client_ref);
            if let Err(err) = self
                .custodian
                .transfer_internal(
                    &self.config.escrow_wallet,
                    &trade.seller_account,
                    &escrow.currency,
                    escrow.crypto_amount,
                    &refund_note,
                )
                .await
            {
                // The cancellation stands; the stuck refund is escalated.
                report.refund_failures += 1;
                raise_critical(
                    &self.ledger,
                    format!("expiry refund failed for escrow {}", escrow.id),
                    serde_json::json!({
                        "escrow_id": escrow.id.to_string(),
                        "trade_id": trade.id.to_string(),
                        "error": err.to_string(),
                    }),
                );
            } else {
                info!(escrow_id = %escrow.id, trade_id = %trade.id, "expired escrow refunded");
            }
        }
        Ok(report)
    }
}

/// Buyer-facing confirmation code quoted in the payment reference.
fn confirmation_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(constants::CONFIRMATION_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}
