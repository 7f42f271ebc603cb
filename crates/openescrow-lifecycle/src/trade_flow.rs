//! Payment and release flow — `PENDING → PAID → COMPLETED`.
//!
//! The fiat leg happens off-platform: the buyer pays the seller directly
//! and submits evidence here. Release moves the escrowed crypto to the
//! buyer's sub-account, with the custodian swap quote pinning the
//! execution price that goes on the trade record.
//!
//! On a BUY order the creator is the buyer and vouched for the price when
//! posting, so proof submission releases immediately. On a SELL order the
//! seller must confirm fiat receipt via [`TradeFlow::confirm_release`].

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use openescrow_custodian::CustodianGateway;
use openescrow_store::{lock, Ledger};
use openescrow_types::{
    Escrow, EscrowStatus, OpenescrowError, OrderSide, PlatformConfig, Result, Trade, TradeId,
    TradeStatus, TradeSubStatus, UserId,
};

use crate::monitoring::raise_critical;

/// Drives trades from PAID to COMPLETED.
pub struct TradeFlow {
    ledger: Arc<Ledger>,
    custodian: Arc<dyn CustodianGateway>,
    config: PlatformConfig,
}

impl TradeFlow {
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

    /// Record the buyer's off-platform payment evidence and mark the trade
    /// PAID. BUY-order trades release immediately; SELL-order trades wait
    /// for the seller's confirmation.
    ///
    /// # Errors
    /// - `Unauthorized` if the caller is not the trade's buyer
    /// - `StateConflict` unless the trade is PENDING with no unverified
    ///   custodian call (an unconfirmed fund lock means the escrow may
    ///   hold nothing for this trade)
    pub async fn submit_payment_proof(
        &self,
        trade_id: TradeId,
        buyer_id: UserId,
        proof: &str,
    ) -> Result<Trade> {
        let trade = self.trade(trade_id)?;
        if trade.buyer_id != buyer_id {
            return Err(OpenescrowError::Unauthorized {
                reason: "only the trade's buyer may submit payment proof".to_string(),
            });
        }

        let paid = {
            let mut trades = lock(&self.ledger.trades);
            let current = trades
                .get(trade_id)
                .ok_or(OpenescrowError::TradeNotFound(trade_id))?;
            if current.sub_status != TradeSubStatus::None {
                return Err(OpenescrowError::state_conflict(
                    "trade sub-status",
                    TradeSubStatus::None,
                    current.sub_status,
                ));
            }
            trades.transition(trade_id, TradeStatus::Pending, TradeStatus::Paid)?;
            trades.set_payment_proof(trade_id, proof)?;
            trades
                .get(trade_id)
                .ok_or(OpenescrowError::TradeNotFound(trade_id))?
        };
        info!(%trade_id, "payment proof submitted");

        let order_side = lock(&self.ledger.orders)
            .get(trade.order_id)
            .ok_or(OpenescrowError::OrderNotFound(trade.order_id))?
            .side;
        if order_side == OrderSide::Buy {
            return self.release(trade_id).await;
        }
        Ok(paid)
    }

    /// Seller's confirmation that the fiat arrived; releases the escrow.
    /// Only meaningful on SELL-order trades.
    ///
    /// # Errors
    /// - `Unauthorized` if the caller is not the trade's seller
    /// - `ValidationFailed` on a BUY-order trade (those release on proof)
    /// - `StateConflict` unless the trade is PAID with no other release
    ///   claimed or awaiting verification
    pub async fn confirm_release(&self, trade_id: TradeId, seller_id: UserId) -> Result<Trade> {
        let trade = self.trade(trade_id)?;
        if trade.seller_id != seller_id {
            return Err(OpenescrowError::Unauthorized {
                reason: "only the trade's seller may confirm release".to_string(),
            });
        }
        let order_side = lock(&self.ledger.orders)
            .get(trade.order_id)
            .ok_or(OpenescrowError::OrderNotFound(trade.order_id))?
            .side;
        if order_side != OrderSide::Sell {
            return Err(OpenescrowError::ValidationFailed {
                reason: "buy-order trades release on payment proof".to_string(),
            });
        }
        self.release(trade_id).await
    }

    /// Release the escrowed crypto to the buyer.
    ///
    /// Three custodian calls, in order: quote (pins the execution price),
    /// swap confirmation, transfer to the buyer. A definite failure leaves
    /// the trade PAID and retryable; an unknown outcome defers to
    /// reconciliation via `AwaitingReleaseConfirmation`.
    async fn release(&self, trade_id: TradeId) -> Result<Trade> {
        // Claim before any custodian call: of two concurrent releases
        // exactly one wins this compare-and-set, and a trade with an
        // unverified custodian call cannot be claimed at all.
        let trade = lock(&self.ledger.trades).claim_release(trade_id)?;
        let escrow = match self.escrow_of(&trade) {
            Ok(escrow) => escrow,
            Err(err) => {
                self.unclaim(trade_id);
                return Err(err);
            }
        };

        let execution_price = match self.attest_price(&escrow).await {
            Ok(price) => price,
            Err(err) if err.is_outcome_unknown() => {
                return self.defer_release(trade_id, &err);
            }
            Err(err) => {
                self.unclaim(trade_id);
                return Err(err);
            }
        };

        let release_note = format!("{}:release", escrow.client_ref);
        let receipt = match self
            .custodian
            .transfer_internal(
                &escrow.escrow_wallet,
                &trade.buyer_account,
                &escrow.currency,
                escrow.crypto_amount,
                &release_note,
            )
            .await
        {
            Ok(receipt) => receipt,
            Err(err) if err.is_outcome_unknown() => {
                return self.defer_release(trade_id, &err);
            }
            Err(err) => {
                warn!(%trade_id, %err, "release transfer refused; trade stays PAID");
                self.unclaim(trade_id);
                return Err(err);
            }
        };

        // Money has moved. Local bookkeeping failures from here on are
        // ledger inconsistencies, not retryable errors.
        let finalized = self.finalize(&trade, execution_price);
        match finalized {
            Ok(completed) => {
                info!(%trade_id, transfer_id = %receipt.id, %execution_price, "escrow released");
                Ok(completed)
            }
            Err(err) => {
                error!(%trade_id, transfer_id = %receipt.id, %err, "release transferred but bookkeeping failed");
                raise_critical(
                    &self.ledger,
                    format!("release transfer {} not committed for trade {trade_id}", receipt.id),
                    serde_json::json!({
                        "trade_id": trade_id.to_string(),
                        "transfer_id": receipt.id.to_string(),
                        "error": err.to_string(),
                    }),
                );
                Err(err)
            }
        }
    }

    /// Quote then confirm the swap; returns the attested execution price.
    async fn attest_price(&self, escrow: &Escrow) -> Result<Decimal> {
        let quote = self
            .custodian
            .create_swap_quotation(
                &escrow.escrow_wallet,
                &escrow.currency,
                &self.config.fiat_currency,
                escrow.crypto_amount,
            )
            .await?;
        let result = self.custodian.confirm_swap(&escrow.escrow_wallet, &quote.id).await?;
        Ok(result.execution_price)
    }

    fn finalize(&self, trade: &Trade, execution_price: Decimal) -> Result<Trade> {
        let completed = {
            let mut trades = lock(&self.ledger.trades);
            trades.transition(trade.id, TradeStatus::Paid, TradeStatus::Completed)?;
            trades.set_sub_status(trade.id, TradeSubStatus::None)?;
            trades.set_execution_price(trade.id, execution_price)?;
            trades
                .get(trade.id)
                .ok_or(OpenescrowError::TradeNotFound(trade.id))?
        };
        lock(&self.ledger.escrows).transition(
            trade.escrow_id,
            EscrowStatus::Pending,
            EscrowStatus::Completed,
        )?;
        let mut profiles = lock(&self.ledger.profiles);
        profiles.increment_completed(trade.buyer_id);
        profiles.increment_completed(trade.seller_id);
        Ok(completed)
    }

    fn defer_release(&self, trade_id: TradeId, err: &OpenescrowError) -> Result<Trade> {
        warn!(%trade_id, %err, "release outcome unknown; awaiting verification");
        let mut trades = lock(&self.ledger.trades);
        trades.set_sub_status(trade_id, TradeSubStatus::AwaitingReleaseConfirmation)?;
        trades
            .get(trade_id)
            .ok_or(OpenescrowError::TradeNotFound(trade_id))
    }

    /// Return a claimed release after a definite custodian refusal; the
    /// trade is PAID and retryable again.
    fn unclaim(&self, trade_id: TradeId) {
        if let Err(err) = lock(&self.ledger.trades).clear_release_claim(trade_id) {
            error!(%trade_id, %err, "release claim could not be returned");
        }
    }

    fn trade(&self, trade_id: TradeId) -> Result<Trade> {
        lock(&self.ledger.trades)
            .get(trade_id)
            .ok_or(OpenescrowError::TradeNotFound(trade_id))
    }

    fn escrow_of(&self, trade: &Trade) -> Result<Escrow> {
        lock(&self.ledger.escrows)
            .get(trade.escrow_id)
            .ok_or(OpenescrowError::EscrowNotFound(trade.escrow_id))
    }
}
