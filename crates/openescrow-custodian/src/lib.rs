//! # openescrow-custodian
//!
//! The **Custodian Gateway**: typed async interface to the external
//! custodial exchange that actually holds the funds.
//!
//! Every operation is a network RPC with unspecified latency and an
//! at-most-once-uncertain outcome on timeout. A timeout surfaces as
//! [`OpenescrowError::CustodianTimeout`] and must never be treated as
//! success or failure by callers — it resolves only via reconciliation.
//!
//! Two implementations ship here:
//! - [`RestCustodian`] — bearer-authenticated REST client with bounded
//!   per-call timeouts.
//! - [`MockCustodian`] — in-memory double with scripted fault injection,
//!   used by every downstream test.

pub mod mock;
pub mod rest;
pub mod wire;

pub use mock::{Fault, MockCustodian};
pub use rest::RestCustodian;
pub use wire::{
    ApiEnvelope, BalancePayload, CustodianWallet, SwapQuotation, SwapResult, SwapStatus,
    TransferReceipt,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use openescrow_types::{AccountRef, ExternalTransaction, OpenescrowError, Result};

/// Interface to the external custodial exchange.
///
/// All amounts are denominated in the named currency. `note` on transfers
/// carries the platform's structured client reference (e.g.
/// `escrow:<id>:lock`) so reconciliation can correlate ledger rows back to
/// local state.
#[async_trait]
pub trait CustodianGateway: Send + Sync {
    /// Free balance of `currency` on `account`.
    async fn get_balance(&self, account: &AccountRef, currency: &str) -> Result<Decimal>;

    /// Move `amount` of `currency` between sub-accounts.
    async fn transfer_internal(
        &self,
        from: &AccountRef,
        to: &AccountRef,
        currency: &str,
        amount: Decimal,
        note: &str,
    ) -> Result<TransferReceipt>;

    /// Price a swap of `from_amount` of `from_currency` into `to_currency`.
    async fn create_swap_quotation(
        &self,
        account: &AccountRef,
        from_currency: &str,
        to_currency: &str,
        from_amount: Decimal,
    ) -> Result<SwapQuotation>;

    /// Execute a previously created quotation.
    async fn confirm_swap(&self, account: &AccountRef, quotation_id: &str) -> Result<SwapResult>;

    /// All wallets (currency + balance) on `account`.
    async fn list_wallets(&self, account: &AccountRef) -> Result<Vec<CustodianWallet>>;

    /// Ledger entries on `account` at or after `since`, oldest first.
    /// The boundary is inclusive: a row whose timestamp equals `since`
    /// appears in consecutive windows, and callers dedupe by external id.
    async fn list_transactions(
        &self,
        account: &AccountRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExternalTransaction>>;
}

/// Convenience guard: fail with `InsufficientBalance` unless `account`
/// holds at least `needed` of `currency`.
pub async fn require_balance(
    gateway: &dyn CustodianGateway,
    account: &AccountRef,
    currency: &str,
    needed: Decimal,
) -> Result<()> {
    let available = gateway.get_balance(account, currency).await?;
    if available < needed {
        return Err(OpenescrowError::InsufficientBalance { needed, available });
    }
    Ok(())
}
