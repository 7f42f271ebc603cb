//! In-memory custodian double with scripted fault injection.
//!
//! Downstream crates exercise every saga branch against this: definite
//! refusals, and the two flavors of timeout that matter for an
//! at-most-once-uncertain RPC — the transfer that never happened
//! ([`Fault::TimeoutDropped`]) and the one that happened but whose
//! confirmation was lost ([`Fault::TimeoutDelivered`]).

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use openescrow_types::{
    AccountRef, ExternalTransaction, OpenescrowError, Result, TransactionKind, TransferId,
};

use crate::wire::{CustodianWallet, SwapQuotation, SwapResult, SwapStatus, TransferReceipt};
use crate::CustodianGateway;

/// A scripted failure for the next call of one operation.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Definite refusal with a custodian error code.
    Fail { code: String, message: String },
    /// Timeout; the operation did NOT execute custodian-side.
    TimeoutDropped,
    /// Timeout; the operation DID execute custodian-side, but the caller
    /// never saw the receipt.
    TimeoutDelivered,
}

struct QuoteRecord {
    from_amount: Decimal,
    rate: Decimal,
}

struct Inner {
    /// (account, currency) → balance.
    balances: HashMap<(String, String), Decimal>,
    /// account → ledger entries, oldest first.
    transactions: HashMap<String, Vec<ExternalTransaction>>,
    quotations: HashMap<String, QuoteRecord>,
    /// (from_currency, to_currency) → rate.
    rates: HashMap<(String, String), Decimal>,
    transfer_faults: VecDeque<Fault>,
    quote_faults: VecDeque<Fault>,
    swap_faults: VecDeque<Fault>,
    transfer_count: usize,
    seq: u64,
}

/// Fault-injectable in-memory [`CustodianGateway`].
pub struct MockCustodian {
    inner: Mutex<Inner>,
}

impl Default for MockCustodian {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCustodian {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                balances: HashMap::new(),
                transactions: HashMap::new(),
                quotations: HashMap::new(),
                rates: HashMap::new(),
                transfer_faults: VecDeque::new(),
                quote_faults: VecDeque::new(),
                swap_faults: VecDeque::new(),
                transfer_count: 0,
                seq: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned mock is still the best copy of scripted state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a balance on an account.
    pub fn deposit(&self, account: &AccountRef, currency: &str, amount: Decimal) {
        let mut inner = self.lock();
        *inner
            .balances
            .entry((account.0.clone(), currency.to_string()))
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Set the quoted rate for a currency pair (defaults to 1).
    pub fn set_rate(&self, from: &str, to: &str, rate: Decimal) {
        self.lock()
            .rates
            .insert((from.to_string(), to.to_string()), rate);
    }

    /// Script a fault for the next `transfer_internal` call.
    pub fn inject_transfer_fault(&self, fault: Fault) {
        self.lock().transfer_faults.push_back(fault);
    }

    /// Script a fault for the next `create_swap_quotation` call.
    pub fn inject_quote_fault(&self, fault: Fault) {
        self.lock().quote_faults.push_back(fault);
    }

    /// Script a fault for the next `confirm_swap` call.
    pub fn inject_swap_fault(&self, fault: Fault) {
        self.lock().swap_faults.push_back(fault);
    }

    /// Number of transfers that actually executed (including delivered
    /// timeouts). Lets tests assert "no second transfer occurred".
    #[must_use]
    pub fn executed_transfers(&self) -> usize {
        self.lock().transfer_count
    }

    /// Append a raw ledger entry on an account. Backfill scenarios use
    /// this to control `occurred_at` exactly.
    pub fn record_transaction(&self, account: &AccountRef, tx: ExternalTransaction) {
        self.lock()
            .transactions
            .entry(account.0.clone())
            .or_default()
            .push(tx);
    }

    fn execute_transfer(
        inner: &mut Inner,
        from: &AccountRef,
        to: &AccountRef,
        currency: &str,
        amount: Decimal,
        note: &str,
    ) -> Result<TransferReceipt> {
        let from_key = (from.0.clone(), currency.to_string());
        let available = inner.balances.get(&from_key).copied().unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(OpenescrowError::ExternalService {
                code: "insufficient_funds".to_string(),
                message: format!("have {available}, need {amount}"),
            });
        }
        inner.balances.insert(from_key, available - amount);
        *inner
            .balances
            .entry((to.0.clone(), currency.to_string()))
            .or_insert(Decimal::ZERO) += amount;

        inner.seq += 1;
        let base = format!("mtx_{:06}", inner.seq);
        let now = Utc::now();
        let entry = |id: String, kind: TransactionKind| ExternalTransaction {
            external_id: TransferId::new(id),
            currency: currency.to_string(),
            amount,
            kind,
            note: Some(note.to_string()),
            occurred_at: now,
            is_alerted: false,
        };
        inner
            .transactions
            .entry(from.0.clone())
            .or_default()
            .push(entry(format!("{base}-dr"), TransactionKind::Debit));
        inner
            .transactions
            .entry(to.0.clone())
            .or_default()
            .push(entry(format!("{base}-cr"), TransactionKind::Credit));

        inner.transfer_count += 1;
        Ok(TransferReceipt {
            id: TransferId::new(base),
            success: true,
        })
    }
}

#[async_trait]
impl CustodianGateway for MockCustodian {
    async fn get_balance(&self, account: &AccountRef, currency: &str) -> Result<Decimal> {
        let inner = self.lock();
        Ok(inner
            .balances
            .get(&(account.0.clone(), currency.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn transfer_internal(
        &self,
        from: &AccountRef,
        to: &AccountRef,
        currency: &str,
        amount: Decimal,
        note: &str,
    ) -> Result<TransferReceipt> {
        let mut inner = self.lock();
        match inner.transfer_faults.pop_front() {
            Some(Fault::Fail { code, message }) => {
                return Err(OpenescrowError::ExternalService { code, message });
            }
            Some(Fault::TimeoutDropped) => {
                return Err(OpenescrowError::CustodianTimeout {
                    operation: "transfer_internal".to_string(),
                });
            }
            Some(Fault::TimeoutDelivered) => {
                Self::execute_transfer(&mut inner, from, to, currency, amount, note)?;
                return Err(OpenescrowError::CustodianTimeout {
                    operation: "transfer_internal".to_string(),
                });
            }
            None => {}
        }
        Self::execute_transfer(&mut inner, from, to, currency, amount, note)
    }

    async fn create_swap_quotation(
        &self,
        _account: &AccountRef,
        from_currency: &str,
        to_currency: &str,
        from_amount: Decimal,
    ) -> Result<SwapQuotation> {
        let mut inner = self.lock();
        match inner.quote_faults.pop_front() {
            Some(Fault::Fail { code, message }) => {
                return Err(OpenescrowError::ExternalService { code, message });
            }
            Some(Fault::TimeoutDropped | Fault::TimeoutDelivered) => {
                return Err(OpenescrowError::CustodianTimeout {
                    operation: "create_swap_quotation".to_string(),
                });
            }
            None => {}
        }
        let rate = inner
            .rates
            .get(&(from_currency.to_string(), to_currency.to_string()))
            .copied()
            .unwrap_or(Decimal::ONE);
        inner.seq += 1;
        let id = format!("quote_{:06}", inner.seq);
        inner
            .quotations
            .insert(id.clone(), QuoteRecord { from_amount, rate });
        Ok(SwapQuotation {
            id,
            rate,
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        })
    }

    async fn confirm_swap(&self, _account: &AccountRef, quotation_id: &str) -> Result<SwapResult> {
        let mut inner = self.lock();
        match inner.swap_faults.pop_front() {
            Some(Fault::Fail { code, message }) => {
                return Err(OpenescrowError::ExternalService { code, message });
            }
            Some(Fault::TimeoutDropped | Fault::TimeoutDelivered) => {
                return Err(OpenescrowError::CustodianTimeout {
                    operation: "confirm_swap".to_string(),
                });
            }
            None => {}
        }
        let quote = inner.quotations.remove(quotation_id).ok_or_else(|| {
            OpenescrowError::ExternalService {
                code: "unknown_quotation".to_string(),
                message: quotation_id.to_string(),
            }
        })?;
        Ok(SwapResult {
            status: SwapStatus::Executed,
            received_amount: quote.from_amount * quote.rate,
            execution_price: quote.rate,
        })
    }

    async fn list_wallets(&self, account: &AccountRef) -> Result<Vec<CustodianWallet>> {
        let inner = self.lock();
        let mut wallets: Vec<CustodianWallet> = inner
            .balances
            .iter()
            .filter(|((acct, _), _)| acct == &account.0)
            .map(|((_, currency), balance)| CustodianWallet {
                currency: currency.clone(),
                balance: *balance,
            })
            .collect();
        wallets.sort_by(|a, b| a.currency.cmp(&b.currency));
        Ok(wallets)
    }

    async fn list_transactions(
        &self,
        account: &AccountRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExternalTransaction>> {
        let inner = self.lock();
        Ok(inner
            .transactions
            .get(&account.0)
            .map(|rows| {
                rows.iter()
                    .filter(|tx| tx.occurred_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
