//! Typed wire models for the custodian REST API.
//!
//! Every response body is parsed into the tagged [`ApiEnvelope`] before any
//! field is read. A body that fits neither variant is a
//! `MalformedResponse` error — ad hoc field access on loose JSON is how
//! bookkeeping drifts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use openescrow_types::{OpenescrowError, Result, TransferId};

/// Tagged success/error envelope wrapping every custodian response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApiEnvelope<T> {
    Success { data: T },
    Error { code: String, message: String },
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the envelope into a [`Result`], mapping the error variant to
    /// [`OpenescrowError::ExternalService`].
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Error { code, message } => Err(OpenescrowError::ExternalService { code, message }),
        }
    }
}

/// Result of an internal transfer between sub-accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: TransferId,
    pub success: bool,
}

/// A priced, time-limited quote for a currency swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuotation {
    pub id: String,
    pub rate: Decimal,
    pub expires_at: DateTime<Utc>,
}

/// Terminal state of a confirmed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Executed,
    Rejected,
    Expired,
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executed => write!(f, "EXECUTED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Outcome of [`confirm_swap`](crate::CustodianGateway::confirm_swap).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResult {
    pub status: SwapStatus,
    pub received_amount: Decimal,
    pub execution_price: Decimal,
}

/// One wallet row as reported by the custodian.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodianWallet {
    pub currency: String,
    pub balance: Decimal,
}

/// One ledger entry as reported by the custodian transaction feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub id: TransferId,
    pub currency: String,
    pub amount: Decimal,
    pub kind: WireTransactionKind,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Wire-side direction tag (`credit` / `debit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireTransactionKind {
    Credit,
    Debit,
}

impl From<WireTransactionKind> for openescrow_types::TransactionKind {
    fn from(kind: WireTransactionKind) -> Self {
        match kind {
            WireTransactionKind::Credit => Self::Credit,
            WireTransactionKind::Debit => Self::Debit,
        }
    }
}

impl From<TransactionPayload> for openescrow_types::ExternalTransaction {
    fn from(tx: TransactionPayload) -> Self {
        Self {
            external_id: tx.id,
            currency: tx.currency,
            amount: tx.amount,
            kind: tx.kind.into(),
            note: tx.note,
            occurred_at: tx.occurred_at,
            is_alerted: false,
        }
    }
}

/// Balance payload for a single currency query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancePayload {
    pub currency: String,
    pub available: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_parses() {
        let json = r#"{"status":"success","data":{"currency":"USDT","available":"100"}}"#;
        let env: ApiEnvelope<BalancePayload> = serde_json::from_str(json).unwrap();
        let payload = env.into_result().unwrap();
        assert_eq!(payload.available, Decimal::new(100, 0));
    }

    #[test]
    fn error_envelope_maps_to_external_service() {
        let json = r#"{"status":"error","code":"insufficient_funds","message":"balance too low"}"#;
        let env: ApiEnvelope<BalancePayload> = serde_json::from_str(json).unwrap();
        let err = env.into_result().unwrap_err();
        assert!(matches!(
            err,
            OpenescrowError::ExternalService { ref code, .. } if code == "insufficient_funds"
        ));
    }

    #[test]
    fn unknown_shape_is_rejected() {
        let json = r#"{"ok":true,"available":"100"}"#;
        let parsed = serde_json::from_str::<ApiEnvelope<BalancePayload>>(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn swap_status_display() {
        assert_eq!(format!("{}", SwapStatus::Executed), "EXECUTED");
    }
}
