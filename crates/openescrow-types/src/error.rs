//! Error types for the OpenEscrow trade-lifecycle engine.
//!
//! All errors use the `OE_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation / order errors
//! - 2xx: Trade / escrow lifecycle errors
//! - 3xx: Dispute errors
//! - 4xx: Authorization errors
//! - 5xx: Custodian / external-service errors
//! - 6xx: Reconciliation errors
//! - 7xx: Persistence errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AlertId, DisputeId, EscrowId, OrderId, TradeId, UserId};

/// Central error enum for all OpenEscrow operations.
#[derive(Debug, Error)]
pub enum OpenescrowError {
    // =================================================================
    // Validation / Order Errors (1xx)
    // =================================================================
    /// A request failed field validation (missing fields, bad values, etc.).
    #[error("OE_ERR_100: Validation failed: {reason}")]
    ValidationFailed { reason: String },

    /// The requested order was not found.
    #[error("OE_ERR_101: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is not in ACTIVE status.
    #[error("OE_ERR_102: Order {0} is not active")]
    OrderNotActive(OrderId),

    /// The order's remaining amount cannot cover the request.
    #[error("OE_ERR_103: Insufficient liquidity: requested {requested}, remaining {remaining}")]
    InsufficientLiquidity {
        requested: Decimal,
        remaining: Decimal,
    },

    /// The creator's custodian balance cannot back the sell order.
    #[error("OE_ERR_104: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    // =================================================================
    // Trade / Escrow Errors (2xx)
    // =================================================================
    /// The requested trade was not found.
    #[error("OE_ERR_200: Trade not found: {0}")]
    TradeNotFound(TradeId),

    /// The requested escrow was not found.
    #[error("OE_ERR_201: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// The fiat amount falls outside the order's min/max window.
    #[error("OE_ERR_202: Amount {amount} outside order window [{min}, {max}]")]
    AmountOutOfRange {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    /// A user attempted to trade against their own order.
    #[error("OE_ERR_203: Self-trade rejected for user {0}")]
    SelfTrade(UserId),

    /// The operation is invalid for the entity's current status.
    /// This is the compare-and-set guard every transition relies on.
    #[error("OE_ERR_204: State conflict on {entity}: expected {expected}, found {actual}")]
    StateConflict {
        entity: String,
        expected: String,
        actual: String,
    },

    /// The custodian definitively refused to lock funds into escrow.
    /// Reserved liquidity has been restored; nothing was persisted.
    #[error("OE_ERR_205: Fund lock failed: {reason}")]
    FundsLockFailed { reason: String },

    // =================================================================
    // Dispute Errors (3xx)
    // =================================================================
    /// The requested dispute was not found.
    #[error("OE_ERR_300: Dispute not found: {0}")]
    DisputeNotFound(DisputeId),

    /// A dispute cannot be opened for this trade.
    #[error("OE_ERR_301: Dispute not eligible: {reason}")]
    DisputeNotEligible { reason: String },

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// The caller lacks the permission or identity the operation requires.
    #[error("OE_ERR_400: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    // =================================================================
    // Custodian / External Errors (5xx)
    // =================================================================
    /// The custodian returned a definite non-success response.
    #[error("OE_ERR_500: Custodian error {code}: {message}")]
    ExternalService { code: String, message: String },

    /// A custodian call timed out. The outcome is UNKNOWN: callers must
    /// treat this as neither success nor failure — reconciliation resolves it.
    #[error("OE_ERR_501: Custodian timeout during {operation}; outcome pending verification")]
    CustodianTimeout { operation: String },

    /// The custodian response could not be parsed into its typed envelope.
    #[error("OE_ERR_502: Malformed custodian response: {reason}")]
    MalformedResponse { reason: String },

    // =================================================================
    // Reconciliation Errors (6xx)
    // =================================================================
    /// A reconciliation batch could not complete; the checkpoint was held.
    #[error("OE_ERR_600: Reconciliation incomplete: {reason}")]
    ReconciliationIncomplete { reason: String },

    // =================================================================
    // Persistence Errors (7xx)
    // =================================================================
    /// A local store write failed.
    #[error("OE_ERR_700: Persistence error: {reason}")]
    Persistence { reason: String },

    /// The requested alert was not found.
    #[error("OE_ERR_701: Alert not found: {0}")]
    AlertNotFound(AlertId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OE_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("OE_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("OE_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl OpenescrowError {
    /// Whether this error is terminal at the API boundary (never retried).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed { .. }
                | Self::Unauthorized { .. }
                | Self::StateConflict { .. }
                | Self::OrderNotFound(_)
                | Self::TradeNotFound(_)
                | Self::EscrowNotFound(_)
                | Self::DisputeNotFound(_)
                | Self::AlertNotFound(_)
        )
    }

    /// Whether the underlying custodian outcome is unknown (timeout).
    #[must_use]
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::CustodianTimeout { .. })
    }

    /// Shorthand for a state-conflict error on a named entity.
    #[must_use]
    pub fn state_conflict(
        entity: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::StateConflict {
            entity: entity.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OpenescrowError>;

impl From<serde_json::Error> for OpenescrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = OpenescrowError::OrderNotFound(OrderId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("OE_ERR_101"), "Got: {msg}");
    }

    #[test]
    fn amount_out_of_range_display() {
        let err = OpenescrowError::AmountOutOfRange {
            amount: Decimal::new(5_000_000, 0),
            min: Decimal::new(10_000, 0),
            max: Decimal::new(150_000, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("OE_ERR_202"));
        assert!(msg.contains("5000000"));
        assert!(msg.contains("150000"));
    }

    #[test]
    fn state_conflict_helper() {
        let err = OpenescrowError::state_conflict("trade", "PENDING", "COMPLETED");
        let msg = format!("{err}");
        assert!(msg.contains("OE_ERR_204"));
        assert!(msg.contains("PENDING"));
        assert!(msg.contains("COMPLETED"));
        assert!(err.is_terminal());
    }

    #[test]
    fn timeout_is_outcome_unknown_not_terminal() {
        let err = OpenescrowError::CustodianTimeout {
            operation: "transfer_internal".into(),
        };
        assert!(err.is_outcome_unknown());
        assert!(!err.is_terminal());
    }

    #[test]
    fn all_errors_have_oe_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(OpenescrowError::SelfTrade(UserId::new())),
            Box::new(OpenescrowError::FundsLockFailed {
                reason: "refused".into(),
            }),
            Box::new(OpenescrowError::InsufficientLiquidity {
                requested: Decimal::new(60, 0),
                remaining: Decimal::new(40, 0),
            }),
            Box::new(OpenescrowError::Internal("test".into())),
            Box::new(OpenescrowError::ReconciliationIncomplete {
                reason: "partial batch".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with("OE_ERR_"), "Error missing OE_ERR_ prefix: {msg}");
        }
    }
}
