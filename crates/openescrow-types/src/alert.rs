//! Monitoring alert types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AlertId, UserId};

/// What the detector was watching when it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    LargeTransaction,
    LowBalance,
    HighDailyVolume,
    /// Funds moved at the custodian but local bookkeeping did not commit.
    /// Always CRITICAL; requires manual or reconciliation-driven repair.
    LedgerInconsistency,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LargeTransaction => write!(f, "LARGE_TRANSACTION"),
            Self::LowBalance => write!(f, "LOW_BALANCE"),
            Self::HighDailyVolume => write!(f, "HIGH_DAILY_VOLUME"),
            Self::LedgerInconsistency => write!(f, "LEDGER_INCONSISTENCY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// One monitoring alert with a resolution audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    /// Structured context (trade id, transfer id, currency, ...).
    pub metadata: serde_json::Value,
    pub resolved: bool,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    #[must_use]
    pub fn new(
        kind: AlertKind,
        severity: Severity,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: AlertId::new(),
            kind,
            severity,
            message: message.into(),
            metadata,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_alert_is_unresolved() {
        let a = Alert::new(
            AlertKind::LowBalance,
            Severity::Warning,
            "escrow wallet below floor",
            serde_json::json!({ "currency": "USDT" }),
        );
        assert!(!a.resolved);
        assert!(a.resolved_by.is_none());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
