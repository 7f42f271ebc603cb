//! Reconciliation checkpoint and drift log.
//!
//! The checkpoint marks how far the transaction feed has been fully
//! ingested. It advances only through [`ReconciliationState::advance`],
//! monotonically, and only after every insert in a batch succeeded — a
//! checkpoint that jumps a failed batch makes the missed transaction
//! permanently unreachable.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use openescrow_types::ReconciliationRecord;

/// Persisted high-water mark for transaction ingestion.
#[derive(Default)]
pub struct ReconciliationState {
    checkpoint: Option<DateTime<Utc>>,
}

impl ReconciliationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn checkpoint(&self) -> Option<DateTime<Utc>> {
        self.checkpoint
    }

    /// Move the checkpoint forward. Backward moves are ignored.
    pub fn advance(&mut self, to: DateTime<Utc>) {
        if self.checkpoint.is_none_or(|current| to > current) {
            self.checkpoint = Some(to);
        }
    }
}

/// Append-only history of detected drift.
#[derive(Default)]
pub struct ReconciliationLog {
    records: Vec<ReconciliationRecord>,
}

impl ReconciliationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        subject: impl Into<String>,
        custodian_value: Decimal,
        local_value: Decimal,
    ) {
        self.records.push(ReconciliationRecord {
            subject: subject.into(),
            custodian_value,
            local_value,
            detected_at: Utc::now(),
        });
    }

    #[must_use]
    pub fn records(&self) -> &[ReconciliationRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
