//! Escrow repository.
//!
//! Status changes are compare-and-set, which is what makes the expiry
//! sweep idempotent: of two concurrent sweep runs only one wins the
//! `PENDING → CANCELLED` transition, the other sees `StateConflict` and
//! skips the row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use openescrow_types::{Escrow, EscrowId, EscrowStatus, OpenescrowError, Result};

/// All escrows, keyed by id.
#[derive(Default)]
pub struct EscrowStore {
    escrows: HashMap<EscrowId, Escrow>,
}

impl EscrowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, escrow: Escrow) {
        self.escrows.insert(escrow.id, escrow);
    }

    #[must_use]
    pub fn get(&self, escrow_id: EscrowId) -> Option<Escrow> {
        self.escrows.get(&escrow_id).cloned()
    }

    /// Compare-and-set status transition.
    ///
    /// # Errors
    /// `StateConflict` if the current status is not `expected`.
    pub fn transition(
        &mut self,
        escrow_id: EscrowId,
        expected: EscrowStatus,
        next: EscrowStatus,
    ) -> Result<Escrow> {
        let escrow = self
            .escrows
            .get_mut(&escrow_id)
            .ok_or(OpenescrowError::EscrowNotFound(escrow_id))?;
        if escrow.status != expected {
            return Err(OpenescrowError::state_conflict(
                "escrow",
                expected,
                escrow.status,
            ));
        }
        escrow.status = next;
        escrow.updated_at = Utc::now();
        Ok(escrow.clone())
    }

    /// PENDING escrows whose payment window lapsed before `now`.
    #[must_use]
    pub fn expired_pending(&self, now: DateTime<Utc>) -> Vec<Escrow> {
        self.escrows
            .values()
            .filter(|e| e.status == EscrowStatus::Pending && e.is_expired_at(now))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.escrows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.escrows.is_empty()
    }
}
