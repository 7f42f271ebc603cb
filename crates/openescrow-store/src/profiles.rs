//! User profiles: custodian sub-account mapping and completed-trade counters.

use std::collections::HashMap;

use openescrow_types::{AccountRef, OpenescrowError, Result, UserId};

/// One platform user's trading profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: UserId,
    /// The user's custodian sub-account.
    pub account: AccountRef,
    pub completed_trades: u64,
}

/// All profiles, keyed by user id.
#[derive(Default)]
pub struct ProfileStore {
    profiles: HashMap<UserId, Profile>,
}

impl ProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, user_id: UserId, account: AccountRef) {
        self.profiles.insert(
            user_id,
            Profile {
                user_id,
                account,
                completed_trades: 0,
            },
        );
    }

    /// The user's custodian sub-account.
    ///
    /// # Errors
    /// `ValidationFailed` if the user has no registered profile.
    pub fn account_of(&self, user_id: UserId) -> Result<AccountRef> {
        self.profiles
            .get(&user_id)
            .map(|p| p.account.clone())
            .ok_or_else(|| OpenescrowError::ValidationFailed {
                reason: format!("no profile for user {user_id}"),
            })
    }

    /// Bump the completed-trade counter (no-op for unknown users).
    pub fn increment_completed(&mut self, user_id: UserId) {
        if let Some(profile) = self.profiles.get_mut(&user_id) {
            profile.completed_trades += 1;
        }
    }

    #[must_use]
    pub fn completed_trades(&self, user_id: UserId) -> u64 {
        self.profiles.get(&user_id).map_or(0, |p| p.completed_trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let mut store = ProfileStore::new();
        let user = UserId::new();
        store.register(user, AccountRef::new("sub_1"));
        assert_eq!(store.completed_trades(user), 0);

        store.increment_completed(user);
        store.increment_completed(user);
        assert_eq!(store.completed_trades(user), 2);
    }

    #[test]
    fn unknown_user_has_no_account() {
        let store = ProfileStore::new();
        assert!(store.account_of(UserId::new()).is_err());
    }
}
