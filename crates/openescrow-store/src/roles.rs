//! Role directory — resolves a user's capability set.
//!
//! Unknown users get the standard end-user role; only explicitly assigned
//! users carry elevated permissions.

use std::collections::HashMap;

use openescrow_types::{Role, UserId};

/// Per-user role assignments.
#[derive(Default)]
pub struct RoleDirectory {
    assignments: HashMap<UserId, Role>,
}

impl RoleDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, user_id: UserId, role: Role) {
        self.assignments.insert(user_id, role);
    }

    /// The user's role; defaults to [`Role::user`].
    #[must_use]
    pub fn resolve_role(&self, user_id: UserId) -> Role {
        self.assignments.get(&user_id).cloned().unwrap_or_else(Role::user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openescrow_types::Permission;

    #[test]
    fn unknown_user_defaults_to_user_role() {
        let dir = RoleDirectory::new();
        let role = dir.resolve_role(UserId::new());
        assert_eq!(role.name, "user");
        assert!(!role.has_permission(Permission::ResolveDisputes));
    }

    #[test]
    fn assigned_admin_resolves() {
        let mut dir = RoleDirectory::new();
        let admin = UserId::new();
        dir.assign(admin, Role::admin());
        assert!(dir.resolve_role(admin).has_permission(Permission::ResolveDisputes));
    }
}
