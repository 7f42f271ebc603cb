//! Role / permission model.
//!
//! Consolidates authorization into one capability check: resolve the
//! caller's [`Role`] once, then gate operations on [`Role::has_permission`]
//! instead of ad hoc per-endpoint checks.

use serde::{Deserialize, Serialize};

/// A discrete capability an operation may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    Trade,
    ResolveDisputes,
    ResolveAlerts,
    RunReconciliation,
}

/// The caller's role, carrying its granted permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Role {
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Standard end-user role.
    #[must_use]
    pub fn user() -> Self {
        Self {
            name: "user".to_string(),
            permissions: vec![Permission::Trade],
        }
    }

    /// Platform administrator role.
    #[must_use]
    pub fn admin() -> Self {
        Self {
            name: "admin".to_string(),
            permissions: vec![
                Permission::Trade,
                Permission::ResolveDisputes,
                Permission::ResolveAlerts,
                Permission::RunReconciliation,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_cannot_resolve_disputes() {
        let role = Role::user();
        assert!(role.has_permission(Permission::Trade));
        assert!(!role.has_permission(Permission::ResolveDisputes));
    }

    #[test]
    fn admin_has_all() {
        let role = Role::admin();
        for p in [
            Permission::Trade,
            Permission::ResolveDisputes,
            Permission::ResolveAlerts,
            Permission::RunReconciliation,
        ] {
            assert!(role.has_permission(p), "admin missing {p:?}");
        }
    }
}
