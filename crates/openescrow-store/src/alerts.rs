//! Alert store with a resolution audit trail.

use std::collections::HashMap;

use chrono::Utc;

use openescrow_types::{Alert, AlertId, OpenescrowError, Result, UserId};

/// All alerts, keyed by id.
#[derive(Default)]
pub struct AlertStore {
    alerts: HashMap<AlertId, Alert>,
}

impl AlertStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, alert: Alert) -> AlertId {
        let id = alert.id;
        self.alerts.insert(id, alert);
        id
    }

    #[must_use]
    pub fn get(&self, alert_id: AlertId) -> Option<Alert> {
        self.alerts.get(&alert_id).cloned()
    }

    /// Unresolved alerts, newest first.
    #[must_use]
    pub fn active(&self) -> Vec<Alert> {
        let mut out: Vec<Alert> = self.alerts.values().filter(|a| !a.resolved).cloned().collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out
    }

    /// Resolve an alert; the only exit from the unresolved state.
    ///
    /// # Errors
    /// `StateConflict` if the alert is already resolved.
    pub fn resolve(&mut self, alert_id: AlertId, resolved_by: UserId) -> Result<Alert> {
        let alert = self
            .alerts
            .get_mut(&alert_id)
            .ok_or(OpenescrowError::AlertNotFound(alert_id))?;
        if alert.resolved {
            return Err(OpenescrowError::state_conflict("alert", "unresolved", "resolved"));
        }
        alert.resolved = true;
        alert.resolved_by = Some(resolved_by);
        alert.resolved_at = Some(Utc::now());
        Ok(alert.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openescrow_types::{AlertKind, Severity};

    fn alert() -> Alert {
        Alert::new(
            AlertKind::LargeTransaction,
            Severity::Warning,
            "big one",
            serde_json::json!({}),
        )
    }

    #[test]
    fn resolve_is_audited_and_single_shot() {
        let mut store = AlertStore::new();
        let id = store.append(alert());
        assert_eq!(store.active().len(), 1);

        let admin = UserId::new();
        let resolved = store.resolve(id, admin).unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.resolved_by, Some(admin));
        assert!(store.active().is_empty());

        let err = store.resolve(id, admin).unwrap_err();
        assert!(matches!(err, OpenescrowError::StateConflict { .. }));
    }

    #[test]
    fn active_newest_first() {
        let mut store = AlertStore::new();
        let first = store.append(alert());
        let second = store.append(alert());
        let active = store.active();
        assert_eq!(active[0].id, second);
        assert_eq!(active[1].id, first);
    }
}
