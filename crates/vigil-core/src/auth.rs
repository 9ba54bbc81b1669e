//! Authorization gate
//!
//! Every privileged entry point calls `authorize` before doing anything
//! else. Denials are audited; allowed requests pass silently so routine
//! traffic does not flood the event trail.

use std::collections::HashSet;
use tracing::warn;
use vigil_config::Operator;
use vigil_store::SecurityEventKind;
use vigil_util::{OperatorId, VigilError, VigilResult};

use crate::AuditSink;

/// Static allowlist gate
pub struct AuthGate {
    allowed: HashSet<OperatorId>,
    audit: AuditSink,
}

impl AuthGate {
    pub fn new(operators: &[Operator], audit: AuditSink) -> Self {
        Self {
            allowed: operators.iter().map(|o| o.id.clone()).collect(),
            audit,
        }
    }

    /// Check an actor against the allowlist.
    ///
    /// A denial records one `unauthorized_access` event and short-circuits
    /// the caller before any side effect.
    pub fn authorize(&self, actor: &OperatorId, display_name: Option<&str>) -> VigilResult<()> {
        if self.allowed.contains(actor) {
            return Ok(());
        }

        let name = display_name.unwrap_or("unknown");
        warn!(actor = %actor, name, "Unauthorized access attempt");
        self.audit.record(
            SecurityEventKind::UnauthorizedAccess,
            &format!("Actor {actor} ({name}) attempted access"),
            None,
        );

        Err(VigilError::Unauthorized(actor.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_store::{SqliteStore, Store};

    fn gate_with_store() -> (AuthGate, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let operators = vec![
            Operator {
                id: OperatorId::new("1001"),
                name: Some("alice".into()),
            },
            Operator {
                id: OperatorId::new("1002"),
                name: None,
            },
        ];
        let gate = AuthGate::new(&operators, AuditSink::new(store.clone()));
        (gate, store)
    }

    #[test]
    fn allowed_operator_passes_silently() {
        let (gate, store) = gate_with_store();

        gate.authorize(&OperatorId::new("1001"), Some("alice")).unwrap();

        // Routine access is not audited
        assert!(store.recent_events(10).unwrap().is_empty());
    }

    #[test]
    fn denied_operator_is_audited_exactly_once() {
        let (gate, store) = gate_with_store();

        let result = gate.authorize(&OperatorId::new("6666"), Some("mallory"));
        assert!(matches!(result, Err(VigilError::Unauthorized(_))));

        let events = store.recent_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::UnauthorizedAccess);
        assert!(events[0].description.contains("6666"));
        assert!(events[0].description.contains("mallory"));
    }
}
