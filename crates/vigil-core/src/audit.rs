//! Best-effort audit sink
//!
//! Every component records security events through this sink. Writes are
//! durable when they succeed, but a failing store must never block the
//! operation that triggered the event: the failure goes to the
//! operational log and the caller proceeds.

use std::sync::Arc;
use tracing::{debug, error};
use vigil_store::{SecurityEvent, SecurityEventKind, Store};
use vigil_util::{VigilError, VigilResult};

/// Shared handle for recording security events
#[derive(Clone)]
pub struct AuditSink {
    store: Arc<dyn Store>,
}

impl AuditSink {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a security event, best-effort.
    ///
    /// One bounded retry on failure, then the error is logged and
    /// swallowed. This never propagates to the caller.
    pub fn record(
        &self,
        kind: SecurityEventKind,
        description: &str,
        evidence_path: Option<&str>,
    ) {
        for attempt in 0..2 {
            match self.store.append_event(kind, description, evidence_path) {
                Ok(id) => {
                    debug!(event_id = %id, kind = %kind, description, "Security event recorded");
                    return;
                }
                Err(e) if attempt == 0 => {
                    debug!(error = %e, kind = %kind, "Audit write failed, retrying once");
                }
                Err(e) => {
                    error!(error = %e, kind = %kind, description, "Audit write failed, event dropped");
                }
            }
        }
    }

    /// List recent events, most recent first
    pub fn recent(&self, limit: usize) -> VigilResult<Vec<SecurityEvent>> {
        self.store
            .recent_events(limit)
            .map_err(|e| VigilError::store(e.to_string()))
    }

    /// Whether the underlying store currently answers queries
    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use vigil_store::{ScheduledTask, StoreError, StoreResult};
    use vigil_util::{EventId, OperatorId, TaskId, TimeOfDay};

    /// A store whose writes always fail
    pub(crate) struct FailingStore;

    impl Store for FailingStore {
        fn append_event(
            &self,
            _kind: SecurityEventKind,
            _description: &str,
            _evidence_path: Option<&str>,
        ) -> StoreResult<EventId> {
            Err(StoreError::Database("disk full".into()))
        }

        fn recent_events(&self, _limit: usize) -> StoreResult<Vec<SecurityEvent>> {
            Err(StoreError::Database("disk full".into()))
        }

        fn insert_task(
            &self,
            _owner: &OperatorId,
            _command: &str,
            _time_of_day: TimeOfDay,
        ) -> StoreResult<ScheduledTask> {
            Err(StoreError::Database("disk full".into()))
        }

        fn list_tasks(&self, _active_only: bool) -> StoreResult<Vec<ScheduledTask>> {
            Err(StoreError::Database("disk full".into()))
        }

        fn deactivate_task(&self, _id: TaskId) -> StoreResult<bool> {
            Err(StoreError::Database("disk full".into()))
        }

        fn is_healthy(&self) -> bool {
            false
        }
    }
}
