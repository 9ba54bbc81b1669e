//! Store trait definitions

use vigil_util::{EventId, OperatorId, TaskId, TimeOfDay};

use crate::{ScheduledTask, SecurityEvent, SecurityEventKind, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Security event log

    /// Append a security event. Durable before the call returns.
    fn append_event(
        &self,
        kind: SecurityEventKind,
        description: &str,
        evidence_path: Option<&str>,
    ) -> StoreResult<EventId>;

    /// Get recent security events, most recent first
    fn recent_events(&self, limit: usize) -> StoreResult<Vec<SecurityEvent>>;

    // Scheduled tasks

    /// Insert a new daily task and return the stored row
    fn insert_task(
        &self,
        owner: &OperatorId,
        command: &str,
        time_of_day: TimeOfDay,
    ) -> StoreResult<ScheduledTask>;

    /// List tasks, optionally filtered to active ones, oldest first
    fn list_tasks(&self, active_only: bool) -> StoreResult<Vec<ScheduledTask>>;

    /// Soft-delete a task. Returns false when the id never existed.
    fn deactivate_task(&self, id: TaskId) -> StoreResult<bool>;

    // Health

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool;
}
