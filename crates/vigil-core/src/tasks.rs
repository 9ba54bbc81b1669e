//! Scheduled task service
//!
//! Thin policy layer over the store: strict time validation on the way
//! in, soft delete on the way out, audit events for both. The command
//! text is stored verbatim; the whitelist is enforced when the scheduler
//! fires it.

use std::sync::Arc;
use tracing::info;
use vigil_store::{ScheduledTask, SecurityEventKind, Store};
use vigil_util::{OperatorId, TaskId, TimeOfDay, VigilError, VigilResult};

use crate::AuditSink;

pub struct TaskService {
    store: Arc<dyn Store>,
    audit: AuditSink,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, audit: AuditSink) -> Self {
        Self { store, audit }
    }

    /// Create a daily task firing at `time` (strict `HH:MM`)
    pub fn schedule(
        &self,
        owner: &OperatorId,
        time: &str,
        command: &str,
    ) -> VigilResult<ScheduledTask> {
        let time_of_day = TimeOfDay::parse(time)?;
        let command = command.trim();

        let task = self
            .store
            .insert_task(owner, command, time_of_day)
            .map_err(|e| VigilError::store(e.to_string()))?;

        info!(task_id = %task.id, owner = %owner, %time_of_day, command, "Task scheduled");
        self.audit.record(
            SecurityEventKind::TaskScheduled,
            &format!("Task {} by {owner}: '{command}' at {time_of_day}", task.id),
            None,
        );

        Ok(task)
    }

    pub fn list(&self, active_only: bool) -> VigilResult<Vec<ScheduledTask>> {
        self.store
            .list_tasks(active_only)
            .map_err(|e| VigilError::store(e.to_string()))
    }

    /// Soft-delete a task. `TaskNotFound` only for ids that never
    /// existed; cancelling an already-cancelled task is a quiet success.
    pub fn cancel(&self, id: TaskId) -> VigilResult<()> {
        let existed = self
            .store
            .deactivate_task(id)
            .map_err(|e| VigilError::store(e.to_string()))?;

        if !existed {
            return Err(VigilError::TaskNotFound(id));
        }

        info!(task_id = %id, "Task cancelled");
        self.audit.record(
            SecurityEventKind::TaskCancelled,
            &format!("Task {id} cancelled"),
            None,
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_store::SqliteStore;

    fn service() -> (TaskService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let service = TaskService::new(store.clone(), AuditSink::new(store.clone()));
        (service, store)
    }

    fn owner() -> OperatorId {
        OperatorId::new("1001")
    }

    #[test]
    fn schedule_list_cancel_round_trip() {
        let (service, store) = service();

        let task = service.schedule(&owner(), "22:00", "uptime").unwrap();
        assert_eq!(task.command, "uptime");
        assert!(task.active);

        let active = service.list(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, task.id);

        service.cancel(task.id).unwrap();
        assert!(service.list(true).unwrap().is_empty());

        // The row survives the soft delete
        let all = service.list(false).unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);

        let kinds: Vec<_> = store
            .recent_events(10)
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&SecurityEventKind::TaskScheduled));
        assert!(kinds.contains(&SecurityEventKind::TaskCancelled));
    }

    #[test]
    fn loose_time_is_rejected_before_storage() {
        let (service, _store) = service();

        for bad in ["9:30", "25:00", "12:60", "noon"] {
            let result = service.schedule(&owner(), bad, "uptime");
            assert!(
                matches!(result, Err(VigilError::InvalidTimeFormat(_))),
                "expected '{bad}' to be rejected"
            );
        }
        assert!(service.list(false).unwrap().is_empty());
    }

    #[test]
    fn cancel_unknown_task_is_an_error() {
        let (service, _store) = service();

        let result = service.cancel(TaskId::new(424242));
        assert!(matches!(result, Err(VigilError::TaskNotFound(_))));
    }

    #[test]
    fn cancel_is_idempotent_for_existing_tasks() {
        let (service, _store) = service();

        let task = service.schedule(&owner(), "06:15", "df -h").unwrap();
        service.cancel(task.id).unwrap();
        // Second cancel of a real row is not an error
        service.cancel(task.id).unwrap();
    }

    #[test]
    fn commands_are_not_whitelist_checked_at_schedule_time() {
        let (service, _store) = service();

        // Stored verbatim; enforcement happens when the scheduler fires
        let task = service.schedule(&owner(), "03:00", "definitely-not-whitelisted").unwrap();
        assert_eq!(task.command, "definitely-not-whitelisted");
    }
}
