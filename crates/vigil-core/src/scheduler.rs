//! Scheduler driver
//!
//! Polls the task store and fires due tasks through the command gateway
//! under the owning operator's identity. The whitelist is enforced here,
//! at fire time, so a task whose command was removed from the whitelist
//! after scheduling is blocked and audited like any other attempt.

use chrono::{DateTime, Local, Timelike};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vigil_store::ScheduledTask;
use vigil_util::TaskId;

use crate::{CommandGateway, TaskService};

/// Poll cadence; two ticks per minute so no minute is skipped
pub const SCHEDULER_TICK: Duration = Duration::from_secs(30);

/// Active tasks whose time-of-day falls within the given minute
pub fn due_tasks<'a>(tasks: &'a [ScheduledTask], now: &DateTime<Local>) -> Vec<&'a ScheduledTask> {
    tasks
        .iter()
        .filter(|t| t.active && t.time_of_day.matches(now))
        .collect()
}

/// Tracks which tasks already fired in the current minute
#[derive(Default)]
struct FiredState {
    minute_key: Option<(u32, u32)>,
    fired: HashSet<TaskId>,
}

impl FiredState {
    /// Mark the minute and return true if the task has not fired in it yet
    fn claim(&mut self, id: TaskId, now: &DateTime<Local>) -> bool {
        let key = (now.hour(), now.minute());
        if self.minute_key != Some(key) {
            self.minute_key = Some(key);
            self.fired.clear();
        }
        self.fired.insert(id)
    }
}

pub struct SchedulerDriver {
    tasks: Arc<TaskService>,
    gateway: Arc<CommandGateway>,
}

impl SchedulerDriver {
    pub fn new(tasks: Arc<TaskService>, gateway: Arc<CommandGateway>) -> Self {
        Self { tasks, gateway }
    }

    /// Run forever; the daemon drops or aborts this on shutdown
    pub async fn run(self) {
        let mut state = FiredState::default();
        let mut ticker = tokio::time::interval(SCHEDULER_TICK);
        info!("Scheduler driver started");

        loop {
            ticker.tick().await;
            self.tick(&mut state, &Local::now()).await;
        }
    }

    async fn tick(&self, state: &mut FiredState, now: &DateTime<Local>) {
        let tasks = match self.tasks.list(true) {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "Failed to list tasks, skipping tick");
                return;
            }
        };

        for task in due_tasks(&tasks, now) {
            if !state.claim(task.id, now) {
                continue;
            }
            self.fire(task).await;
        }
    }

    /// Execute one due task under its owner's identity
    async fn fire(&self, task: &ScheduledTask) {
        info!(task_id = %task.id, owner = %task.owner, command = %task.command, "Firing scheduled task");

        match self.gateway.execute(&task.command, &task.owner).await {
            Ok(outcome) => {
                info!(task_id = %task.id, exit_code = ?outcome.exit_code, "Scheduled task completed");
            }
            Err(e) => {
                // Blocked or failed tasks stay scheduled; the audit trail
                // already carries the attempt
                warn!(task_id = %task.id, error = %e, "Scheduled task failed");
            }
        }
    }
}
