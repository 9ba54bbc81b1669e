//! Operations facade
//!
//! Every privileged entry point goes through `Monitor`, which checks the
//! authorization gate before touching any component. The IPC request
//! path and the scheduler-independent system actions all call these
//! operations directly; nothing else in the daemon reaches the gateway,
//! the engine or the task service.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};
use vigil_store::{ScheduledTask, SecurityEvent, SecurityEventKind};
use vigil_util::{format_file_stamp, now, OperatorId, TaskId, VigilError, VigilResult};

use crate::{
    AuditSink, AuthGate, CommandGateway, CommandOutcome, FrameSource, MotionEngine, TaskService,
    VoicePipeline,
};

/// Identity attached to an incoming request
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: OperatorId,
    pub name: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<OperatorId>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Builds a fresh frame source each time motion detection is enabled
pub type SourceFactory = Box<dyn Fn() -> VigilResult<Box<dyn FrameSource>> + Send + Sync>;

/// Commands spawned for the privileged system actions
pub struct SystemActions {
    pub reboot: Vec<String>,
    pub gpio: String,
}

impl Default for SystemActions {
    fn default() -> Self {
        Self {
            reboot: vec!["systemctl".into(), "reboot".into()],
            gpio: "gpioset".into(),
        }
    }
}

/// Point-in-time answer to a status request
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub motion_active: bool,
    pub store_healthy: bool,
    pub active_tasks: usize,
}

pub struct Monitor {
    gate: AuthGate,
    audit: AuditSink,
    gateway: Arc<CommandGateway>,
    voice: VoicePipeline,
    tasks: Arc<TaskService>,
    engine: Arc<MotionEngine>,
    source_factory: SourceFactory,
    media_dir: PathBuf,
    actions: SystemActions,
}

impl Monitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gate: AuthGate,
        audit: AuditSink,
        gateway: Arc<CommandGateway>,
        tasks: Arc<TaskService>,
        engine: Arc<MotionEngine>,
        source_factory: SourceFactory,
        media_dir: PathBuf,
        actions: SystemActions,
    ) -> Self {
        let voice = VoicePipeline::new(gateway.clone());
        Self {
            gate,
            audit,
            gateway,
            voice,
            tasks,
            engine,
            source_factory,
            media_dir,
            actions,
        }
    }

    pub async fn run_command(&self, actor: &Actor, command: &str) -> VigilResult<CommandOutcome> {
        self.authorize(actor)?;
        self.gateway.execute(command, &actor.id).await
    }

    pub async fn voice_command(
        &self,
        actor: &Actor,
        transcript: &str,
    ) -> VigilResult<CommandOutcome> {
        self.authorize(actor)?;
        self.voice.handle(transcript, &actor.id).await
    }

    pub fn schedule_task(
        &self,
        actor: &Actor,
        time: &str,
        command: &str,
    ) -> VigilResult<ScheduledTask> {
        self.authorize(actor)?;
        self.tasks.schedule(&actor.id, time, command)
    }

    pub fn cancel_task(&self, actor: &Actor, id: TaskId) -> VigilResult<()> {
        self.authorize(actor)?;
        self.tasks.cancel(id)
    }

    pub fn list_tasks(&self, actor: &Actor, active_only: bool) -> VigilResult<Vec<ScheduledTask>> {
        self.authorize(actor)?;
        self.tasks.list(active_only)
    }

    pub fn recent_events(&self, actor: &Actor, limit: usize) -> VigilResult<Vec<SecurityEvent>> {
        self.authorize(actor)?;
        self.audit.recent(limit)
    }

    /// Toggle motion detection. Returns whether the call changed anything
    /// (enabling while running and disabling while disabled are no-ops).
    pub async fn set_motion_enabled(&self, actor: &Actor, enabled: bool) -> VigilResult<bool> {
        self.authorize(actor)?;
        if enabled {
            let source = (self.source_factory)()?;
            self.engine.enable(source).await
        } else {
            self.engine.disable().await
        }
    }

    pub fn motion_active(&self) -> bool {
        self.engine.is_active()
    }

    /// Capture one frame on demand and persist it as a JPEG.
    ///
    /// Opens a fresh source for the single read, so it works whether or
    /// not the detection worker is running.
    pub async fn snapshot(&self, actor: &Actor) -> VigilResult<PathBuf> {
        self.authorize(actor)?;

        let mut source = (self.source_factory)()?;
        let frame = tokio::task::spawn_blocking(move || source.read_frame())
            .await
            .map_err(|e| VigilError::internal(format!("snapshot task failed: {e}")))??;

        std::fs::create_dir_all(&self.media_dir)
            .map_err(|e| VigilError::internal(format!("failed to create media dir: {e}")))?;
        let path = self
            .media_dir
            .join(format!("snapshot_{}.jpg", format_file_stamp(&now())));
        frame.save_jpeg(&path)?;

        info!(actor = %actor.id, path = %path.display(), "Snapshot captured");
        Ok(path)
    }

    /// Summarize what the service is doing right now
    pub fn status(&self, actor: &Actor) -> VigilResult<StatusReport> {
        self.authorize(actor)?;

        Ok(StatusReport {
            motion_active: self.engine.is_active(),
            store_healthy: self.audit.store_healthy(),
            active_tasks: self.tasks.list(true)?.len(),
        })
    }

    /// Gate an alert-subscription request; grants nothing by itself
    pub fn authorize_subscriber(&self, actor: &Actor) -> VigilResult<()> {
        self.authorize(actor)
    }

    /// Request a host reboot, fire-and-forget
    pub fn reboot(&self, actor: &Actor) -> VigilResult<()> {
        self.authorize(actor)?;

        warn!(actor = %actor.id, "System reboot requested");
        self.audit.record(
            SecurityEventKind::SystemReboot,
            &format!("Reboot requested by {}", actor.id),
            None,
        );

        let (program, args) = self
            .actions
            .reboot
            .split_first()
            .ok_or_else(|| VigilError::internal("no reboot command configured"))?;
        spawn_detached(program, args.iter().map(String::as_str))
    }

    /// Drive a GPIO line high or low, fire-and-forget
    pub fn gpio(&self, actor: &Actor, pin: u32, on: bool) -> VigilResult<()> {
        self.authorize(actor)?;

        let level: u8 = if on { 1 } else { 0 };
        info!(actor = %actor.id, pin, on, "GPIO control");
        self.audit.record(
            SecurityEventKind::GpioControl,
            &format!("GPIO {pin} set {} by {}", if on { "on" } else { "off" }, actor.id),
            None,
        );

        let assignment = format!("{pin}={level}");
        spawn_detached(&self.actions.gpio, ["gpiochip0", assignment.as_str()])
    }

    fn authorize(&self, actor: &Actor) -> VigilResult<()> {
        self.gate.authorize(&actor.id, actor.name.as_deref())
    }
}

/// Spawn a process without waiting for it
fn spawn_detached<'a>(
    program: &str,
    args: impl IntoIterator<Item = &'a str>,
) -> VigilResult<()> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| VigilError::internal(format!("failed to spawn '{program}': {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frame;
    use std::path::PathBuf;
    use std::time::Duration;
    use vigil_config::{CommandLimits, CommandWhitelist, MotionTuning, Operator};
    use vigil_store::{SqliteStore, Store};

    /// Produces the same black frame forever: no motion, never fails
    struct StaticSource(Frame);

    impl FrameSource for StaticSource {
        fn read_frame(&mut self) -> VigilResult<Frame> {
            Ok(self.0.clone())
        }
    }

    fn static_factory() -> SourceFactory {
        Box::new(|| {
            Ok(Box::new(StaticSource(
                Frame::new(32, 32, vec![0; 32 * 32 * 3]).unwrap(),
            )))
        })
    }

    fn monitor(media_dir: PathBuf) -> (Monitor, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let audit = AuditSink::new(store.clone());

        let operators = vec![Operator {
            id: OperatorId::new("1001"),
            name: Some("alice".into()),
        }];
        let gate = AuthGate::new(&operators, audit.clone());

        let gateway = Arc::new(CommandGateway::new(
            CommandWhitelist::new(vec!["echo".into()]),
            audit.clone(),
            CommandLimits {
                timeout: Duration::from_secs(5),
                output_cap: 4000,
            },
        ));
        let tasks = Arc::new(TaskService::new(store.clone(), audit.clone()));

        let tuning = MotionTuning {
            area_threshold: 100,
            cooldown: Duration::from_secs(30),
            poll_interval: Duration::from_millis(5),
            frame_width: 32,
            frame_height: 32,
            capture_command: vec![],
        };
        let (alert_tx, _alert_rx) = tokio::sync::mpsc::unbounded_channel();
        let engine = Arc::new(MotionEngine::new(
            tuning,
            media_dir.clone(),
            audit.clone(),
            alert_tx,
        ));

        let monitor = Monitor::new(
            gate,
            audit,
            gateway,
            tasks,
            engine,
            static_factory(),
            media_dir,
            SystemActions {
                reboot: vec!["true".into()],
                gpio: "true".into(),
            },
        );
        (monitor, store)
    }

    fn operator() -> Actor {
        Actor::new("1001", Some("alice".into()))
    }

    fn stranger() -> Actor {
        Actor::new("6666", Some("mallory".into()))
    }

    fn count_kind(store: &SqliteStore, kind: SecurityEventKind) -> usize {
        store
            .recent_events(100)
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    #[tokio::test]
    async fn every_operation_rejects_strangers() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store) = monitor(dir.path().to_path_buf());
        let s = stranger();

        assert!(matches!(
            monitor.run_command(&s, "echo hi").await,
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.voice_command(&s, "echo hi").await,
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.schedule_task(&s, "12:00", "echo hi"),
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.cancel_task(&s, TaskId::new(1)),
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.list_tasks(&s, true),
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.recent_events(&s, 10),
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.set_motion_enabled(&s, true).await,
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(monitor.reboot(&s), Err(VigilError::Unauthorized(_))));
        assert!(matches!(
            monitor.gpio(&s, 17, true),
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.authorize_subscriber(&s),
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.snapshot(&s).await,
            Err(VigilError::Unauthorized(_))
        ));
        assert!(matches!(
            monitor.status(&s),
            Err(VigilError::Unauthorized(_))
        ));

        // One unauthorized_access event per attempt and nothing else
        let events = store.recent_events(100).unwrap();
        assert_eq!(events.len(), 12);
        assert!(events
            .iter()
            .all(|e| e.kind == SecurityEventKind::UnauthorizedAccess));
        assert!(!monitor.motion_active());
    }

    #[tokio::test]
    async fn operator_runs_commands_through_the_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store) = monitor(dir.path().to_path_buf());

        let outcome = monitor.run_command(&operator(), "echo ok").await.unwrap();
        assert!(outcome.success());
        assert_eq!(count_kind(&store, SecurityEventKind::CommandExecuted), 1);
    }

    #[tokio::test]
    async fn motion_toggle_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store) = monitor(dir.path().to_path_buf());
        let op = operator();

        assert!(monitor.set_motion_enabled(&op, true).await.unwrap());
        assert!(monitor.motion_active());
        // Second enable is a no-op
        assert!(!monitor.set_motion_enabled(&op, true).await.unwrap());

        assert!(monitor.set_motion_enabled(&op, false).await.unwrap());
        assert!(!monitor.motion_active());

        assert_eq!(count_kind(&store, SecurityEventKind::MotionEnabled), 1);
        assert_eq!(count_kind(&store, SecurityEventKind::MotionDisabled), 1);
    }

    #[tokio::test]
    async fn system_actions_are_audited() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store) = monitor(dir.path().to_path_buf());
        let op = operator();

        monitor.reboot(&op).unwrap();
        monitor.gpio(&op, 17, true).unwrap();
        monitor.gpio(&op, 17, false).unwrap();

        assert_eq!(count_kind(&store, SecurityEventKind::SystemReboot), 1);
        assert_eq!(count_kind(&store, SecurityEventKind::GpioControl), 2);

        let events = store.recent_events(10).unwrap();
        assert!(events.iter().any(|e| e.description.contains("GPIO 17 set on")));
    }

    #[tokio::test]
    async fn snapshot_saves_a_frame_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let media_dir = dir.path().join("media");
        let (monitor, _store) = monitor(media_dir.clone());

        let path = monitor.snapshot(&operator()).await.unwrap();
        assert!(path.starts_with(&media_dir));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn status_reflects_motion_and_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, _store) = monitor(dir.path().to_path_buf());
        let op = operator();

        let report = monitor.status(&op).unwrap();
        assert!(!report.motion_active);
        assert!(report.store_healthy);
        assert_eq!(report.active_tasks, 0);

        monitor.schedule_task(&op, "12:00", "echo lunch").unwrap();
        monitor.set_motion_enabled(&op, true).await.unwrap();

        let report = monitor.status(&op).unwrap();
        assert!(report.motion_active);
        assert_eq!(report.active_tasks, 1);

        monitor.set_motion_enabled(&op, false).await.unwrap();
    }

    #[tokio::test]
    async fn task_operations_flow_through_the_facade() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, _store) = monitor(dir.path().to_path_buf());
        let op = operator();

        let task = monitor.schedule_task(&op, "23:30", "echo nightly").unwrap();
        assert_eq!(monitor.list_tasks(&op, true).unwrap().len(), 1);

        monitor.cancel_task(&op, task.id).unwrap();
        assert!(monitor.list_tasks(&op, true).unwrap().is_empty());

        assert!(matches!(
            monitor.schedule_task(&op, "9:30", "echo x"),
            Err(VigilError::InvalidTimeFormat(_))
        ));
    }
}
