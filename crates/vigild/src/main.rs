//! vigild - remote-controlled premises monitor
//!
//! This is the main entry point for the vigild service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization and audit sink
//! - Authorization gate, command gateway, task service
//! - Motion detection engine and capture source
//! - Scheduler driver
//! - IPC server and alert fan-out

mod capture;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use vigil_config::{load_config, Config};
use vigil_core::{
    Actor, AlertDispatcher, AuditSink, AuthGate, CommandGateway, Monitor, MotionAlert,
    MotionEngine, SchedulerDriver, SourceFactory, SystemActions, TaskService,
};
use vigil_ipc::{
    ErrorCode, ErrorInfo, IpcServer, IpcTransport, Request, RequestOp, Response, ResponsePayload,
    ServerMessage, TaskView,
};
use vigil_store::{SecurityEventKind, SqliteStore, Store};
use vigil_util::{ClientId, OperatorId, TaskId};

use capture::CaptureSource;

/// vigild - premises monitoring and command authorization service
#[derive(Parser, Debug)]
#[command(name = "vigild")]
#[command(about = "Premises monitoring and command authorization service", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/vigild/config.toml")]
    config: PathBuf,

    /// Socket path override (or set VIGIL_SOCKET env var)
    #[arg(short, long, env = "VIGIL_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set VIGIL_DATA_DIR env var)
    #[arg(short, long, env = "VIGIL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    monitor: Arc<Monitor>,
    engine: Arc<MotionEngine>,
    dispatcher: Arc<AlertDispatcher>,
    scheduler: Option<SchedulerDriver>,
    ipc: Arc<IpcServer>,
    audit: AuditSink,
    alert_rx: mpsc::UnboundedReceiver<MotionAlert>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            operators = config.operators.len(),
            whitelist_entries = config.whitelist.prefixes().len(),
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.daemon.socket_path.clone());
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.daemon.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("vigild.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let audit = AuditSink::new(store.clone());
        audit.record(SecurityEventKind::SystemStarted, "vigild started", None);

        let gate = AuthGate::new(&config.operators, audit.clone());
        let gateway = Arc::new(CommandGateway::new(
            config.whitelist.clone(),
            audit.clone(),
            config.command.clone(),
        ));
        let tasks = Arc::new(TaskService::new(store.clone(), audit.clone()));

        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        let media_dir = config.daemon.media_dir.clone();
        let engine = Arc::new(MotionEngine::new(
            config.motion.clone(),
            media_dir,
            audit.clone(),
            alert_tx,
        ));

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;
        let ipc = Arc::new(ipc);

        info!(socket_path = %socket_path.display(), "IPC server started");

        let transport = Arc::new(IpcTransport::new(ipc.clone()));
        let recipients: Vec<OperatorId> = config.operators.iter().map(|o| o.id.clone()).collect();
        let dispatcher = Arc::new(AlertDispatcher::new(transport, recipients));

        let monitor = Arc::new(Monitor::new(
            gate,
            audit.clone(),
            gateway.clone(),
            tasks.clone(),
            engine.clone(),
            capture_factory(&config),
            config.daemon.media_dir.clone(),
            SystemActions::default(),
        ));

        let scheduler = SchedulerDriver::new(tasks, gateway);

        Ok(Self {
            monitor,
            engine,
            dispatcher,
            scheduler: Some(scheduler),
            ipc,
            audit,
            alert_rx,
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut ipc_messages = self
            .ipc
            .take_message_receiver()
            .await
            .context("Message receiver should be available")?;

        // Spawn IPC accept task
        let ipc_accept = self.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        // Spawn the scheduler
        let scheduler = self
            .scheduler
            .take()
            .context("Scheduler should be available")?;
        let scheduler_handle = tokio::spawn(scheduler.run());

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Motion alerts from the detection worker
                Some(alert) = self.alert_rx.recv() => {
                    self.dispatcher.dispatch(&alert).await;
                }

                // IPC messages
                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        // Graceful shutdown
        info!("Shutting down vigild");
        scheduler_handle.abort();

        // The engine is stopped directly: this is the daemon's own
        // lifecycle, not an operator request, so no gate applies
        if let Err(e) = self.engine.disable().await {
            warn!(error = %e, "Failed to stop motion detection cleanly");
        }

        self.dispatcher.broadcast("Monitoring stopped").await;
        self.audit
            .record(SecurityEventKind::SystemStopped, "vigild stopped", None);
        self.ipc.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let response = self.handle_request(&client_id, request).await;
                let _ = self.ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, peer_uid } => {
                debug!(client_id = %client_id, uid = ?peer_uid, "Client connected");
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
            }
        }
    }

    async fn handle_request(&self, client_id: &ClientId, request: Request) -> Response {
        let request_id = request.request_id;

        if request.api_version != vigil_ipc::API_VERSION {
            return Response::error(
                request_id,
                ErrorInfo::new(
                    ErrorCode::InvalidRequest,
                    format!("Unsupported api_version {}", request.api_version),
                ),
            );
        }

        let actor = Actor::new(request.actor_id.clone(), request.actor_name.clone());

        let result = match request.op {
            RequestOp::RunCommand { command } => self
                .monitor
                .run_command(&actor, &command)
                .await
                .map(|outcome| ResponsePayload::CommandOutput {
                    output: outcome.output,
                    exit_code: outcome.exit_code,
                    truncated: outcome.truncated,
                }),

            RequestOp::VoiceCommand { transcript } => self
                .monitor
                .voice_command(&actor, &transcript)
                .await
                .map(|outcome| ResponsePayload::CommandOutput {
                    output: outcome.output,
                    exit_code: outcome.exit_code,
                    truncated: outcome.truncated,
                }),

            RequestOp::ScheduleTask { time, command } => self
                .monitor
                .schedule_task(&actor, &time, &command)
                .map(|task| ResponsePayload::Task {
                    task: TaskView::from(&task),
                }),

            RequestOp::CancelTask { task_id } => self
                .monitor
                .cancel_task(&actor, TaskId::new(task_id))
                .map(|()| ResponsePayload::Ack),

            RequestOp::ListTasks { include_cancelled } => self
                .monitor
                .list_tasks(&actor, !include_cancelled)
                .map(|tasks| ResponsePayload::Tasks {
                    tasks: tasks.iter().map(TaskView::from).collect(),
                }),

            RequestOp::RecentEvents { limit } => {
                self.monitor
                    .recent_events(&actor, limit)
                    .map(|events| ResponsePayload::Events {
                        events: events.iter().map(Into::into).collect(),
                    })
            }

            RequestOp::SetMotion { enabled } => self
                .monitor
                .set_motion_enabled(&actor, enabled)
                .await
                .map(|changed| ResponsePayload::Motion {
                    changed,
                    active: self.monitor.motion_active(),
                }),

            RequestOp::Photo => self
                .monitor
                .snapshot(&actor)
                .await
                .map(|path| ResponsePayload::Photo {
                    path: path.display().to_string(),
                }),

            RequestOp::Status => {
                self.monitor
                    .status(&actor)
                    .map(|report| ResponsePayload::Status {
                        motion_active: report.motion_active,
                        store_healthy: report.store_healthy,
                        active_tasks: report.active_tasks,
                    })
            }

            RequestOp::Reboot => self.monitor.reboot(&actor).map(|()| ResponsePayload::Ack),

            RequestOp::Gpio { pin, on } => self
                .monitor
                .gpio(&actor, pin, on)
                .map(|()| ResponsePayload::Ack),

            RequestOp::SubscribeAlerts => match self.monitor.authorize_subscriber(&actor) {
                Ok(()) => {
                    self.ipc.set_subscriber(client_id, actor.id.clone()).await;
                    Ok(ResponsePayload::Subscribed)
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(payload) => Response::success(request_id, payload),
            Err(e) => {
                debug!(error = %e, actor = %actor.id, "Request failed");
                Response::error(request_id, ErrorInfo::from(&e))
            }
        }
    }
}

/// Build the frame-source factory from the configured capture command
fn capture_factory(config: &Config) -> SourceFactory {
    let command = config.motion.capture_command.clone();
    let width = config.motion.frame_width;
    let height = config.motion.frame_height;

    Box::new(move || {
        let source = CaptureSource::spawn(&command, width, height)?;
        Ok(Box::new(source))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting vigild");

    let service = Service::new(&args).await?;
    service.run().await
}
