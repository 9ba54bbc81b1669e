//! Motion detection engine
//!
//! One long-lived background worker reads consecutive frames and declares
//! motion through the pipeline in `detect`. The engine state machine and
//! the alert cooldown live behind a single mutex shared with the request
//! domain, because enable/disable transitions race with the worker's
//! cooldown check otherwise.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vigil_config::MotionTuning;
use vigil_store::SecurityEventKind;
use vigil_util::{format_file_stamp, MonotonicInstant, VigilError, VigilResult};

use crate::{detect_motion, AuditSink, Frame, FrameSource};

/// Bounded wait for the worker to exit on disable
pub const DISABLE_WAIT: Duration = Duration::from_secs(5);

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Disabled,
    Enabling,
    Running,
    Disabling,
}

/// Raised to the daemon loop when motion triggers outside the cooldown
#[derive(Debug, Clone)]
pub struct MotionAlert {
    pub evidence_path: Option<PathBuf>,
    pub at: chrono::DateTime<Local>,
}

struct EngineShared {
    state: EngineState,
    last_alert: Option<MonotonicInstant>,
    /// Bumped on every enable. A worker from an earlier generation must
    /// exit even when the state reads `Running` again: disable can time
    /// out on a worker stuck in a blocking read, and a later enable
    /// starts a replacement while the old one is still alive.
    generation: u64,
}

/// The motion detection engine
pub struct MotionEngine {
    shared: Arc<Mutex<EngineShared>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    tuning: MotionTuning,
    media_dir: PathBuf,
    audit: AuditSink,
    alert_tx: mpsc::UnboundedSender<MotionAlert>,
    failure_backoff: Duration,
    max_consecutive_failures: u32,
    disable_wait: Duration,
}

impl MotionEngine {
    pub fn new(
        tuning: MotionTuning,
        media_dir: PathBuf,
        audit: AuditSink,
        alert_tx: mpsc::UnboundedSender<MotionAlert>,
    ) -> Self {
        Self {
            shared: Arc::new(Mutex::new(EngineShared {
                state: EngineState::Disabled,
                last_alert: None,
                generation: 0,
            })),
            worker: tokio::sync::Mutex::new(None),
            tuning,
            media_dir,
            audit,
            alert_tx,
            failure_backoff: Duration::from_secs(1),
            max_consecutive_failures: 5,
            disable_wait: DISABLE_WAIT,
        }
    }

    /// Override the per-iteration failure policy (used by tests)
    pub fn with_failure_policy(mut self, backoff: Duration, max_failures: u32) -> Self {
        self.failure_backoff = backoff;
        self.max_consecutive_failures = max_failures;
        self
    }

    /// Override the bounded disable wait (used by tests)
    pub fn with_disable_wait(mut self, wait: Duration) -> Self {
        self.disable_wait = wait;
        self
    }

    pub fn state(&self) -> EngineState {
        self.shared.lock().unwrap().state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), EngineState::Enabling | EngineState::Running)
    }

    /// Spawn the detection worker. Returns false as a no-op when the
    /// engine is already active.
    pub async fn enable(&self, source: Box<dyn FrameSource>) -> VigilResult<bool> {
        let generation = {
            let mut shared = self.shared.lock().unwrap();
            match shared.state {
                EngineState::Disabled => {
                    shared.state = EngineState::Enabling;
                    shared.generation += 1;
                    shared.generation
                }
                _ => return Ok(false),
            }
        };

        if let Err(e) = std::fs::create_dir_all(&self.media_dir) {
            // Failed before the worker spawned: roll the transition back
            // so the engine stays usable.
            self.shared.lock().unwrap().state = EngineState::Disabled;
            return Err(VigilError::internal(format!(
                "failed to create media dir: {e}"
            )));
        }

        let ctx = WorkerContext {
            shared: self.shared.clone(),
            generation,
            tuning: self.tuning.clone(),
            media_dir: self.media_dir.clone(),
            audit: self.audit.clone(),
            alert_tx: self.alert_tx.clone(),
            failure_backoff: self.failure_backoff,
            max_consecutive_failures: self.max_consecutive_failures,
        };

        let handle = tokio::task::spawn_blocking(move || detection_loop(ctx, source));
        *self.worker.lock().await = Some(handle);

        self.shared.lock().unwrap().state = EngineState::Running;

        info!("Motion detection enabled");
        self.audit.record(
            SecurityEventKind::MotionEnabled,
            "Motion detection enabled",
            None,
        );

        Ok(true)
    }

    /// Signal the worker to stop and wait a bounded time for it to exit.
    /// Returns false as a no-op when the engine is not active.
    pub async fn disable(&self) -> VigilResult<bool> {
        {
            let mut shared = self.shared.lock().unwrap();
            match shared.state {
                EngineState::Enabling | EngineState::Running => {
                    shared.state = EngineState::Disabling;
                }
                _ => return Ok(false),
            }
        }

        if let Some(handle) = self.worker.lock().await.take()
            && tokio::time::timeout(self.disable_wait, handle).await.is_err()
        {
            // The stop request stands; the worker will observe it on its
            // next iteration, but the caller is not blocked any longer.
            warn!("Detection worker did not stop within bounded wait");
        }

        self.shared.lock().unwrap().state = EngineState::Disabled;

        info!("Motion detection disabled");
        self.audit.record(
            SecurityEventKind::MotionDisabled,
            "Motion detection disabled",
            None,
        );

        Ok(true)
    }
}

struct WorkerContext {
    shared: Arc<Mutex<EngineShared>>,
    generation: u64,
    tuning: MotionTuning,
    media_dir: PathBuf,
    audit: AuditSink,
    alert_tx: mpsc::UnboundedSender<MotionAlert>,
    failure_backoff: Duration,
    max_consecutive_failures: u32,
}

impl WorkerContext {
    fn should_continue(&self) -> bool {
        let shared = self.shared.lock().unwrap();
        shared.generation == self.generation
            && matches!(shared.state, EngineState::Enabling | EngineState::Running)
    }
}

/// The blocking detection loop
fn detection_loop(ctx: WorkerContext, mut source: Box<dyn FrameSource>) {
    info!("Motion detection worker started");

    let mut prev: Option<Frame> = None;
    let mut failures: u32 = 0;

    while ctx.should_continue() {
        let frame = match source.read_frame() {
            Ok(frame) => {
                failures = 0;
                frame
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, failures, "Frame read failed");

                if failures >= ctx.max_consecutive_failures {
                    error!(failures, "Frame source unrecoverable, stopping detection");
                    {
                        let mut shared = ctx.shared.lock().unwrap();
                        if shared.generation != ctx.generation {
                            // A replacement worker owns the state now;
                            // exit without touching it.
                            return;
                        }
                        shared.state = EngineState::Disabled;
                    }
                    // Exactly one terminal event, not one per retry
                    ctx.audit.record(
                        SecurityEventKind::DetectionFailed,
                        &format!("Frame source failed {failures} times: {e}"),
                        None,
                    );
                    return;
                }

                std::thread::sleep(ctx.failure_backoff);
                continue;
            }
        };

        if let Some(prev_frame) = &prev
            && detect_motion(prev_frame, &frame, ctx.tuning.area_threshold)
        {
            maybe_alert(&ctx, prev_frame);
        }

        prev = Some(frame);
        std::thread::sleep(ctx.tuning.poll_interval);
    }

    info!("Motion detection worker stopped");
}

/// Fire an alert for the triggering frame unless still inside the
/// cooldown window. Suppressed motion is dropped, not queued.
fn maybe_alert(ctx: &WorkerContext, triggering: &Frame) {
    let now = MonotonicInstant::now();

    {
        let mut shared = ctx.shared.lock().unwrap();

        if shared.generation != ctx.generation || shared.state != EngineState::Running {
            return;
        }
        if let Some(last) = shared.last_alert
            && now.duration_since(last) <= ctx.tuning.cooldown
        {
            return;
        }
        shared.last_alert = Some(now);
    }

    let at = Local::now();
    let path = ctx
        .media_dir
        .join(format!("motion_{}.jpg", format_file_stamp(&at)));

    let evidence_path = match triggering.save_jpeg(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            // The alert still goes out, just without an attachment
            error!(error = %e, path = %path.display(), "Failed to persist evidence frame");
            None
        }
    };

    warn!(evidence = ?evidence_path, "Motion detected");
    ctx.audit.record(
        SecurityEventKind::MotionDetected,
        "Motion detected",
        evidence_path.as_deref().and_then(Path::to_str),
    );

    let _ = ctx.alert_tx.send(MotionAlert { evidence_path, at });
}
