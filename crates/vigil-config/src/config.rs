//! Typed configuration (converted from the raw schema)

use std::path::PathBuf;
use std::time::Duration;

use vigil_util::OperatorId;

use crate::schema::RawConfig;

/// Default minimum connected-region area counted as motion, in pixels.
/// Tunable per deployment via `[motion] area_threshold`.
pub const DEFAULT_AREA_THRESHOLD: u32 = 5000;

/// Default minimum time between two motion alerts
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Default delay between detection iterations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default wall-clock timeout for whitelisted commands
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default output cap before truncation, in characters
pub const DEFAULT_OUTPUT_CAP: usize = 3900;

/// Validated daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub operators: Vec<Operator>,
    pub whitelist: CommandWhitelist,
    pub motion: MotionTuning,
    pub command: CommandLimits,
}

/// Daemon paths
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub media_dir: PathBuf,
}

/// An authorized operator
#[derive(Debug, Clone)]
pub struct Operator {
    pub id: OperatorId,
    pub name: Option<String>,
}

/// Ordered list of allowed command prefixes.
///
/// A command is permitted when it starts with any configured prefix,
/// irrespective of trailing arguments. The match is plain text, not
/// shell-token-aware.
#[derive(Debug, Clone)]
pub struct CommandWhitelist {
    prefixes: Vec<String>,
}

impl CommandWhitelist {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn permits(&self, command: &str) -> bool {
        self.prefixes.iter().any(|p| command.starts_with(p))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Motion detection tuning
#[derive(Debug, Clone)]
pub struct MotionTuning {
    pub area_threshold: u32,
    pub cooldown: Duration,
    pub poll_interval: Duration,
    pub frame_width: u32,
    pub frame_height: u32,
    pub capture_command: Vec<String>,
}

/// Command execution limits
#[derive(Debug, Clone)]
pub struct CommandLimits {
    pub timeout: Duration,
    pub output_cap: usize,
}

impl Config {
    /// Convert a validated raw config into the typed form
    pub fn from_raw(raw: RawConfig) -> Self {
        let data_dir = raw
            .daemon
            .data_dir
            .unwrap_or_else(|| PathBuf::from("/var/lib/vigild"));
        let media_dir = raw
            .daemon
            .media_dir
            .unwrap_or_else(|| data_dir.join("media"));
        let socket_path = raw
            .daemon
            .socket_path
            .unwrap_or_else(|| PathBuf::from("/run/vigild/vigild.sock"));

        let operators = raw
            .operators
            .into_iter()
            .map(|o| Operator {
                id: OperatorId::new(o.id),
                name: o.name,
            })
            .collect();

        Self {
            daemon: DaemonConfig {
                socket_path,
                data_dir,
                media_dir,
            },
            operators,
            whitelist: CommandWhitelist::new(raw.command_whitelist),
            motion: MotionTuning {
                area_threshold: raw.motion.area_threshold.unwrap_or(DEFAULT_AREA_THRESHOLD),
                cooldown: raw
                    .motion
                    .cooldown_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_COOLDOWN),
                poll_interval: raw
                    .motion
                    .poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_POLL_INTERVAL),
                frame_width: raw.motion.frame_width.unwrap_or(640),
                frame_height: raw.motion.frame_height.unwrap_or(480),
                capture_command: raw.motion.capture_command,
            },
            command: CommandLimits {
                timeout: raw
                    .command
                    .timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_COMMAND_TIMEOUT),
                output_cap: raw.command.output_cap.unwrap_or(DEFAULT_OUTPUT_CAP),
            },
        }
    }

    pub fn is_operator(&self, id: &OperatorId) -> bool {
        self.operators.iter().any(|o| &o.id == id)
    }
}
