//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Daemon-level settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Operators allowed to issue privileged requests
    #[serde(default)]
    pub operators: Vec<RawOperator>,

    /// Allowed command prefixes, in order
    #[serde(default)]
    pub command_whitelist: Vec<String>,

    /// Motion detection tuning
    #[serde(default)]
    pub motion: RawMotionConfig,

    /// Command execution limits
    #[serde(default)]
    pub command: RawCommandConfig,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// IPC socket path (default: /run/vigild/vigild.sock)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Directory for evidence captures
    pub media_dir: Option<PathBuf>,
}

/// One entry in the operator allowlist
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawOperator {
    /// Opaque identity as presented by the transport
    pub id: String,

    /// Display name for the audit trail
    pub name: Option<String>,
}

/// Motion detection tuning
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMotionConfig {
    /// Minimum connected-region area (pixels) counted as motion
    pub area_threshold: Option<u32>,

    /// Minimum seconds between two alerts
    pub cooldown_seconds: Option<u64>,

    /// Delay between detection iterations, in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Expected frame dimensions from the capture source
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,

    /// External capture command producing raw RGB24 frames on stdout
    #[serde(default)]
    pub capture_command: Vec<String>,
}

/// Command execution limits
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCommandConfig {
    /// Wall-clock timeout in seconds
    pub timeout_seconds: Option<u64>,

    /// Output cap in characters before truncation
    pub output_cap: Option<usize>,
}
