//! Security event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use vigil_util::EventId;

/// Kinds of security events, stored as plain strings in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// An actor outside the allowlist attempted a privileged operation
    UnauthorizedAccess,

    /// A command failed the whitelist prefix check
    BlockedCommand,

    /// A whitelisted command ran (regardless of exit code)
    CommandExecuted,

    /// Motion detection enabled
    MotionEnabled,

    /// Motion detection disabled
    MotionDisabled,

    /// Motion declared and an alert raised
    MotionDetected,

    /// The detection loop gave up after persistent device failures
    DetectionFailed,

    /// A recurring task was scheduled
    TaskScheduled,

    /// A recurring task was cancelled (soft delete)
    TaskCancelled,

    /// GPIO pin toggled
    GpioControl,

    /// System reboot requested
    SystemReboot,

    /// Daemon started
    SystemStarted,

    /// Daemon stopped
    SystemStopped,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnauthorizedAccess => "unauthorized_access",
            Self::BlockedCommand => "blocked_command",
            Self::CommandExecuted => "command_executed",
            Self::MotionEnabled => "motion_enabled",
            Self::MotionDisabled => "motion_disabled",
            Self::MotionDetected => "motion_detected",
            Self::DetectionFailed => "detection_failed",
            Self::TaskScheduled => "task_scheduled",
            Self::TaskCancelled => "task_cancelled",
            Self::GpioControl => "gpio_control",
            Self::SystemReboot => "system_reboot",
            Self::SystemStarted => "system_started",
            Self::SystemStopped => "system_stopped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unauthorized_access" => Some(Self::UnauthorizedAccess),
            "blocked_command" => Some(Self::BlockedCommand),
            "command_executed" => Some(Self::CommandExecuted),
            "motion_enabled" => Some(Self::MotionEnabled),
            "motion_disabled" => Some(Self::MotionDisabled),
            "motion_detected" => Some(Self::MotionDetected),
            "detection_failed" => Some(Self::DetectionFailed),
            "task_scheduled" => Some(Self::TaskScheduled),
            "task_cancelled" => Some(Self::TaskCancelled),
            "gpio_control" => Some(Self::GpioControl),
            "system_reboot" => Some(Self::SystemReboot),
            "system_started" => Some(Self::SystemStarted),
            "system_stopped" => Some(Self::SystemStopped),
            _ => None,
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only security event log.
///
/// Never mutated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: EventId,
    pub kind: SecurityEventKind,
    pub description: String,
    pub evidence_path: Option<String>,
    pub timestamp: DateTime<Local>,
}
