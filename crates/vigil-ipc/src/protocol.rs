//! Wire protocol for the vigild socket
//!
//! One JSON document per line in both directions. Requests carry the
//! claimed actor identity; the daemon decides whether to believe it.
//! Responses correlate by request id. Subscribed clients additionally
//! receive unsolicited `Alert` lines.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use vigil_store::{ScheduledTask, SecurityEvent};
use vigil_util::VigilError;

/// Protocol version
pub const API_VERSION: u32 = 1;

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// Protocol version
    pub api_version: u32,
    /// Claimed operator id
    pub actor_id: String,
    /// Optional display name, used in audit descriptions
    pub actor_name: Option<String>,
    /// The operation
    pub op: RequestOp,
}

impl Request {
    pub fn new(
        request_id: u64,
        actor_id: impl Into<String>,
        actor_name: Option<String>,
        op: RequestOp,
    ) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            actor_id: actor_id.into(),
            actor_name,
            op,
        }
    }
}

/// All operations a client can request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestOp {
    /// Run a whitelisted command
    RunCommand { command: String },

    /// Run a transcribed voice command
    VoiceCommand { transcript: String },

    /// Create a daily task at a strict HH:MM time
    ScheduleTask { time: String, command: String },

    /// Soft-delete a task
    CancelTask { task_id: i64 },

    /// List tasks
    ListTasks {
        #[serde(default)]
        include_cancelled: bool,
    },

    /// List recent security events, most recent first
    RecentEvents { limit: usize },

    /// Enable or disable motion detection
    SetMotion { enabled: bool },

    /// Capture one frame on demand
    Photo,

    /// Summarize what the service is doing
    Status,

    /// Request a host reboot
    Reboot,

    /// Drive a GPIO line
    Gpio { pin: u32, on: bool },

    /// Receive alert pushes on this connection
    SubscribeAlerts,
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// Protocol version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information carried back to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&VigilError> for ErrorInfo {
    /// Wire mapping: the code names the category, the message is the
    /// operator-facing text. Internal detail never crosses the socket.
    fn from(e: &VigilError) -> Self {
        let code = match e {
            VigilError::Unauthorized(_) => ErrorCode::Unauthorized,
            VigilError::NotWhitelisted(_) => ErrorCode::NotWhitelisted,
            VigilError::InvalidTimeFormat(_) => ErrorCode::InvalidTime,
            VigilError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            VigilError::CommandTimeout(_) => ErrorCode::Timeout,
            VigilError::TranscriptionEmpty => ErrorCode::TranscriptionEmpty,
            VigilError::DeviceFailure(_)
            | VigilError::StoreError(_)
            | VigilError::ConfigError(_)
            | VigilError::TransportError(_)
            | VigilError::Internal(_) => ErrorCode::InternalError,
        };
        Self::new(code, e.user_message())
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    Unauthorized,
    NotWhitelisted,
    InvalidTime,
    TaskNotFound,
    Timeout,
    TranscriptionEmpty,
    InternalError,
}

/// Successful payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// Operation completed, nothing to report
    Ack,

    /// Captured command output
    CommandOutput {
        output: String,
        exit_code: Option<i32>,
        truncated: bool,
    },

    Task {
        task: TaskView,
    },

    Tasks {
        tasks: Vec<TaskView>,
    },

    Events {
        events: Vec<EventView>,
    },

    /// Motion toggle result
    Motion {
        changed: bool,
        active: bool,
    },

    /// Path of an on-demand snapshot; the client reads the file locally
    Photo {
        path: String,
    },

    /// Service status summary
    Status {
        motion_active: bool,
        store_healthy: bool,
        active_tasks: usize,
    },

    Subscribed,
}

/// Wire representation of a scheduled task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: i64,
    pub owner: String,
    pub command: String,
    pub time: String,
    pub frequency: String,
    pub active: bool,
    pub created_at: DateTime<Local>,
}

impl From<&ScheduledTask> for TaskView {
    fn from(t: &ScheduledTask) -> Self {
        Self {
            id: t.id.as_i64(),
            owner: t.owner.to_string(),
            command: t.command.clone(),
            time: t.time_of_day.to_string(),
            frequency: t.frequency.to_string(),
            active: t.active,
            created_at: t.created_at,
        }
    }
}

/// Wire representation of a security event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    pub id: i64,
    pub kind: String,
    pub description: String,
    pub evidence_path: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl From<&SecurityEvent> for EventView {
    fn from(e: &SecurityEvent) -> Self {
        Self {
            id: e.id.as_i64(),
            kind: e.kind.to_string(),
            description: e.description.clone(),
            evidence_path: e.evidence_path.clone(),
            timestamp: e.timestamp,
        }
    }
}

/// Unsolicited push to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alert {
    /// Motion trigger, with the evidence frame when one was saved
    Motion {
        caption: String,
        evidence_path: Option<String>,
    },

    /// Plain text notice (startup, shutdown)
    Notice { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip() {
        let request = Request::new(
            7,
            "1001",
            Some("alice".into()),
            RequestOp::ScheduleTask {
                time: "22:00".into(),
                command: "uptime".into(),
            },
        );

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"schedule_task\""));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, 7);
        assert_eq!(parsed.actor_id, "1001");
        assert!(matches!(parsed.op, RequestOp::ScheduleTask { .. }));
    }

    #[test]
    fn list_tasks_defaults_to_active_only() {
        let json = r#"{"request_id":1,"api_version":1,"actor_id":"1001","actor_name":null,"op":{"type":"list_tasks"}}"#;
        let parsed: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parsed.op,
            RequestOp::ListTasks {
                include_cancelled: false
            }
        ));
    }

    #[test]
    fn bare_ops_parse_without_a_body() {
        for (json_type, want_status) in [("photo", false), ("status", true)] {
            let json = format!(
                r#"{{"request_id":2,"api_version":1,"actor_id":"1001","actor_name":null,"op":{{"type":"{json_type}"}}}}"#
            );
            let parsed: Request = serde_json::from_str(&json).unwrap();
            match parsed.op {
                RequestOp::Photo => assert!(!want_status),
                RequestOp::Status => assert!(want_status),
                other => panic!("unexpected op {other:?}"),
            }
        }
    }

    #[test]
    fn internal_errors_are_not_leaked_on_the_wire() {
        let err = VigilError::store("unique constraint violated in scheduled_tasks");
        let info = ErrorInfo::from(&err);
        assert_eq!(info.code, ErrorCode::InternalError);
        assert_eq!(info.message, "An internal error occurred.");
    }

    #[test]
    fn policy_errors_carry_their_category() {
        let err = VigilError::NotWhitelisted("rm -rf /".into());
        let info = ErrorInfo::from(&err);
        assert_eq!(info.code, ErrorCode::NotWhitelisted);
        assert!(info.message.contains("rm -rf /"));

        let err = VigilError::InvalidTimeFormat("9:30".into());
        assert_eq!(ErrorInfo::from(&err).code, ErrorCode::InvalidTime);
    }

    #[test]
    fn alert_round_trip() {
        let alert = Alert::Motion {
            caption: "Motion detected at 2026-03-10 14:05:00".into(),
            evidence_path: Some("/var/lib/vigild/media/motion_20260310_140500.jpg".into()),
        };
        let json = serde_json::to_string(&alert).unwrap();
        let parsed: Alert = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, Alert::Motion { .. }));
    }
}
