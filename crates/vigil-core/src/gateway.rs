//! Whitelisted command execution gateway
//!
//! The whitelist is a prefix match over the raw command string: it
//! protects which commands run, not what arguments they carry. Allowed
//! prefixes are assumed safe regardless of suffix, and everything runs
//! with the privileges of the hosting process.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};
use vigil_config::{CommandLimits, CommandWhitelist};
use vigil_store::SecurityEventKind;
use vigil_util::{OperatorId, VigilError, VigilResult};

use crate::AuditSink;

/// Marker appended when output exceeds the cap
pub const TRUNCATION_MARKER: &str = "\n\n... (truncated)";

/// Result of a completed command
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// stdout if non-empty, otherwise stderr
    pub output: String,
    /// Process exit code, None when killed by a signal
    pub exit_code: Option<i32>,
    /// Whether the output was cut at the cap
    pub truncated: bool,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Command execution gateway
pub struct CommandGateway {
    whitelist: CommandWhitelist,
    audit: AuditSink,
    limits: CommandLimits,
}

impl CommandGateway {
    pub fn new(whitelist: CommandWhitelist, audit: AuditSink, limits: CommandLimits) -> Self {
        Self {
            whitelist,
            audit,
            limits,
        }
    }

    pub fn whitelist(&self) -> &CommandWhitelist {
        &self.whitelist
    }

    /// Execute a raw command string for an already-authorized requester.
    ///
    /// Fails with `NotWhitelisted` before any process is spawned; a
    /// `blocked_command` event records the attempted string. On the happy
    /// path (including ordinary non-zero exits) a `command_executed`
    /// event records the literal command.
    pub async fn execute(&self, raw: &str, requester: &OperatorId) -> VigilResult<CommandOutcome> {
        let command = raw.trim();

        if command.is_empty() || !self.whitelist.permits(command) {
            warn!(requester = %requester, command, "Command blocked by whitelist");
            self.audit.record(
                SecurityEventKind::BlockedCommand,
                &format!("Attempted by {requester}: {command}"),
                None,
            );
            return Err(VigilError::NotWhitelisted(command.to_string()));
        }

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VigilError::internal(format!("failed to spawn '{command}': {e}")))?;

        let output = match tokio::time::timeout(self.limits.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(VigilError::internal(format!(
                    "failed waiting for '{command}': {e}"
                )));
            }
            Err(_) => {
                // Dropping the wait future kills the child (kill_on_drop)
                let secs = self.limits.timeout.as_secs();
                warn!(requester = %requester, command, timeout_secs = secs, "Command timed out");
                return Err(VigilError::CommandTimeout(secs));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let raw_output = if !stdout.is_empty() { stdout } else { stderr };

        let (text, truncated) = truncate_output(&raw_output, self.limits.output_cap);

        info!(
            requester = %requester,
            command,
            exit_code = ?output.status.code(),
            truncated,
            "Command executed"
        );
        self.audit.record(
            SecurityEventKind::CommandExecuted,
            &format!("Executed by {requester}: {command}"),
            None,
        );

        Ok(CommandOutcome {
            output: text,
            exit_code: output.status.code(),
            truncated,
        })
    }
}

/// Cap output at `cap` characters, appending the truncation marker when cut
fn truncate_output(s: &str, cap: usize) -> (String, bool) {
    let mut indices = s.char_indices();
    match indices.nth(cap) {
        Some((byte_pos, _)) => {
            let mut text = s[..byte_pos].to_string();
            text.push_str(TRUNCATION_MARKER);
            (text, true)
        }
        None => (s.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::test_support::FailingStore;
    use std::sync::Arc;
    use std::time::Duration;
    use vigil_store::{SqliteStore, Store};

    fn gateway(store: Arc<dyn Store>, timeout: Duration, cap: usize) -> CommandGateway {
        let whitelist = CommandWhitelist::new(vec![
            "echo".into(),
            "sleep".into(),
            "ls".into(),
            "true".into(),
        ]);
        CommandGateway::new(
            whitelist,
            AuditSink::new(store),
            CommandLimits {
                timeout,
                output_cap: cap,
            },
        )
    }

    fn requester() -> OperatorId {
        OperatorId::new("1001")
    }

    #[tokio::test]
    async fn blocked_command_is_audited_and_not_run() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let gw = gateway(store.clone(), Duration::from_secs(5), 4000);

        let result = gw.execute("rm -rf /", &requester()).await;
        assert!(matches!(result, Err(VigilError::NotWhitelisted(_))));

        let events = store.recent_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::BlockedCommand);
        assert!(events[0].description.contains("rm -rf /"));
    }

    #[tokio::test]
    async fn whitelisted_command_runs_and_is_audited() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let gw = gateway(store.clone(), Duration::from_secs(5), 4000);

        let outcome = gw.execute("echo hello", &requester()).await.unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.output.trim(), "hello");
        assert!(!outcome.truncated);

        let events = store.recent_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::CommandExecuted);
        assert!(events[0].description.contains("echo hello"));
    }

    #[tokio::test]
    async fn stderr_reported_when_stdout_empty() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let gw = gateway(store.clone(), Duration::from_secs(5), 4000);

        let outcome = gw
            .execute("echo oops 1>&2; exit 3", &requester())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.output.trim(), "oops");

        // Non-zero exit is still an executed command
        let events = store.recent_events(10).unwrap();
        assert_eq!(events[0].kind, SecurityEventKind::CommandExecuted);
    }

    #[tokio::test]
    async fn output_truncated_at_cap() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let gw = gateway(store.clone(), Duration::from_secs(5), 10);

        let outcome = gw
            .execute("echo 0123456789ABCDEF", &requester())
            .await
            .unwrap();
        assert!(outcome.truncated);
        assert_eq!(
            outcome.output,
            format!("0123456789{TRUNCATION_MARKER}")
        );
    }

    #[tokio::test]
    async fn output_exactly_at_cap_is_not_truncated() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        // "hi\n" is exactly 3 chars
        let gw = gateway(store.clone(), Duration::from_secs(5), 3);

        let outcome = gw.execute("echo hi", &requester()).await.unwrap();
        assert!(!outcome.truncated);
        assert_eq!(outcome.output, "hi\n");
    }

    #[tokio::test]
    async fn hanging_command_times_out() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let gw = gateway(store.clone(), Duration::from_millis(200), 4000);

        let result = gw.execute("sleep 30", &requester()).await;
        assert!(matches!(result, Err(VigilError::CommandTimeout(_))));
    }

    #[tokio::test]
    async fn failing_audit_store_does_not_block_execution() {
        let gw = gateway(Arc::new(FailingStore), Duration::from_secs(5), 4000);

        // The audit trail is gone, the command must still run
        let outcome = gw.execute("echo still-works", &requester()).await.unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.output.trim(), "still-works");
    }
}
