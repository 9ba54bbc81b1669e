//! Voice command pipeline
//!
//! Transcription happens upstream; by the time text reaches this
//! pipeline it is just an untrusted command candidate. The whitelist is
//! checked here before the gateway so that a garbled transcript is
//! refused without ever spawning a process or writing a blocked-command
//! event for what was likely noise, not an attack.

use std::sync::Arc;
use tracing::info;
use vigil_util::{OperatorId, VigilError, VigilResult};

use crate::{CommandGateway, CommandOutcome};

pub struct VoicePipeline {
    gateway: Arc<CommandGateway>,
}

impl VoicePipeline {
    pub fn new(gateway: Arc<CommandGateway>) -> Self {
        Self { gateway }
    }

    /// Run a transcribed command for an already-authorized requester.
    ///
    /// Empty or whitespace-only transcripts fail with
    /// `TranscriptionEmpty`. Transcripts outside the whitelist fail with
    /// `NotWhitelisted` without reaching the gateway. Everything else
    /// inherits the gateway's timeout, truncation and audit behavior.
    pub async fn handle(
        &self,
        transcript: &str,
        requester: &OperatorId,
    ) -> VigilResult<CommandOutcome> {
        let text = transcript.trim();
        if text.is_empty() {
            return Err(VigilError::TranscriptionEmpty);
        }

        info!(requester = %requester, transcript = text, "Voice command recognized");

        if !self.gateway.whitelist().permits(text) {
            info!(requester = %requester, transcript = text, "Voice command not permitted");
            return Err(VigilError::NotWhitelisted(text.to_string()));
        }

        self.gateway.execute(text, requester).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditSink;
    use std::time::Duration;
    use vigil_config::{CommandLimits, CommandWhitelist};
    use vigil_store::{SecurityEventKind, SqliteStore, Store};

    fn pipeline() -> (VoicePipeline, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let gateway = Arc::new(CommandGateway::new(
            CommandWhitelist::new(vec!["echo".into(), "uptime".into()]),
            AuditSink::new(store.clone()),
            CommandLimits {
                timeout: Duration::from_secs(5),
                output_cap: 4000,
            },
        ));
        (VoicePipeline::new(gateway), store)
    }

    fn requester() -> OperatorId {
        OperatorId::new("1001")
    }

    #[tokio::test]
    async fn empty_transcript_is_rejected_silently() {
        let (pipeline, store) = pipeline();

        for transcript in ["", "   ", "\n\t"] {
            let result = pipeline.handle(transcript, &requester()).await;
            assert!(matches!(result, Err(VigilError::TranscriptionEmpty)));
        }
        assert!(store.recent_events(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_transcript_never_reaches_the_gateway() {
        let (pipeline, store) = pipeline();

        let result = pipeline.handle("open the pod bay doors", &requester()).await;
        assert!(matches!(result, Err(VigilError::NotWhitelisted(_))));

        // No blocked_command event: the gateway never ran
        assert!(store.recent_events(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitelisted_transcript_executes() {
        let (pipeline, store) = pipeline();

        let outcome = pipeline.handle("  echo voice-ok  ", &requester()).await.unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.output.trim(), "voice-ok");

        let events = store.recent_events(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::CommandExecuted);
    }
}
