//! Alert delivery over connected IPC clients
//!
//! Implements the core `Transport` seam on top of the server's client
//! registry. An operator with no subscribed connection is unreachable,
//! which the dispatcher treats as a failed (and logged) delivery.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use vigil_core::Transport;
use vigil_util::{OperatorId, VigilError, VigilResult};

use crate::{Alert, IpcServer};

pub struct IpcTransport {
    server: Arc<IpcServer>,
}

impl IpcTransport {
    pub fn new(server: Arc<IpcServer>) -> Self {
        Self { server }
    }

    async fn deliver(&self, recipient: &OperatorId, alert: &Alert) -> VigilResult<()> {
        let delivered = self
            .server
            .send_alert(recipient, alert)
            .await
            .map_err(|e| VigilError::transport(e.to_string()))?;

        if delivered == 0 {
            return Err(VigilError::transport(format!(
                "no subscribed connection for operator {recipient}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for IpcTransport {
    async fn send_text(&self, recipient: &OperatorId, text: &str) -> VigilResult<()> {
        self.deliver(
            recipient,
            &Alert::Notice {
                text: text.to_string(),
            },
        )
        .await
    }

    async fn send_photo(
        &self,
        recipient: &OperatorId,
        caption: &str,
        photo: &Path,
    ) -> VigilResult<()> {
        self.deliver(
            recipient,
            &Alert::Motion {
                caption: caption.to_string(),
                evidence_path: Some(photo.display().to_string()),
            },
        )
        .await
    }
}
