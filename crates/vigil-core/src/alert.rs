//! Alert fan-out
//!
//! The dispatcher is transport-agnostic: anything that can deliver a text
//! or a photo to an operator works. Delivery is best-effort per recipient.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use vigil_util::{format_datetime_full, OperatorId, VigilResult};

use crate::MotionAlert;

/// Outbound delivery seam
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, recipient: &OperatorId, text: &str) -> VigilResult<()>;

    async fn send_photo(
        &self,
        recipient: &OperatorId,
        caption: &str,
        photo: &Path,
    ) -> VigilResult<()>;
}

/// Fans alerts out to every configured operator
pub struct AlertDispatcher {
    transport: Arc<dyn Transport>,
    recipients: Vec<OperatorId>,
}

impl AlertDispatcher {
    pub fn new(transport: Arc<dyn Transport>, recipients: Vec<OperatorId>) -> Self {
        Self {
            transport,
            recipients,
        }
    }

    /// Deliver a motion alert to every recipient. A failure for one
    /// recipient never aborts the rest. Returns the delivered count.
    pub async fn dispatch(&self, alert: &MotionAlert) -> usize {
        let caption = format!("Motion detected at {}", format_datetime_full(&alert.at));
        let mut delivered = 0;

        for recipient in &self.recipients {
            let result = match &alert.evidence_path {
                Some(path) => self.transport.send_photo(recipient, &caption, path).await,
                None => self.transport.send_text(recipient, &caption).await,
            };

            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Alert delivery failed");
                }
            }
        }

        info!(
            delivered,
            total = self.recipients.len(),
            "Motion alert dispatched"
        );
        delivered
    }

    /// Plain-text broadcast (startup/shutdown notices), best-effort
    pub async fn broadcast(&self, text: &str) -> usize {
        let mut delivered = 0;
        for recipient in &self.recipients {
            match self.transport.send_text(recipient, text).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Broadcast delivery failed");
                }
            }
        }
        delivered
    }
}
