//! IPC client implementation

use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::{Alert, IpcError, IpcResult, Request, RequestOp, Response, ResponseResult};

/// IPC client for talking to vigild
pub struct IpcClient {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
    actor_id: String,
    actor_name: Option<String>,
    next_request_id: u64,
}

impl IpcClient {
    /// Connect to vigild, presenting the given operator identity
    pub async fn connect(
        socket_path: impl AsRef<Path>,
        actor_id: impl Into<String>,
        actor_name: Option<String>,
    ) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            actor_id: actor_id.into(),
            actor_name,
            next_request_id: 1,
        })
    }

    /// Send an operation and wait for its response
    pub async fn send(&mut self, op: RequestOp) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = Request::new(
            request_id,
            self.actor_id.clone(),
            self.actor_name.clone(),
            op,
        );
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;

        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        let response: Response = serde_json::from_str(line.trim())?;

        Ok(response)
    }

    /// Request an alert subscription, consuming this client into a stream
    pub async fn subscribe(mut self) -> IpcResult<AlertStream> {
        let response = self.send(RequestOp::SubscribeAlerts).await?;

        match response.result {
            ResponseResult::Ok(_) => Ok(self.into_alert_stream()),
            ResponseResult::Err(e) => Err(IpcError::ServerError(e.message)),
        }
    }

    /// Turn the connection into a raw alert stream without negotiating.
    /// Only useful when the subscription was granted out of band.
    pub fn into_alert_stream(self) -> AlertStream {
        AlertStream {
            reader: self.reader,
        }
    }
}

/// Stream of alerts pushed by vigild
pub struct AlertStream {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
}

impl AlertStream {
    /// Wait for the next alert
    pub async fn next(&mut self) -> IpcResult<Alert> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        let alert: Alert = serde_json::from_str(line.trim())?;
        Ok(alert)
    }
}
