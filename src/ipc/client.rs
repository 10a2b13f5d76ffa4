//! Client for talking to a running daemon.
//!
//! Sends one request to an endpoint socket and decodes the single response.

use std::path::PathBuf;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use super::operations::Operation;
use super::protocol::{ProtocolError, Response};
use crate::config::AppConfig;

/// Error returned by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to daemon at {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Communication error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    Protocol(#[from] ProtocolError),
}

pub struct IpcClient {
    path: PathBuf,
}

impl IpcClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Client for the socket `config` assigns to `operation`.
    pub fn for_operation(config: &AppConfig, operation: Operation) -> Self {
        Self::new(config.socket_path(operation.name()))
    }

    /// Send `request` and wait for the daemon to close the connection.
    ///
    /// Returns `None` when the daemon closed without replying, as the
    /// refresh endpoint does.
    pub async fn call(&self, request: &[u8]) -> Result<Option<Response>, ClientError> {
        let mut stream =
            UnixStream::connect(&self.path)
                .await
                .map_err(|source| ClientError::Connect {
                    path: self.path.clone(),
                    source,
                })?;

        if !request.is_empty() {
            stream.write_all(request).await?;
        }
        stream.shutdown().await?;

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;

        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(Response::decode(&buf)?))
    }
}
