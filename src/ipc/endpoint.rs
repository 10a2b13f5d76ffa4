//! Unix socket transport for the endpoints.
//!
//! Each endpoint owns one socket and one operation. A connection carries a
//! single unframed request and gets back a single response, after which the
//! daemon closes it. Each connection is handled in its own task.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use super::operations::{Operation, OperationHandler};
use super::pool::ListenerHandle;
use super::protocol::{MAX_REQUEST_LEN, Response};
use crate::config::AppConfig;
use crate::context::AppContext;

/// One socket bound to one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub operation: Operation,
    pub path: PathBuf,
    /// Run the accept loop on the caller instead of a spawned task.
    pub blocking: bool,
}

/// Every endpoint the daemon serves. Health comes last and blocks.
pub fn endpoints(config: &AppConfig) -> Vec<Endpoint> {
    Operation::ALL
        .iter()
        .map(|&operation| Endpoint {
            operation,
            path: config.socket_path(operation.name()),
            blocking: operation == Operation::Health,
        })
        .collect()
}

impl Endpoint {
    /// Bind the socket, register it and run the accept loop.
    ///
    /// Returns once the loop is spawned, or, for a blocking endpoint, once
    /// the loop has ended.
    pub async fn serve(&self, ctx: AppContext) -> Result<()> {
        remove_stale(&self.path)
            .await
            .with_context(|| format!("Failed to clear socket {}", self.path.display()))?;

        let listener = UnixListener::bind(&self.path)
            .with_context(|| format!("Failed to listen on socket {}", self.path.display()))?;
        info!(endpoint = self.operation.name(), path = %self.path.display(), "Endpoint listening");

        let handle = ctx.listeners.register(self.path.clone(), listener);
        let handler = Arc::new(OperationHandler::new(ctx));

        if self.blocking {
            accept_loop(self.operation, handle, handler).await;
        } else {
            tokio::spawn(accept_loop(self.operation, handle, handler));
        }
        Ok(())
    }
}

async fn remove_stale(path: &Path) -> io::Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn accept_loop(
    operation: Operation,
    handle: ListenerHandle,
    handler: Arc<OperationHandler>,
) {
    let endpoint = operation.name();

    loop {
        tokio::select! {
            accept_result = handle.listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        debug!(endpoint, "Client connected");
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, operation, handler).await {
                                debug!(endpoint, error = %e, "Connection error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(endpoint, error = %e, "Failed to accept connection");
                        break;
                    }
                }
            }
            _ = handle.closed.cancelled() => {
                info!(endpoint, "Endpoint closed");
                break;
            }
        }
    }
}

/// Read one request, run the operation, write one response.
async fn handle_connection(
    mut stream: UnixStream,
    operation: Operation,
    handler: Arc<OperationHandler>,
) -> io::Result<()> {
    let endpoint = operation.name();

    let mut buf = [0u8; MAX_REQUEST_LEN];
    let request = if operation.reads_request() {
        match stream.read(&mut buf).await {
            Ok(n) => &buf[..n],
            Err(e) => {
                warn!(endpoint, error = %e, "Failed to read request");
                return send(&mut stream, operation, &Response::failure(e.to_string())).await;
            }
        }
    } else {
        &buf[..0]
    };

    match handler.handle(operation, request).await {
        Some(response) => send(&mut stream, operation, &response).await,
        None => Ok(()),
    }
}

async fn send(stream: &mut UnixStream, operation: Operation, response: &Response) -> io::Result<()> {
    let msg = response.encode();
    stream.write_all(&msg).await?;
    stream.shutdown().await?;

    match response.payload.lines().next() {
        Some(first) => info!(
            endpoint = operation.name(),
            bytes = response.payload.len(),
            "Sent '{}...'",
            first
        ),
        None => warn!(endpoint = operation.name(), "Sent empty response"),
    }
    Ok(())
}
