//! Bounded registry of every open endpoint listener.
//!
//! The pool is filled once while endpoints start and emptied exactly once on
//! shutdown. Its capacity equals the number of configured endpoints, so an
//! overflow can only mean a wiring bug and takes the whole process down.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("too many listeners opened (capacity {capacity})")]
    CapacityExceeded { capacity: usize },
}

/// A registered listener, as handed back to its accept loop.
#[derive(Clone)]
pub struct ListenerHandle {
    pub path: PathBuf,
    pub listener: Arc<UnixListener>,
    /// Cancelled when the pool closes this listener.
    pub closed: CancellationToken,
}

pub struct ListenerPool {
    capacity: usize,
    entries: Mutex<Vec<ListenerHandle>>,
}

impl ListenerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Add a listener, or close it and every registered one when full.
    pub fn try_register(
        &self,
        path: PathBuf,
        listener: UnixListener,
    ) -> Result<ListenerHandle, PoolError> {
        let handle = ListenerHandle {
            path,
            listener: Arc::new(listener),
            closed: CancellationToken::new(),
        };

        let mut entries = self.lock();
        if entries.len() + 1 > self.capacity {
            drop(entries);
            close(handle);
            self.close_all();
            return Err(PoolError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        entries.push(handle.clone());
        Ok(handle)
    }

    /// Add a listener; on overflow, close everything and exit with status 1.
    pub fn register(&self, path: PathBuf, listener: UnixListener) -> ListenerHandle {
        match self.try_register(path, listener) {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Listener pool overflow, exiting");
                std::process::exit(1);
            }
        }
    }

    /// Close every registered listener. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let entries = std::mem::take(&mut *self.lock());
        let count = entries.len();
        for handle in entries {
            close(handle);
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ListenerHandle>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn close(handle: ListenerHandle) {
    info!(path = %handle.path.display(), "Closing listener");
    handle.closed.cancel();
    remove_socket_file(&handle.path);
}

fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), error = %e, "Failed to remove socket file");
        }
        _ => {}
    }
}
