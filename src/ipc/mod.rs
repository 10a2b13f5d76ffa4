//! Local socket interface of the daemon.
//!
//! ## Architecture
//!
//! - `protocol`: response encoding shared by every endpoint
//! - `pool`: bounded registry of open listeners, closed together on shutdown
//! - `endpoint`: socket binding, accept loop and per-connection tasks
//! - `operations`: the operation behind each endpoint
//! - `client`: client for connecting to the daemon

pub mod client;
pub mod endpoint;
pub mod operations;
pub mod pool;
pub mod protocol;

pub use client::{ClientError, IpcClient};
pub use endpoint::{Endpoint, endpoints};
pub use operations::{Operation, OperationHandler};
pub use pool::{ListenerHandle, ListenerPool, PoolError};
pub use protocol::{ProtocolError, Response, Status};

/// One listener per operation.
pub const LISTENER_CAPACITY: usize = Operation::ALL.len();
