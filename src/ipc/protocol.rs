// IPC protocol definitions for client-daemon communication

use crate::deploy::Deployment;
use crate::store::{DeploymentStats, InstanceStatus, InstanceView};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All available commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// Deploy a worker for a new tenant
    Deploy { tenant: String, session: String },
    /// Terminate a tenant's worker, keeping its record
    Stop { tenant: String },
    /// Merged status view of one tenant
    Status { tenant: String },
    /// Aggregate stats over every instance
    List,
    /// Drop a tenant's record, terminating its worker first
    Remove { tenant: String },
    /// Daemon health check
    Ping,
}

/// Response data variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseData {
    /// Worker deployed and record persisted
    Deployed(Deployment),
    /// Worker terminated, record kept
    Stopped {
        tenant: String,
        status: InstanceStatus,
    },
    /// Merged view of a single tenant
    Status(InstanceView),
    /// Aggregate deployment statistics
    Stats(DeploymentStats),
    /// Record dropped
    Removed { tenant: String },
    /// Daemon is alive
    Pong { uptime: Duration },
}

/// Request message from client to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub command: Command,
}

/// Response message from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Result<ResponseData, String>,
}

impl Request {
    pub fn new(id: u64, command: Command) -> Self {
        Self { id, command }
    }
}

impl Response {
    pub fn success(id: u64, data: ResponseData) -> Self {
        Self {
            id,
            result: Ok(data),
        }
    }

    pub fn error(id: u64, error: String) -> Self {
        Self {
            id,
            result: Err(error),
        }
    }
}
