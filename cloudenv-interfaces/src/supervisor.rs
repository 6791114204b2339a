//! Process supervisor interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::SupervisorError;

/// Everything the supervisor needs to start one node process
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub node_id: String,
    pub package: String,
    pub executable: String,
    /// Parameter namespace the process reads its configuration from
    pub namespace: String,
    /// Temporary files the supervisor removes once the process exits
    pub temp_files: Vec<PathBuf>,
}

/// Liveness of a supervised process as seen by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessLiveness {
    Alive,
    Exited,
    /// The supervisor has no record of the process
    Unknown,
}

/// Starts, observes and terminates native node processes
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Launch a process; the process is tracked under `request.node_id`
    async fn launch(&self, request: LaunchRequest) -> Result<(), SupervisorError>;

    /// Report whether the process registered under `node_id` is alive
    async fn liveness(&self, node_id: &str) -> ProcessLiveness;

    /// Terminate the process and forget about it
    async fn terminate(&self, node_id: &str) -> Result<(), SupervisorError>;
}
