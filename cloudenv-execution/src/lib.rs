//! Cloud environment execution engine
//!
//! This crate provides the [`EnvironmentManager`], which provisions node
//! processes with rollback, runs tasks against node interfaces, records
//! their results and reclaims abandoned state in two garbage collection
//! phases.

pub mod activity;
pub mod error;
pub mod manager;
pub mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use activity::{with_activity, ActivityMonitor};
pub use error::{EnvironmentError, EnvironmentResult};
pub use manager::{
    Collaborators, EnvironmentManager, NodeConfigs, NodeStatusEntry, SweepStats, TaskResult,
};
pub use registry::TaskRegistry;
