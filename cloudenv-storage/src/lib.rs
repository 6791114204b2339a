//! State store for the environment manager
//!
//! Persists nodes, tasks and task result files in SQLite through SeaORM.
//! The schema enforces cascading deletion of file rows with their task and
//! stamps each task's `accessed` timestamp on insert and update.

pub mod connection;
pub mod entities;
pub mod error;
pub mod migrations;
pub mod store;

pub use connection::DatabaseConnection;
pub use entities::{FileAttachment, Node, NodeStatus, Task, TaskStatus};
pub use error::{StorageError, StorageResult};
pub use store::{format_timestamp, StateStore, TIMESTAMP_FORMAT};
