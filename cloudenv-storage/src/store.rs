//! Repository operations over the environment schema

use chrono::{DateTime, Utc};
use cloudenv_config::DatabaseConfig;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};
use uuid::Uuid;

use crate::connection::DatabaseConnection;
use crate::entities::{
    FileAttachment, FileAttachmentActiveModel, FileAttachmentColumn, FileAttachments, Node,
    NodeActiveModel, NodeColumn, NodeStatus, Nodes, Task, TaskActiveModel, TaskColumn, TaskStatus,
    Tasks,
};
use crate::error::StorageResult;

/// Text layout of the `accessed` column, matching the SQLite triggers
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Render a timestamp the way the store persists it
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Persistent state of nodes, tasks and result files
///
/// Every operation is a single statement; there are no cross-operation
/// transactions. Writing a `deleted` mark wakes whoever waits on
/// [`StateStore::deletion_marks`].
#[derive(Clone)]
pub struct StateStore {
    db: DatabaseConnection,
    deletion_marks: Arc<Notify>,
}

impl StateStore {
    /// Connect to the configured database and apply migrations
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let db = DatabaseConnection::new(config.clone()).await?;
        db.migrate().await?;
        Ok(Self::from_connection(db))
    }

    /// Wrap an already migrated connection
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self {
            db,
            deletion_marks: Arc::new(Notify::new()),
        }
    }

    /// Notified each time a node or task is marked `deleted`
    pub fn deletion_marks(&self) -> Arc<Notify> {
        self.deletion_marks.clone()
    }

    fn signal_deletion(&self) {
        self.deletion_marks.notify_one();
    }

    // Nodes

    /// Insert a node row in `init` and return its generated id
    pub async fn insert_node(&self, name: &str) -> StorageResult<String> {
        let node_id = generate_id();
        let node = NodeActiveModel {
            node_id: Set(node_id.clone()),
            name: Set(name.to_string()),
            status: Set(NodeStatus::Init),
        };
        Nodes::insert(node)
            .exec_without_returning(self.db.get_connection())
            .await?;

        debug!("Inserted node {} ({})", node_id, name);
        Ok(node_id)
    }

    pub async fn set_node_status(&self, node_id: &str, status: NodeStatus) -> StorageResult<()> {
        Nodes::update_many()
            .col_expr(NodeColumn::Status, Expr::value(status))
            .filter(NodeColumn::NodeId.eq(node_id))
            .exec(self.db.get_connection())
            .await?;
        Ok(())
    }

    pub async fn list_nodes(&self) -> StorageResult<Vec<Node>> {
        Ok(Nodes::find().all(self.db.get_connection()).await?)
    }

    /// Soft-delete every node carrying one of `names`
    pub async fn mark_nodes_deleted(&self, names: &[String]) -> StorageResult<u64> {
        if names.is_empty() {
            return Ok(0);
        }

        let result = Nodes::update_many()
            .col_expr(NodeColumn::Status, Expr::value(NodeStatus::Deleted))
            .filter(NodeColumn::Name.is_in(names.iter().cloned()))
            .exec(self.db.get_connection())
            .await?;

        self.signal_deletion();
        Ok(result.rows_affected)
    }

    pub async fn deleted_nodes(&self) -> StorageResult<Vec<Node>> {
        Ok(Nodes::find()
            .filter(NodeColumn::Status.eq(NodeStatus::Deleted))
            .all(self.db.get_connection())
            .await?)
    }

    /// Hard-delete nodes by id
    pub async fn delete_nodes(&self, node_ids: &[String]) -> StorageResult<u64> {
        if node_ids.is_empty() {
            return Ok(0);
        }

        let result = Nodes::delete_many()
            .filter(NodeColumn::NodeId.is_in(node_ids.iter().cloned()))
            .exec(self.db.get_connection())
            .await?;
        Ok(result.rows_affected)
    }

    // Tasks

    /// Allocate a task id by inserting a fresh `init` row
    pub async fn allocate_task(&self) -> StorageResult<String> {
        let task_id = generate_id();
        let task = TaskActiveModel {
            task_id: Set(task_id.clone()),
            status: Set(TaskStatus::Init),
            ..Default::default()
        };
        Tasks::insert(task)
            .exec_without_returning(self.db.get_connection())
            .await?;

        debug!("Allocated task {}", task_id);
        Ok(task_id)
    }

    /// A task is valid when its row exists and is not soft-deleted
    pub async fn is_valid_task(&self, task_id: &str) -> StorageResult<bool> {
        let task = Tasks::find_by_id(task_id.to_string())
            .filter(TaskColumn::Status.ne(TaskStatus::Deleted))
            .one(self.db.get_connection())
            .await?;
        Ok(task.is_some())
    }

    pub async fn find_task(&self, task_id: &str) -> StorageResult<Option<Task>> {
        Ok(Tasks::find_by_id(task_id.to_string())
            .one(self.db.get_connection())
            .await?)
    }

    /// Move a live task to `status`; soft-deleted rows are left alone
    pub async fn set_task_status(&self, task_id: &str, status: TaskStatus) -> StorageResult<u64> {
        let result = Tasks::update_many()
            .col_expr(TaskColumn::Status, Expr::value(status))
            .filter(TaskColumn::TaskId.eq(task_id))
            .filter(TaskColumn::Status.ne(TaskStatus::Deleted))
            .exec(self.db.get_connection())
            .await?;
        Ok(result.rows_affected)
    }

    /// Store the result document of a live task and mark it `completed`
    pub async fn complete_task(&self, task_id: &str, result: &str) -> StorageResult<u64> {
        let updated = Tasks::update_many()
            .col_expr(TaskColumn::Status, Expr::value(TaskStatus::Completed))
            .col_expr(TaskColumn::Result, Expr::value(result.to_string()))
            .filter(TaskColumn::TaskId.eq(task_id))
            .filter(TaskColumn::Status.ne(TaskStatus::Deleted))
            .exec(self.db.get_connection())
            .await?;
        Ok(updated.rows_affected)
    }

    /// Unconditionally mark a task `aborted` with the given result document
    pub async fn abort_task(&self, task_id: &str, result: &str) -> StorageResult<u64> {
        let updated = Tasks::update_many()
            .col_expr(TaskColumn::Status, Expr::value(TaskStatus::Aborted))
            .col_expr(TaskColumn::Result, Expr::value(result.to_string()))
            .filter(TaskColumn::TaskId.eq(task_id))
            .exec(self.db.get_connection())
            .await?;
        Ok(updated.rows_affected)
    }

    /// Soft-delete a task; marking an already deleted task is a no-op
    pub async fn mark_task_deleted(&self, task_id: &str) -> StorageResult<()> {
        let updated = Tasks::update_many()
            .col_expr(TaskColumn::Status, Expr::value(TaskStatus::Deleted))
            .filter(TaskColumn::TaskId.eq(task_id))
            .exec(self.db.get_connection())
            .await?;

        if updated.rows_affected > 0 {
            self.signal_deletion();
        }
        Ok(())
    }

    /// Stamp the task's `accessed` column with the current time
    pub async fn touch_task(&self, task_id: &str) -> StorageResult<()> {
        Tasks::update_many()
            .col_expr(TaskColumn::Accessed, Expr::value(format_timestamp(Utc::now())))
            .filter(TaskColumn::TaskId.eq(task_id))
            .exec(self.db.get_connection())
            .await?;
        Ok(())
    }

    /// Soft-delete every live task last accessed before `cutoff`
    pub async fn age_out_tasks(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let result = Tasks::update_many()
            .col_expr(TaskColumn::Status, Expr::value(TaskStatus::Deleted))
            .filter(TaskColumn::Status.ne(TaskStatus::Deleted))
            .filter(TaskColumn::Accessed.lt(format_timestamp(cutoff)))
            .exec(self.db.get_connection())
            .await?;

        if result.rows_affected > 0 {
            info!("Aged out {} stale tasks", result.rows_affected);
            self.signal_deletion();
        }
        Ok(result.rows_affected)
    }

    /// Ids of every soft-deleted task
    pub async fn deleted_tasks(&self) -> StorageResult<Vec<String>> {
        let tasks = Tasks::find()
            .filter(TaskColumn::Status.eq(TaskStatus::Deleted))
            .all(self.db.get_connection())
            .await?;
        Ok(tasks.into_iter().map(|task| task.task_id).collect())
    }

    /// Hard-delete tasks by id; their file rows cascade
    pub async fn delete_tasks(&self, task_ids: &[String]) -> StorageResult<u64> {
        if task_ids.is_empty() {
            return Ok(0);
        }

        let result = Tasks::delete_many()
            .filter(TaskColumn::TaskId.is_in(task_ids.iter().cloned()))
            .exec(self.db.get_connection())
            .await?;
        Ok(result.rows_affected)
    }

    // Files

    pub async fn insert_file(
        &self,
        task_id: &str,
        file_ref: &str,
        filename: &Path,
    ) -> StorageResult<()> {
        let file = FileAttachmentActiveModel {
            filename: Set(filename.to_string_lossy().into_owned()),
            task_id: Set(task_id.to_string()),
            file_ref: Set(file_ref.to_string()),
        };
        FileAttachments::insert(file)
            .exec_without_returning(self.db.get_connection())
            .await?;
        Ok(())
    }

    /// Path of the file stored for `task_id` under `file_ref`
    pub async fn find_file(&self, task_id: &str, file_ref: &str) -> StorageResult<Option<PathBuf>> {
        let file = FileAttachments::find()
            .filter(FileAttachmentColumn::TaskId.eq(task_id))
            .filter(FileAttachmentColumn::FileRef.eq(file_ref))
            .one(self.db.get_connection())
            .await?;
        Ok(file.map(|f| PathBuf::from(f.filename)))
    }

    pub async fn files_for_tasks(&self, task_ids: &[String]) -> StorageResult<Vec<FileAttachment>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(FileAttachments::find()
            .filter(FileAttachmentColumn::TaskId.is_in(task_ids.iter().cloned()))
            .all(self.db.get_connection())
            .await?)
    }

    pub async fn all_files(&self) -> StorageResult<Vec<FileAttachment>> {
        Ok(FileAttachments::find()
            .order_by_asc(FileAttachmentColumn::Filename)
            .all(self.db.get_connection())
            .await?)
    }

    /// Close the underlying connection pool
    pub async fn close(&self) -> StorageResult<()> {
        self.db.clone().close().await
    }
}
