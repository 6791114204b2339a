//! Task creation, execution and results

use cloudenv_interfaces::{
    ConvertError, EncodedMessage, FileBundle, InterfaceDefinition, InterfaceKind, NativeMessage,
};
use cloudenv_storage::TaskStatus;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::EnvironmentManager;
use crate::activity::with_activity;
use crate::error::{EnvironmentError, EnvironmentResult};

/// Status of a task and, once it has one, its result document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    pub result: Option<JsonValue>,
}

impl EnvironmentManager {
    /// Allocate a fresh task id
    pub async fn allocate_task(&self) -> EnvironmentResult<String> {
        Ok(self.inner.store.allocate_task().await?)
    }

    /// Whether `task_id` was allocated and has not been removed
    pub async fn is_valid_task(&self, task_id: &str) -> EnvironmentResult<bool> {
        Ok(self.inner.store.is_valid_task(task_id).await?)
    }

    /// Start the task `task_id` described by `config`.
    ///
    /// `config` must be an object carrying the `interface` to invoke and the
    /// `msg` to send. Stream interfaces are published before this returns;
    /// call interfaces run in the background and complete the task later.
    /// Every failure after the id check also aborts the task.
    pub async fn create_task(
        &self,
        task_id: &str,
        config: &JsonValue,
        attachments: &FileBundle,
    ) -> EnvironmentResult<()> {
        with_activity(
            &self.inner.activity,
            self.start_task(task_id, config, attachments),
        )
        .await
    }

    async fn start_task(
        &self,
        task_id: &str,
        config: &JsonValue,
        attachments: &FileBundle,
    ) -> EnvironmentResult<()> {
        if !self.inner.store.is_valid_task(task_id).await? {
            return Err(EnvironmentError::invalid_request(format!(
                "Task ID {} is invalid",
                task_id
            )));
        }

        let Some(request) = config.as_object() else {
            let err = EnvironmentError::invalid_request("Request data is not an object");
            return Err(self.fail_task(task_id, "invalid data", err).await);
        };
        let Some(interface) = request.get("interface") else {
            let err = EnvironmentError::invalid_request(
                "Request does not define which interface is requested",
            );
            return Err(self.fail_task(task_id, "undefined interface", err).await);
        };
        let Some(message) = request.get("msg") else {
            let err = EnvironmentError::invalid_request("Request does not define any message data");
            return Err(self.fail_task(task_id, "message data missing", err).await);
        };

        let definition = match self.resolve_interface(interface).await {
            Ok(definition) => definition,
            Err(err) => return Err(self.fail_task(task_id, "invalid interface", err).await),
        };

        let native = match self.collaborators().converter.decode(
            &definition.message_class,
            message,
            attachments,
        ) {
            Ok(native) => native,
            Err(ConvertError::Serialization(e)) => {
                let err = EnvironmentError::internal(format!("Could not deserialize message: {}", e));
                return Err(self.fail_task(task_id, "serialization error", err).await);
            }
            Err(ConvertError::InvalidValue(e)) => {
                let err = EnvironmentError::invalid_request(e);
                return Err(self.fail_task(task_id, "invalid request message", err).await);
            }
        };

        match definition.interface_kind() {
            Ok(InterfaceKind::Call) => {
                self.inner
                    .store
                    .set_task_status(task_id, TaskStatus::Running)
                    .await?;

                let manager = self.clone();
                let id = task_id.to_string();
                self.inner.tasks.spawn(task_id, async move {
                    manager.run_call(id, definition, native).await;
                });
                info!("Task {} running in the background", task_id);
            }
            Ok(InterfaceKind::Stream) => {
                if let Err(e) = self
                    .collaborators()
                    .invoker
                    .publish(&definition, native)
                    .await
                {
                    let err = EnvironmentError::internal(e.to_string());
                    return Err(self.fail_task(task_id, "unable to publish message", err).await);
                }
                self.inner.store.complete_task(task_id, "{}").await?;
                debug!("Task {} published on {}", task_id, definition.interface_name);
            }
            Err(kind) => {
                let err = EnvironmentError::internal(format!(
                    "Requested interface type {} is currently not supported",
                    kind
                ));
                return Err(self.fail_task(task_id, "unsupported interface kind", err).await);
            }
        }
        Ok(())
    }

    async fn resolve_interface(
        &self,
        interface: &JsonValue,
    ) -> EnvironmentResult<InterfaceDefinition> {
        let name = interface.as_str().ok_or_else(|| {
            EnvironmentError::invalid_request(format!("Requested interface {} is not valid", interface))
        })?;
        self.collaborators()
            .schemas
            .interface_definition(name)
            .await
            .map_err(|e| {
                EnvironmentError::invalid_request(format!(
                    "Requested interface {} is not valid: {}",
                    name, e
                ))
            })
    }

    /// Background half of a call-kind task
    async fn run_call(self, task_id: String, definition: InterfaceDefinition, request: NativeMessage) {
        match self.collaborators().invoker.call(&definition, request).await {
            Ok(response) => self.record_result(&task_id, response).await,
            Err(e) => {
                warn!("Call for task {} failed: {}", task_id, e);
                self.abort_or_log(&task_id, "service call failed").await;
            }
        }
    }

    /// Abort `task_id`, recording `reason` as its result
    pub async fn abort_task(&self, task_id: &str, reason: &str) -> EnvironmentResult<()> {
        let result = json!({ "error": reason }).to_string();
        self.inner.store.abort_task(task_id, &result).await?;
        debug!("Task {} aborted: {}", task_id, reason);
        Ok(())
    }

    async fn abort_or_log(&self, task_id: &str, reason: &str) {
        if let Err(e) = self.abort_task(task_id, reason).await {
            error!("Could not abort task {}: {}", task_id, e);
        }
    }

    async fn fail_task(&self, task_id: &str, reason: &str, err: EnvironmentError) -> EnvironmentError {
        warn!("Task {} failed: {}", task_id, err);
        self.abort_or_log(task_id, reason).await;
        err
    }

    /// Mark `task_id` for removal
    pub async fn remove_task(&self, task_id: &str) -> EnvironmentResult<()> {
        with_activity(
            &self.inner.activity,
            self.inner.store.mark_task_deleted(task_id),
        )
        .await?;
        Ok(())
    }

    /// Record the response of a call-kind task.
    ///
    /// Nobody waits on this synchronously, so failures are logged and turn
    /// the task into `aborted` instead of being returned.
    pub async fn record_result(&self, task_id: &str, message: NativeMessage) {
        with_activity(&self.inner.activity, self.store_result(task_id, message)).await
    }

    async fn store_result(&self, task_id: &str, message: NativeMessage) {
        let encoded = match self.collaborators().converter.encode(&message) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Could not encode response of task {}: {}", task_id, e);
                self.abort_or_log(task_id, "invalid response message").await;
                return;
            }
        };

        if let Err(e) = self.persist_result(task_id, encoded).await {
            error!("Could not store result of task {}: {}", task_id, e);
            self.abort_or_log(task_id, "unable to store result").await;
        }
    }

    async fn persist_result(&self, task_id: &str, encoded: EncodedMessage) -> EnvironmentResult<()> {
        for (file_ref, content) in &encoded.files {
            let path = tempfile::Builder::new()
                .prefix("cloudenv-result-")
                .tempfile_in(&self.inner.config.results_dir)?
                .into_temp_path()
                .keep()
                .map_err(|e| {
                    EnvironmentError::internal(format!("Could not keep result file: {}", e))
                })?;

            if let Err(e) = self.inner.store.insert_file(task_id, file_ref, &path).await {
                remove_quietly(&path).await;
                return Err(e.into());
            }
            tokio::fs::write(&path, content).await?;
            make_world_readable(&path).await?;
        }

        let data = serde_json::to_string(&encoded.data)
            .map_err(|e| EnvironmentError::internal(format!("Could not serialize result: {}", e)))?;
        let updated = self.inner.store.complete_task(task_id, &data).await?;
        if updated == 0 {
            debug!("Task {} was removed before its result arrived", task_id);
        } else {
            info!("Task {} completed", task_id);
        }
        Ok(())
    }

    /// Status and result of `task_id`
    pub async fn get_result(&self, task_id: &str) -> EnvironmentResult<TaskResult> {
        with_activity(&self.inner.activity, self.read_result(task_id)).await
    }

    async fn read_result(&self, task_id: &str) -> EnvironmentResult<TaskResult> {
        let task = self.inner.store.find_task(task_id).await?;
        self.inner.store.touch_task(task_id).await?;

        let task = task.ok_or_else(|| {
            EnvironmentError::invalid_request(format!("Task ID {} is invalid", task_id))
        })?;
        let result = match task.result {
            Some(text) if task.status.has_result() => {
                Some(serde_json::from_str(&text).map_err(|e| {
                    EnvironmentError::internal(format!("Stored result is not valid JSON: {}", e))
                })?)
            }
            _ => None,
        };

        Ok(TaskResult {
            status: task.status,
            result,
        })
    }

    /// Path of the result file stored for `task_id` under `file_ref`
    pub async fn get_file(&self, task_id: &str, file_ref: &str) -> EnvironmentResult<PathBuf> {
        with_activity(&self.inner.activity, self.find_file(task_id, file_ref)).await
    }

    async fn find_file(&self, task_id: &str, file_ref: &str) -> EnvironmentResult<PathBuf> {
        let path = self.inner.store.find_file(task_id, file_ref).await?;
        self.inner.store.touch_task(task_id).await?;

        path.ok_or_else(|| {
            EnvironmentError::invalid_request(format!(
                "Task ID {} / file reference {} is invalid",
                task_id, file_ref
            ))
        })
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Could not remove {:?}: {}", path, e);
    }
}

#[cfg(unix)]
async fn make_world_readable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await
}

#[cfg(not(unix))]
async fn make_world_readable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
