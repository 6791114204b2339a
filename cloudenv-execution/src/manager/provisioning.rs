//! Node provisioning, status and removal

use cloudenv_interfaces::{
    parameter_key, FileBundle, LaunchRequest, NodeDefinition, ParameterKind, ProcessLiveness,
};
use cloudenv_storage::NodeStatus;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::{coerce, EnvironmentManager};
use crate::activity::with_activity;
use crate::error::{EnvironmentError, EnvironmentResult};

/// Per node name, the configuration values supplied by the caller
pub type NodeConfigs = BTreeMap<String, JsonMap<String, JsonValue>>;

/// Observed status of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatusEntry {
    pub name: String,
    pub status: NodeStatus,
}

/// Resources created for a node that has not been launched yet
#[derive(Debug, Default)]
struct StagedNode {
    temp_files: Vec<PathBuf>,
    parameters: Vec<String>,
}

impl EnvironmentManager {
    /// Launch one node per entry of `config`, in name order.
    ///
    /// Stops at the first node that fails. Nodes launched before it stay
    /// provisioned; everything staged for the failing node is rolled back.
    /// Returns the ids of the launched nodes.
    pub async fn provision_nodes(
        &self,
        config: &NodeConfigs,
        attachments: &FileBundle,
    ) -> EnvironmentResult<Vec<String>> {
        with_activity(&self.inner.activity, self.provision_all(config, attachments)).await
    }

    async fn provision_all(
        &self,
        config: &NodeConfigs,
        attachments: &FileBundle,
    ) -> EnvironmentResult<Vec<String>> {
        let mut node_ids = Vec::with_capacity(config.len());
        for (name, parameters) in config {
            node_ids.push(self.provision_node(name, parameters, attachments).await?);
        }
        Ok(node_ids)
    }

    async fn provision_node(
        &self,
        name: &str,
        parameters: &JsonMap<String, JsonValue>,
        attachments: &FileBundle,
    ) -> EnvironmentResult<String> {
        let definition = self
            .collaborators()
            .schemas
            .node_definition(name)
            .await
            .map_err(|e| {
                EnvironmentError::internal(format!(
                    "Could not get the node information for node {}: {}",
                    name, e
                ))
            })?;

        let node_id = self.inner.store.insert_node(name).await?;
        debug!("Provisioning node {} as {}", name, node_id);

        let mut staged = StagedNode::default();
        if let Err(err) = self
            .stage_parameters(&node_id, &definition, parameters, attachments, &mut staged)
            .await
        {
            warn!("Configuring node {} failed: {}", name, err);
            self.roll_back(staged).await;
            // The row never had a process behind it
            self.mark_node(&node_id, NodeStatus::Deleted).await;
            return Err(err);
        }

        let request = LaunchRequest {
            node_id: node_id.clone(),
            package: definition.package.clone(),
            executable: definition.executable.clone(),
            namespace: node_id.clone(),
            temp_files: staged.temp_files.clone(),
        };
        if let Err(err) = self.collaborators().supervisor.launch(request).await {
            warn!("Launching node {} failed: {}", name, err);
            self.mark_node(&node_id, NodeStatus::Aborted).await;
            self.roll_back(staged).await;
            return Err(err.into());
        }

        self.inner
            .store
            .set_node_status(&node_id, NodeStatus::Running)
            .await?;
        info!(
            "Launched node {} ({}/{}) as {}",
            name, definition.package, definition.executable, node_id
        );
        Ok(node_id)
    }

    async fn stage_parameters(
        &self,
        node_id: &str,
        definition: &NodeDefinition,
        supplied: &JsonMap<String, JsonValue>,
        attachments: &FileBundle,
        staged: &mut StagedNode,
    ) -> EnvironmentResult<()> {
        for spec in &definition.parameters {
            let value = match (supplied.get(&spec.name), spec.kind) {
                (Some(raw), ParameterKind::File) => {
                    let path = self.stage_file(&spec.name, raw, attachments, staged).await?;
                    coerce::coerce_file(&spec.name, &path)?
                }
                (Some(raw), kind) => coerce::coerce_value(&spec.name, kind, raw)?,
                (None, kind) => {
                    let default = spec
                        .default
                        .as_ref()
                        .filter(|default| spec.optional && !default.is_null())
                        .ok_or_else(|| {
                            EnvironmentError::invalid_request(format!(
                                "Configuration parameter {} is missing",
                                spec.name
                            ))
                        })?;
                    coerce::coerce_value(&spec.name, kind, default)?
                }
            };

            let key = parameter_key(node_id, &spec.name);
            self.collaborators()
                .parameters
                .insert_new(&key, value)
                .await?;
            staged.parameters.push(key);
        }
        Ok(())
    }

    /// Write the content of a file parameter to a fresh temporary file
    async fn stage_file(
        &self,
        name: &str,
        raw: &JsonValue,
        attachments: &FileBundle,
        staged: &mut StagedNode,
    ) -> EnvironmentResult<PathBuf> {
        let content = match self.collaborators().converter.resolve_reference(raw) {
            Some(reference) => attachments.get(&reference).cloned().ok_or_else(|| {
                EnvironmentError::invalid_request(format!(
                    "File {} for configuration parameter {} is missing",
                    reference, name
                ))
            })?,
            None => coerce::inline_content(raw),
        };

        let path = tempfile::Builder::new()
            .prefix("cloudenv-param-")
            .tempfile_in(&self.inner.config.temp_dir)?
            .into_temp_path()
            .keep()
            .map_err(|e| {
                EnvironmentError::internal(format!("Could not keep temporary file: {}", e))
            })?;
        staged.temp_files.push(path.clone());
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    async fn roll_back(&self, staged: StagedNode) {
        for path in staged.temp_files {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!("Could not remove temporary file {:?}: {}", path, e);
            }
        }
        for key in staged.parameters {
            if let Err(e) = self.collaborators().parameters.remove(&key).await {
                warn!("Could not remove parameter {}: {}", key, e);
            }
        }
    }

    async fn mark_node(&self, node_id: &str, status: NodeStatus) {
        if let Err(e) = self.inner.store.set_node_status(node_id, status).await {
            warn!("Could not mark node {} as {}: {}", node_id, status, e);
        }
    }

    /// Status of every node, cross-checked against the supervisor
    pub async fn list_node_status(&self) -> EnvironmentResult<Vec<NodeStatusEntry>> {
        let nodes = self.inner.store.list_nodes().await?;
        let mut entries = Vec::with_capacity(nodes.len());
        for node in nodes {
            let status = if node.status.is_live() {
                match self.collaborators().supervisor.liveness(&node.node_id).await {
                    ProcessLiveness::Alive => node.status,
                    ProcessLiveness::Exited => NodeStatus::Terminated,
                    ProcessLiveness::Unknown => NodeStatus::Deleted,
                }
            } else {
                node.status
            };
            entries.push(NodeStatusEntry {
                name: node.name,
                status,
            });
        }
        Ok(entries)
    }

    /// Mark every node carrying one of `names` for removal
    pub async fn remove_nodes(&self, names: &[String]) -> EnvironmentResult<()> {
        let marked = with_activity(
            &self.inner.activity,
            self.inner.store.mark_nodes_deleted(names),
        )
        .await?;
        debug!("Marked {} nodes for removal", marked);
        Ok(())
    }
}
