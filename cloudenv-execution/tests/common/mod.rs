#![allow(dead_code)]

use cloudenv_config::{CloudEnvConfig, DatabaseConfig, EnvironmentConfig};
use cloudenv_execution::testing::{
    InMemoryCollaborators, InMemoryParameterRegistry, RecordingInvoker, StaticSchemaRegistry,
};
use cloudenv_execution::{EnvironmentManager, NodeConfigs, TaskResult};
use cloudenv_interfaces::{InterfaceDefinition, NodeDefinition, ParameterKind, ParameterSpec};
use cloudenv_storage::TaskStatus;
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub struct TestEnv {
    pub manager: EnvironmentManager,
    pub fakes: InMemoryCollaborators,
    pub dir: TempDir,
}

impl TestEnv {
    pub fn temp_dir(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.dir.path().join("results")
    }
}

pub fn schemas() -> StaticSchemaRegistry {
    StaticSchemaRegistry::new()
        .with_node(
            "nav",
            NodeDefinition {
                package: "nav_pkg".to_string(),
                executable: "nav_exe".to_string(),
                parameters: vec![ParameterSpec::required("rate", ParameterKind::Int)],
            },
        )
        .with_node(
            "mapper",
            NodeDefinition {
                package: "map_pkg".to_string(),
                executable: "map_exe".to_string(),
                parameters: vec![
                    ParameterSpec::required("map", ParameterKind::File),
                    ParameterSpec::optional("resolution", ParameterKind::Float, json!(0.05)),
                    ParameterSpec::optional("frame", ParameterKind::Str, json!("map")),
                    ParameterSpec::required("verbose", ParameterKind::Bool),
                ],
            },
        )
        .with_node(
            "lidar",
            NodeDefinition {
                package: "lidar_pkg".to_string(),
                executable: "lidar_exe".to_string(),
                parameters: vec![ParameterSpec::required("rate", ParameterKind::Int)],
            },
        )
        .with_interface(
            "goal",
            InterfaceDefinition {
                kind: "stream".to_string(),
                message_class: "Goal".to_string(),
                interface_name: "/nav/goal".to_string(),
                definition: vec![],
            },
        )
        .with_interface(
            "plan",
            InterfaceDefinition {
                kind: "call".to_string(),
                message_class: "PlanRequest".to_string(),
                interface_name: "/nav/plan".to_string(),
                definition: vec!["PlanService".to_string()],
            },
        )
        .with_interface(
            "legacy",
            InterfaceDefinition {
                kind: "action".to_string(),
                message_class: "LegacyGoal".to_string(),
                interface_name: "/legacy".to_string(),
                definition: vec![],
            },
        )
}

pub fn config_in(dir: &Path) -> CloudEnvConfig {
    CloudEnvConfig {
        environment: EnvironmentConfig {
            timeout: Duration::from_secs(600),
            gc_poll_interval: Duration::from_millis(10),
            results_dir: dir.join("results"),
            temp_dir: dir.join("tmp"),
        },
        database: DatabaseConfig::sqlite_file(dir.join("state.db")),
        ..Default::default()
    }
}

pub async fn setup_with(
    parameters: InMemoryParameterRegistry,
    invoker: RecordingInvoker,
) -> TestEnv {
    let _ = cloudenv_logging::init_simple_tracing("debug");

    let dir = tempfile::tempdir().unwrap();
    let fakes = InMemoryCollaborators::new(schemas(), parameters, invoker);
    let manager = EnvironmentManager::open(&config_in(dir.path()), fakes.collaborators())
        .await
        .unwrap();
    TestEnv {
        manager,
        fakes,
        dir,
    }
}

pub async fn setup() -> TestEnv {
    setup_with(InMemoryParameterRegistry::new(), RecordingInvoker::new()).await
}

pub fn node_configs(value: JsonValue) -> NodeConfigs {
    serde_json::from_value(value).unwrap()
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|entry| entry.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Poll until the task reaches `status`
pub async fn wait_for_status(
    manager: &EnvironmentManager,
    task_id: &str,
    status: TaskStatus,
) -> TaskResult {
    for _ in 0..200 {
        let result = manager.get_result(task_id).await.unwrap();
        if result.status == status {
            return result;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never reached {}", task_id, status);
}

/// Poll until `check` holds
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held");
}
