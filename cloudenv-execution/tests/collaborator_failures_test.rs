//! Manager behaviour when collaborators misbehave, driven by mockall doubles

mod common;

use async_trait::async_trait;
use cloudenv_execution::testing::{
    InMemoryParameterRegistry, InMemorySupervisor, JsonConverter, RecordingInvoker,
    StaticSchemaRegistry,
};
use cloudenv_execution::{Collaborators, EnvironmentManager, TaskResult};
use cloudenv_interfaces::{
    FileBundle, InterfaceDefinition, InterfaceInvoker, InvokeError, LaunchRequest, NativeMessage,
    NodeDefinition, ParameterKind, ParameterRegistry, ParameterSpec, ParameterValue,
    ProcessLiveness, ProcessSupervisor, RegistryError, SupervisorError,
};
use cloudenv_storage::TaskStatus;
use common::{config_in, node_configs, schemas, wait_for_status};
use mockall::mock;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    pub Supervisor {}

    #[async_trait]
    impl ProcessSupervisor for Supervisor {
        async fn launch(&self, request: LaunchRequest) -> Result<(), SupervisorError>;
        async fn liveness(&self, node_id: &str) -> ProcessLiveness;
        async fn terminate(&self, node_id: &str) -> Result<(), SupervisorError>;
    }
}

mock! {
    pub Parameters {}

    #[async_trait]
    impl ParameterRegistry for Parameters {
        async fn insert_new(&self, key: &str, value: ParameterValue) -> Result<(), RegistryError>;
        async fn remove(&self, key: &str) -> Result<(), RegistryError>;
        async fn remove_namespace(&self, namespace: &str) -> Result<(), RegistryError>;
    }
}

mock! {
    pub Invoker {}

    #[async_trait]
    impl InterfaceInvoker for Invoker {
        async fn call(
            &self,
            interface: &InterfaceDefinition,
            request: NativeMessage,
        ) -> Result<NativeMessage, InvokeError>;
        async fn publish(
            &self,
            interface: &InterfaceDefinition,
            message: NativeMessage,
        ) -> Result<(), InvokeError>;
    }
}

async fn manager_with(
    supervisor: Arc<dyn ProcessSupervisor>,
    parameters: Arc<dyn ParameterRegistry>,
    schemas: StaticSchemaRegistry,
    invoker: Arc<dyn InterfaceInvoker>,
) -> (EnvironmentManager, TempDir) {
    let _ = cloudenv_logging::init_simple_tracing("debug");
    let dir = tempfile::tempdir().unwrap();
    let collaborators = Collaborators {
        supervisor,
        parameters,
        schemas: Arc::new(schemas),
        converter: Arc::new(JsonConverter),
        invoker,
    };
    let manager = EnvironmentManager::open(&config_in(dir.path()), collaborators)
        .await
        .unwrap();
    (manager, dir)
}

#[tokio::test]
async fn test_reclaim_survives_terminate_and_namespace_failures() {
    let mut supervisor = MockSupervisor::new();
    supervisor.expect_launch().times(1).returning(|_| Ok(()));
    supervisor
        .expect_terminate()
        .times(1)
        .returning(|node_id| {
            Err(SupervisorError::TerminateFailed {
                node_id: node_id.to_string(),
                reason: "permission denied".to_string(),
            })
        });

    let mut parameters = MockParameters::new();
    parameters.expect_insert_new().times(1).returning(|_, _| Ok(()));
    parameters
        .expect_remove_namespace()
        .times(1)
        .returning(|_| Err(RegistryError::Unavailable("registry offline".to_string())));

    let (manager, _dir) = manager_with(
        Arc::new(supervisor),
        Arc::new(parameters),
        schemas(),
        Arc::new(RecordingInvoker::new()),
    )
    .await;

    manager
        .provision_nodes(&node_configs(json!({"nav": {"rate": 3}})), &FileBundle::new())
        .await
        .unwrap();
    manager.remove_nodes(&["nav".to_string()]).await.unwrap();

    let stats = manager.reclaim().await.unwrap();
    assert_eq!(stats.nodes, 1);
    // No rows are left, so the supervisor is not asked for liveness
    assert!(manager.list_node_status().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_registry_failure_rolls_back_staged_parameters() {
    let schemas = StaticSchemaRegistry::new().with_node(
        "arm",
        NodeDefinition {
            package: "arm_pkg".to_string(),
            executable: "arm_exe".to_string(),
            parameters: vec![
                ParameterSpec::required("joints", ParameterKind::Int),
                ParameterSpec::required("speed", ParameterKind::Float),
            ],
        },
    );

    let mut parameters = MockParameters::new();
    parameters
        .expect_insert_new()
        .withf(|key, _| key.ends_with("/joints"))
        .times(1)
        .returning(|_, _| Ok(()));
    parameters
        .expect_insert_new()
        .withf(|key, _| key.ends_with("/speed"))
        .times(1)
        .returning(|_, _| Err(RegistryError::Unavailable("registry offline".to_string())));
    parameters
        .expect_remove()
        .withf(|key| key.ends_with("/joints"))
        .times(1)
        .returning(|_| Ok(()));

    let mut supervisor = MockSupervisor::new();
    supervisor.expect_launch().never();
    supervisor
        .expect_liveness()
        .returning(|_| ProcessLiveness::Unknown);

    let (manager, _dir) = manager_with(
        Arc::new(supervisor),
        Arc::new(parameters),
        schemas,
        Arc::new(RecordingInvoker::new()),
    )
    .await;

    let err = manager
        .provision_nodes(
            &node_configs(json!({"arm": {"joints": 6, "speed": 0.5}})),
            &FileBundle::new(),
        )
        .await
        .unwrap_err();
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn test_call_failure_from_transport_aborts_task() {
    let mut invoker = MockInvoker::new();
    invoker
        .expect_call()
        .withf(|interface, request| {
            interface.interface_name == "/nav/plan" && request.message_class == "PlanRequest"
        })
        .times(1)
        .returning(|interface, _| Err(InvokeError::Unavailable(interface.interface_name.clone())));
    invoker.expect_publish().never();

    let (manager, _dir) = manager_with(
        Arc::new(InMemorySupervisor::new()),
        Arc::new(InMemoryParameterRegistry::new()),
        schemas(),
        Arc::new(invoker),
    )
    .await;

    let task_id = manager.allocate_task().await.unwrap();
    manager
        .create_task(&task_id, &json!({"interface": "plan", "msg": {}}), &FileBundle::new())
        .await
        .unwrap();

    let result = wait_for_status(&manager, &task_id, TaskStatus::Aborted).await;
    assert_eq!(
        result,
        TaskResult {
            status: TaskStatus::Aborted,
            result: Some(json!({"error": "service call failed"})),
        }
    );
}
