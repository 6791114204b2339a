mod common;

use cloudenv_execution::testing::{InMemoryParameterRegistry, RecordingInvoker};
use cloudenv_execution::{EnvironmentError, TaskResult};
use cloudenv_interfaces::{FileBundle, NativeMessage};
use cloudenv_storage::TaskStatus;
use common::{setup, setup_with, wait_for_status, TestEnv};
use serde_json::{json, Value as JsonValue};

async fn aborted_with(env: &TestEnv, task_id: &str, reason: &str) {
    assert_eq!(
        env.manager.get_result(task_id).await.unwrap(),
        TaskResult {
            status: TaskStatus::Aborted,
            result: Some(json!({ "error": reason })),
        }
    );
}

async fn create(env: &TestEnv, config: JsonValue) -> (String, Result<(), EnvironmentError>) {
    let task_id = env.manager.allocate_task().await.unwrap();
    let outcome = env
        .manager
        .create_task(&task_id, &config, &FileBundle::new())
        .await;
    (task_id, outcome)
}

#[tokio::test]
async fn test_stream_task_completes_before_returning() {
    let env = setup().await;

    let (task_id, outcome) = create(&env, json!({"interface": "goal", "msg": {"x": 1.5}})).await;
    outcome.unwrap();

    assert_eq!(
        env.manager.get_result(&task_id).await.unwrap(),
        TaskResult {
            status: TaskStatus::Completed,
            result: Some(json!({})),
        }
    );
    let published = env.fakes.invoker.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "/nav/goal");
    assert_eq!(published[0].1, NativeMessage::new("Goal", json!({"x": 1.5})));
}

#[tokio::test]
async fn test_call_task_runs_in_background() {
    let env = setup_with(InMemoryParameterRegistry::new(), RecordingInvoker::gated()).await;
    env.fakes.invoker.respond_with(json!({"path": [1, 2, 3]}));

    let (task_id, outcome) = create(&env, json!({"interface": "plan", "msg": {"to": "dock"}})).await;
    outcome.unwrap();

    assert_eq!(
        env.manager.get_result(&task_id).await.unwrap(),
        TaskResult {
            status: TaskStatus::Running,
            result: None,
        }
    );
    assert_eq!(env.manager.task_registry().active_count(), 1);

    env.fakes.invoker.release_calls(1);
    let result = wait_for_status(&env.manager, &task_id, TaskStatus::Completed).await;
    assert_eq!(result.result, Some(json!({"path": [1, 2, 3]})));
}

#[tokio::test]
async fn test_failed_call_aborts_task() {
    let env = setup().await;
    env.fakes.invoker.fail_calls("service unreachable");

    let (task_id, outcome) = create(&env, json!({"interface": "plan", "msg": {}})).await;
    outcome.unwrap();

    wait_for_status(&env.manager, &task_id, TaskStatus::Aborted).await;
    aborted_with(&env, &task_id, "service call failed").await;
}

#[tokio::test]
async fn test_request_validation_aborts_task() {
    let env = setup().await;

    let cases = [
        (json!(["not", "an", "object"]), "invalid data"),
        (json!({"msg": {}}), "undefined interface"),
        (json!({"interface": "goal"}), "message data missing"),
        (json!({"interface": "teleport", "msg": {}}), "invalid interface"),
        (json!({"interface": 7, "msg": {}}), "invalid interface"),
        (json!({"interface": "goal", "msg": "not an object"}), "invalid request message"),
    ];

    for (config, reason) in cases {
        let (task_id, outcome) = create(&env, config).await;
        let err = outcome.unwrap_err();
        assert!(err.is_client_error(), "{} should be a client error", reason);
        aborted_with(&env, &task_id, reason).await;
    }
}

#[tokio::test]
async fn test_backend_failures_abort_task() {
    let env = setup().await;

    let (task_id, outcome) = create(
        &env,
        json!({"interface": "goal", "msg": {"map": "ref:missing"}}),
    )
    .await;
    assert!(!outcome.unwrap_err().is_client_error());
    aborted_with(&env, &task_id, "serialization error").await;

    let (task_id, outcome) = create(&env, json!({"interface": "legacy", "msg": {}})).await;
    assert!(matches!(outcome, Err(EnvironmentError::InternalError(_))));
    aborted_with(&env, &task_id, "unsupported interface kind").await;

    env.fakes.invoker.fail_publishes("topic gone");
    let (task_id, outcome) = create(&env, json!({"interface": "goal", "msg": {}})).await;
    assert!(matches!(outcome, Err(EnvironmentError::InternalError(_))));
    aborted_with(&env, &task_id, "unable to publish message").await;
}

#[tokio::test]
async fn test_unknown_task_id_is_rejected() {
    let env = setup().await;

    let err = env
        .manager
        .create_task("no-such-task", &json!({"interface": "goal", "msg": {}}), &FileBundle::new())
        .await
        .unwrap_err();
    assert!(err.is_client_error());

    let err = env.manager.get_result("no-such-task").await.unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_removed_task_cannot_be_started() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();
    assert!(env.manager.is_valid_task(&task_id).await.unwrap());

    env.manager.remove_task(&task_id).await.unwrap();
    assert!(!env.manager.is_valid_task(&task_id).await.unwrap());

    let err = env
        .manager
        .create_task(&task_id, &json!({"interface": "goal", "msg": {}}), &FileBundle::new())
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_remove_task_is_idempotent() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();

    env.manager.remove_task(&task_id).await.unwrap();
    let first = env.manager.get_result(&task_id).await.unwrap();
    env.manager.remove_task(&task_id).await.unwrap();
    let second = env.manager.get_result(&task_id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.status, TaskStatus::Deleted);
    assert_eq!(first.result, None);
}

#[tokio::test]
async fn test_abort_task_is_idempotent() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();

    env.manager.abort_task(&task_id, "operator request").await.unwrap();
    env.manager.abort_task(&task_id, "operator request").await.unwrap();
    aborted_with(&env, &task_id, "operator request").await;
}

#[tokio::test]
async fn test_result_files_are_stored() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();

    env.manager
        .record_result(
            &task_id,
            NativeMessage::new(
                "Snapshot",
                json!({"frame": 12, "files": {"image": "raw pixels"}}),
            ),
        )
        .await;

    let result = env.manager.get_result(&task_id).await.unwrap();
    assert_eq!(result.status, TaskStatus::Completed);
    assert_eq!(
        result.result,
        Some(json!({"frame": 12, "files": {"image": "ref:image"}}))
    );

    let path = env.manager.get_file(&task_id, "image").await.unwrap();
    assert!(path.starts_with(env.results_dir()));
    assert_eq!(std::fs::read(&path).unwrap(), b"raw pixels");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

#[tokio::test]
async fn test_unknown_file_reference() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();

    let err = env.manager.get_file(&task_id, "nothing").await.unwrap_err();
    assert!(matches!(err, EnvironmentError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_unencodable_result_is_swallowed() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();

    // Returns normally; the failure only shows in the task result
    env.manager
        .record_result(&task_id, NativeMessage::new("Odd", json!("not an object")))
        .await;

    aborted_with(&env, &task_id, "invalid response message").await;
}

#[tokio::test]
async fn test_result_for_removed_task_does_not_revive_it() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();
    env.manager.remove_task(&task_id).await.unwrap();

    env.manager
        .record_result(&task_id, NativeMessage::new("Late", json!({"ok": true})))
        .await;

    let result = env.manager.get_result(&task_id).await.unwrap();
    assert_eq!(result.status, TaskStatus::Deleted);
}

#[tokio::test]
async fn test_failure_after_removal_reports_aborted() {
    let env = setup_with(InMemoryParameterRegistry::new(), RecordingInvoker::gated()).await;
    env.fakes.invoker.fail_calls("service unreachable");

    let (task_id, outcome) = create(&env, json!({"interface": "plan", "msg": {}})).await;
    outcome.unwrap();
    env.manager.remove_task(&task_id).await.unwrap();
    assert_eq!(
        env.manager.get_result(&task_id).await.unwrap().status,
        TaskStatus::Deleted
    );

    // Aborting does not skip removed tasks
    env.fakes.invoker.release_calls(1);
    wait_for_status(&env.manager, &task_id, TaskStatus::Aborted).await;
    aborted_with(&env, &task_id, "service call failed").await;

    let task_id = env.manager.allocate_task().await.unwrap();
    env.manager.remove_task(&task_id).await.unwrap();
    env.manager
        .record_result(&task_id, NativeMessage::new("Odd", json!("not an object")))
        .await;
    aborted_with(&env, &task_id, "invalid response message").await;
}
