mod common;

use cloudenv_execution::testing::{
    InMemoryCollaborators, InMemoryParameterRegistry, RecordingInvoker,
};
use cloudenv_execution::{EnvironmentManager, SweepStats};
use cloudenv_interfaces::{FileBundle, NativeMessage};
use cloudenv_storage::TaskStatus;
use common::{config_in, eventually, files_in, node_configs, schemas, setup, setup_with};
use serde_json::json;
use std::time::Duration;

async fn task_with_file(manager: &EnvironmentManager) -> (String, std::path::PathBuf) {
    let task_id = manager.allocate_task().await.unwrap();
    manager
        .record_result(
            &task_id,
            NativeMessage::new("Scan", json!({"files": {"cloud": "points"}})),
        )
        .await;
    let path = manager.get_file(&task_id, "cloud").await.unwrap();
    (task_id, path)
}

#[tokio::test]
async fn test_age_out_marks_then_reclaim_sweeps() {
    let env = setup().await;
    let (task_id, path) = task_with_file(&env.manager).await;

    // Fresh tasks survive
    assert_eq!(env.manager.age_out(Duration::from_secs(60)).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(30)).await;

    // Sweeping before the mark destroys nothing
    assert_eq!(env.manager.reclaim().await.unwrap(), SweepStats::default());
    assert!(path.exists());

    assert_eq!(env.manager.age_out(Duration::from_millis(10)).await.unwrap(), 1);
    let marked = env.manager.get_result(&task_id).await.unwrap();
    assert_eq!(marked.status, TaskStatus::Deleted);
    assert!(path.exists(), "marking alone keeps the file");

    let stats = env.manager.reclaim().await.unwrap();
    assert_eq!(
        stats,
        SweepStats {
            nodes: 0,
            tasks: 1,
            files: 1,
        }
    );
    assert!(!path.exists());
    assert!(env.manager.get_result(&task_id).await.unwrap_err().is_client_error());
}

#[tokio::test]
async fn test_reclaim_terminates_removed_nodes() {
    let env = setup().await;
    let node_ids = env
        .manager
        .provision_nodes(
            &node_configs(json!({"lidar": {"rate": 40}, "nav": {"rate": 10}})),
            &FileBundle::new(),
        )
        .await
        .unwrap();

    env.manager.remove_nodes(&["nav".to_string()]).await.unwrap();
    let stats = env.manager.reclaim().await.unwrap();
    assert_eq!(stats.nodes, 1);

    assert_eq!(env.fakes.supervisor.terminated(), vec![node_ids[1].clone()]);
    assert_eq!(
        env.fakes.parameters.keys(),
        vec![format!("{}/rate", node_ids[0])]
    );

    let statuses = env.manager.list_node_status().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].name, "lidar");
}

#[tokio::test]
async fn test_removed_task_is_swept_by_gc_loop() {
    let env = setup().await;
    let (task_id, path) = task_with_file(&env.manager).await;
    env.manager.start_gc();
    // Starting twice keeps a single loop
    env.manager.start_gc();

    env.manager.remove_task(&task_id).await.unwrap();

    eventually(|| !path.exists()).await;
    let store = env.manager.store().clone();
    for _ in 0..200 {
        if store.find_task(&task_id).await.unwrap().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.find_task(&task_id).await.unwrap().is_none());

    env.manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_gc_loop_ages_out_idle_tasks() {
    let _ = cloudenv_logging::init_simple_tracing("debug");
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.environment.timeout = Duration::from_millis(200);
    config.environment.gc_poll_interval = Duration::from_millis(10);

    let fakes = InMemoryCollaborators::new(
        schemas(),
        InMemoryParameterRegistry::new(),
        RecordingInvoker::new(),
    );
    let manager = EnvironmentManager::open(&config, fakes.collaborators())
        .await
        .unwrap();
    let (task_id, path) = task_with_file(&manager).await;

    manager.start_gc();
    eventually(|| !path.exists()).await;
    let store = manager.store().clone();
    for _ in 0..200 {
        if store.find_task(&task_id).await.unwrap().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.find_task(&task_id).await.unwrap().is_none());

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_cleans_up() {
    let env = setup_with(InMemoryParameterRegistry::new(), RecordingInvoker::gated()).await;
    let (_, path) = task_with_file(&env.manager).await;

    let task_id = env.manager.allocate_task().await.unwrap();
    env.manager
        .create_task(&task_id, &json!({"interface": "plan", "msg": {}}), &FileBundle::new())
        .await
        .unwrap();
    assert_eq!(env.manager.task_registry().active_count(), 1);

    env.manager.start_gc();
    env.manager.shutdown().await.unwrap();

    assert_eq!(env.manager.task_registry().active_count(), 0);
    assert!(!path.exists());
    assert!(files_in(&env.results_dir()).is_empty());
}

#[tokio::test]
async fn test_idle_environment_reports_inactive() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.environment.timeout = Duration::from_millis(20);

    let fakes = InMemoryCollaborators::new(
        schemas(),
        InMemoryParameterRegistry::new(),
        RecordingInvoker::new(),
    );
    let manager = EnvironmentManager::open(&config, fakes.collaborators())
        .await
        .unwrap();
    assert!(manager.is_active());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(!manager.is_active());

    // Status queries are not activity
    manager.list_node_status().await.unwrap();
    assert!(!manager.is_active());

    manager.remove_task("whatever").await.unwrap();
    assert!(manager.is_active());
}

#[tokio::test]
async fn test_age_out_rejects_out_of_range_timeout() {
    let env = setup().await;
    let task_id = env.manager.allocate_task().await.unwrap();

    for timeout in [Duration::from_secs(10_000_000_000_000), Duration::MAX] {
        let err = env.manager.age_out(timeout).await.unwrap_err();
        assert!(!err.is_client_error());
    }

    assert!(env.manager.is_valid_task(&task_id).await.unwrap());
}
