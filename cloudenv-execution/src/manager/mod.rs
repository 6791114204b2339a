//! The environment manager
//!
//! [`EnvironmentManager`] owns the state store and drives the collaborators
//! of one environment. It is cheap to clone; clones share all state.

mod coerce;
mod gc;
mod provisioning;
mod tasks;

use cloudenv_config::{CloudEnvConfig, EnvironmentConfig};
use cloudenv_interfaces::{
    Converter, InterfaceInvoker, ParameterRegistry, ProcessSupervisor, SchemaRegistry,
};
use cloudenv_storage::StateStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use crate::activity::ActivityMonitor;
use crate::error::EnvironmentResult;
use crate::registry::TaskRegistry;

pub use gc::SweepStats;
pub use provisioning::{NodeConfigs, NodeStatusEntry};
pub use tasks::TaskResult;

/// External services the manager depends on
#[derive(Clone)]
pub struct Collaborators {
    pub supervisor: Arc<dyn ProcessSupervisor>,
    pub parameters: Arc<dyn ParameterRegistry>,
    pub schemas: Arc<dyn SchemaRegistry>,
    pub converter: Arc<dyn Converter>,
    pub invoker: Arc<dyn InterfaceInvoker>,
}

struct ManagerInner {
    config: EnvironmentConfig,
    store: StateStore,
    collaborators: Collaborators,
    activity: Arc<ActivityMonitor>,
    tasks: TaskRegistry,
    gc: Mutex<Option<gc::GcLoop>>,
}

/// Lifecycle manager for the nodes and tasks of one environment
#[derive(Clone)]
pub struct EnvironmentManager {
    inner: Arc<ManagerInner>,
}

impl EnvironmentManager {
    pub fn new(
        config: EnvironmentConfig,
        store: StateStore,
        collaborators: Collaborators,
        activity: Arc<ActivityMonitor>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                store,
                collaborators,
                activity,
                tasks: TaskRegistry::new(),
                gc: Mutex::new(None),
            }),
        }
    }

    /// Connect the configured state store, prepare the working directories
    /// and build a manager around them
    pub async fn open(
        config: &CloudEnvConfig,
        collaborators: Collaborators,
    ) -> EnvironmentResult<Self> {
        let environment = &config.environment;
        tokio::fs::create_dir_all(&environment.results_dir).await?;
        tokio::fs::create_dir_all(&environment.temp_dir).await?;

        let store = StateStore::connect(&config.database).await?;
        info!(
            "Environment manager ready (timeout {:?}, results in {:?})",
            environment.timeout, environment.results_dir
        );

        Ok(Self::new(
            environment.clone(),
            store,
            collaborators,
            Arc::new(ActivityMonitor::new()),
        ))
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    pub fn activity(&self) -> &Arc<ActivityMonitor> {
        &self.inner.activity
    }

    pub fn task_registry(&self) -> &TaskRegistry {
        &self.inner.tasks
    }

    /// Whether the environment was used within the configured timeout
    pub fn is_active(&self) -> bool {
        self.inner.activity.is_active(self.inner.config.timeout)
    }

    fn collaborators(&self) -> &Collaborators {
        &self.inner.collaborators
    }
}
