//! Registry of background task units

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Tracks the spawned tokio tasks that execute call-kind tasks
#[derive(Debug, Default)]
pub struct TaskRegistry {
    units: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `unit` on the runtime and track it under `task_id`
    pub fn spawn<F>(&self, task_id: &str, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(unit);
        let mut units = self.units.lock();
        units.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = units.insert(task_id.to_string(), handle) {
            // A task id runs at most one unit at a time
            previous.abort();
        }
        debug!("Spawned background unit for task {}", task_id);
    }

    /// Number of units that have not finished yet
    pub fn active_count(&self) -> usize {
        let mut units = self.units.lock();
        units.retain(|_, handle| !handle.is_finished());
        units.len()
    }

    pub fn is_running(&self, task_id: &str) -> bool {
        self.units
            .lock()
            .get(task_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort every outstanding unit
    pub fn abort_all(&self) -> usize {
        let drained: Vec<_> = self.units.lock().drain().collect();
        let mut aborted = 0;
        for (task_id, handle) in drained {
            if !handle.is_finished() {
                debug!("Aborting background unit for task {}", task_id);
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            info!("Aborted {} background task units", aborted);
        }
        aborted
    }
}
