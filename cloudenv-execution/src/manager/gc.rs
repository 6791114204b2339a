//! Garbage collection and shutdown
//!
//! Collection runs in two independent phases. `age_out` marks tasks that
//! have not been accessed within the timeout as deleted; `reclaim` destroys
//! whatever carries a deletion mark. The background loop runs `age_out`
//! every quarter timeout and `reclaim` whenever the store reports a new
//! mark.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::EnvironmentManager;
use crate::error::{EnvironmentError, EnvironmentResult};

pub(super) struct GcLoop {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// What one `reclaim` pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub nodes: u64,
    pub tasks: u64,
    pub files: usize,
}

impl EnvironmentManager {
    /// Mark every live task not accessed within `timeout` as deleted
    pub async fn age_out(&self, timeout: Duration) -> EnvironmentResult<u64> {
        let cutoff = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| {
                EnvironmentError::internal(format!("Timeout {:?} is out of range", timeout))
            })?;
        let marked = self.inner.store.age_out_tasks(cutoff).await?;
        Ok(marked)
    }

    /// Destroy every node and task carrying a deletion mark
    pub async fn reclaim(&self) -> EnvironmentResult<SweepStats> {
        let mut stats = SweepStats::default();

        let nodes = self.inner.store.deleted_nodes().await?;
        let mut node_ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Err(e) = self.collaborators().supervisor.terminate(&node.node_id).await {
                warn!("Could not terminate node {}: {}", node.node_id, e);
            }
            if let Err(e) = self
                .collaborators()
                .parameters
                .remove_namespace(&node.node_id)
                .await
            {
                warn!("Could not remove parameters of node {}: {}", node.node_id, e);
            }
            node_ids.push(node.node_id);
        }
        stats.nodes = self.inner.store.delete_nodes(&node_ids).await?;

        let task_ids = self.inner.store.deleted_tasks().await?;
        for file in self.inner.store.files_for_tasks(&task_ids).await? {
            match tokio::fs::remove_file(&file.filename).await {
                Ok(()) => stats.files += 1,
                Err(e) => debug!("Could not remove result file {}: {}", file.filename, e),
            }
        }
        stats.tasks = self.inner.store.delete_tasks(&task_ids).await?;

        if stats != SweepStats::default() {
            info!(
                "Reclaimed {} nodes, {} tasks and {} files",
                stats.nodes, stats.tasks, stats.files
            );
        }
        Ok(stats)
    }

    /// Start the background collection loop; a no-op if it already runs
    pub fn start_gc(&self) {
        let mut gc = self.inner.gc.lock();
        if gc.is_some() {
            return;
        }

        let (stop, stopped) = watch::channel(false);
        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.run_gc(stopped).await });
        *gc = Some(GcLoop { stop, handle });
        info!(
            "Garbage collection started (poll every {:?})",
            self.inner.config.gc_poll_interval
        );
    }

    async fn run_gc(self, mut stopped: watch::Receiver<bool>) {
        let timeout = self.inner.config.timeout;
        let age_out_every = self.inner.config.age_out_ticks();
        let marks = self.inner.store.deletion_marks();

        let mut ticker = tokio::time::interval(self.inner.config.gc_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    ticks += 1;
                    if ticks >= age_out_every {
                        ticks = 0;
                        if let Err(e) = self.age_out(timeout).await {
                            error!("Aging out tasks failed: {}", e);
                        }
                    }
                }
                _ = marks.notified() => {
                    if let Err(e) = self.reclaim().await {
                        error!("Reclaiming deleted state failed: {}", e);
                    }
                }
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Garbage collection loop stopped");
    }

    /// Stop collection, abort background tasks, remove every result file
    /// and close the store
    pub async fn shutdown(&self) -> EnvironmentResult<()> {
        info!("Shutting down environment manager");

        let gc = self.inner.gc.lock().take();
        if let Some(gc) = gc {
            let _ = gc.stop.send(true);
            if let Err(e) = gc.handle.await {
                warn!("Garbage collection loop ended abnormally: {}", e);
            }
        }

        self.inner.tasks.abort_all();

        for file in self.inner.store.all_files().await? {
            if let Err(e) = tokio::fs::remove_file(&file.filename).await {
                debug!("Could not remove result file {}: {}", file.filename, e);
            }
        }

        self.inner.store.close().await?;
        info!("Environment manager stopped");
        Ok(())
    }
}
