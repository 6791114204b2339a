//! Activity tracking
//!
//! Operations that count as environment activity run through
//! [`with_activity`], which stamps the shared [`ActivityMonitor`] before the
//! operation starts.

use parking_lot::Mutex;
use std::future::Future;
use std::time::{Duration, Instant};

/// Last time the environment was used
#[derive(Debug)]
pub struct ActivityMonitor {
    last_activity: Mutex<Instant>,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self {
            last_activity: Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// Whether the last activity lies within `timeout`
    pub fn is_active(&self, timeout: Duration) -> bool {
        self.last_activity().elapsed() < timeout
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Record activity, then run `operation`
pub async fn with_activity<F>(monitor: &ActivityMonitor, operation: F) -> F::Output
where
    F: Future,
{
    monitor.touch();
    operation.await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_monitor_is_active() {
        let monitor = ActivityMonitor::new();
        assert!(monitor.is_active(Duration::from_secs(60)));
        assert!(!monitor.is_active(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_with_activity_touches_before_running() {
        let monitor = ActivityMonitor::new();
        let before = monitor.last_activity();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let seen = with_activity(&monitor, async { monitor.last_activity() }).await;
        assert!(seen > before);
    }

    #[tokio::test]
    async fn test_inactivity_after_timeout() {
        let monitor = ActivityMonitor::new();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!monitor.is_active(Duration::from_millis(10)));

        monitor.touch();
        assert!(monitor.is_active(Duration::from_millis(10)));
    }
}
