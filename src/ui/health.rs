//! Periodic out-of-band health probe.

use crate::client::SummaryClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Tri-state backend health as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthIndicator {
    /// No probe has completed yet.
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

/// Probe the service once.
///
/// Any failure to obtain a healthy report, including transport errors, reads
/// as [`HealthIndicator::Unhealthy`].
pub async fn probe_once(client: &SummaryClient) -> HealthIndicator {
    let logging = client.config().logging_enabled;
    match client.get_health().await {
        Ok(health) if health.is_healthy() => HealthIndicator::Healthy,
        Ok(health) => {
            if logging {
                tracing::debug!(status = %health.status, "service reported degraded health");
            }
            HealthIndicator::Unhealthy
        }
        Err(err) => {
            if logging {
                tracing::debug!(error = %err, "health probe failed");
            }
            HealthIndicator::Unhealthy
        }
    }
}

/// Background task publishing [`HealthIndicator`] on a fixed interval.
///
/// Probes use untracked calls, so they neither cancel nor get cancelled by a
/// summary generation. The task stops when the monitor is dropped.
#[derive(Debug)]
pub struct HealthMonitor {
    rx: watch::Receiver<HealthIndicator>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start probing. The first probe runs immediately.
    pub fn spawn(client: Arc<SummaryClient>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(HealthIndicator::Unknown);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let indicator = probe_once(&client).await;
                tx.send_if_modified(|current| {
                    let changed = *current != indicator;
                    *current = indicator;
                    changed
                });
                if tx.is_closed() {
                    break;
                }
            }
        });
        Self { rx, task }
    }

    /// Start probing every [`DEFAULT_PROBE_INTERVAL`].
    pub fn spawn_default(client: Arc<SummaryClient>) -> Self {
        Self::spawn(client, DEFAULT_PROBE_INTERVAL)
    }

    pub fn current(&self) -> HealthIndicator {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthIndicator> {
        self.rx.clone()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
