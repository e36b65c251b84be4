//! # Connection State Monitor
//!
//! Tracks whether the backend is believed reachable. Readers never block on a
//! probe: [`ConnectionMonitor::is_reachable`] returns the last recorded state,
//! and only [`ConnectionMonitor::probe`] mutates it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lightweight reachability check against the backend
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn ping(&self) -> bool;
}

/// Probe that always answers reachable, for wiring without a real backend
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysReachable;

#[async_trait]
impl ReachabilityProbe for AlwaysReachable {
    async fn ping(&self) -> bool {
        true
    }
}

/// Last observed reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub reachable: bool,

    /// `None` until the first probe completes
    pub last_checked_at: Option<DateTime<Utc>>,
}

pub struct ConnectionMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    probe_timeout: Duration,
    state: RwLock<ConnectionState>,
}

impl std::fmt::Debug for ConnectionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("probe_timeout", &self.probe_timeout)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl ConnectionMonitor {
    /// Create a monitor that starts optimistic: reachable until a probe says otherwise
    pub fn new(probe: Arc<dyn ReachabilityProbe>, probe_timeout: Duration) -> Self {
        Self {
            probe,
            probe_timeout,
            state: RwLock::new(ConnectionState {
                reachable: true,
                last_checked_at: None,
            }),
        }
    }

    pub fn always_reachable() -> Self {
        Self::new(Arc::new(AlwaysReachable), Duration::from_secs(1))
    }

    /// Run one reachability check and record the outcome.
    ///
    /// Never fails: a probe that does not answer within the timeout counts as
    /// unreachable.
    pub async fn probe(&self) -> bool {
        let reachable = tokio::time::timeout(self.probe_timeout, self.probe.ping())
            .await
            .unwrap_or(false);

        let previous = {
            let mut state = self.state.write();
            let previous = state.reachable;
            state.reachable = reachable;
            state.last_checked_at = Some(Utc::now());
            previous
        };

        match (previous, reachable) {
            (true, false) => warn!("🔌 Backend became unreachable"),
            (false, true) => info!("🔌 Backend reachable again"),
            _ => debug!(reachable = reachable, "Connection probe completed"),
        }

        reachable
    }

    pub fn is_reachable(&self) -> bool {
        self.state.read().reachable
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Probe every `interval` until `shutdown` carries `true` or its sender is dropped
    pub fn spawn_probe_loop(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "🔌 Connection probe loop started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.probe().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("🔌 Connection probe loop stopped");
        })
    }
}
