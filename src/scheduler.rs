use crate::client::MonitorApi;
use crate::poller::{refresh_history, refresh_latest, SharedDashboard};
use crate::view::ViewParams;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshIntervals {
    pub latest: Duration,
    pub history: Duration,
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            latest: Duration::from_millis(2000),
            history: Duration::from_millis(5000),
        }
    }
}

/// Drives both pollers on their own timers.
///
/// Every run is spawned as an independent task: a slow fetch never delays the
/// other poller or the next tick, and nothing is queued or cancelled.
pub struct RefreshScheduler {
    api: Arc<dyn MonitorApi>,
    dashboard: SharedDashboard,
    intervals: RefreshIntervals,
    view_rx: watch::Receiver<ViewParams>,
    points_per_minute: u32,
}

impl RefreshScheduler {
    pub fn new(
        api: Arc<dyn MonitorApi>,
        dashboard: SharedDashboard,
        intervals: RefreshIntervals,
        view_rx: watch::Receiver<ViewParams>,
        points_per_minute: u32,
    ) -> Self {
        Self {
            api,
            dashboard,
            intervals,
            view_rx,
            points_per_minute,
        }
    }

    /// Runs until `shutdown` resolves. Both pollers fire immediately on entry.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        info!(
            "Refreshing latest every {:?}, history every {:?}",
            self.intervals.latest, self.intervals.history
        );
        let mut latest_tick = time::interval(self.intervals.latest);
        latest_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut history_tick = time::interval(self.intervals.history);
        history_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);
        let mut controls_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = latest_tick.tick() => {
                    self.spawn_latest();
                }
                _ = history_tick.tick() => {
                    let params = self.view_rx.borrow().clone();
                    self.spawn_history(params);
                }
                changed = self.view_rx.changed(), if controls_open => match changed {
                    Ok(()) => {
                        let params = self.view_rx.borrow_and_update().clone();
                        debug!(?params, "View changed, refreshing history now");
                        self.spawn_history(params);
                    }
                    Err(_) => {
                        debug!("View controls dropped");
                        controls_open = false;
                    }
                },
            }
        }

        info!("Refresh scheduler stopped");
    }

    fn spawn_latest(&self) {
        let api = Arc::clone(&self.api);
        let dashboard = Arc::clone(&self.dashboard);
        tokio::spawn(async move {
            refresh_latest(api.as_ref(), &dashboard).await;
        });
    }

    fn spawn_history(&self, params: ViewParams) {
        let api = Arc::clone(&self.api);
        let dashboard = Arc::clone(&self.dashboard);
        let points_per_minute = self.points_per_minute;
        tokio::spawn(async move {
            refresh_history(api.as_ref(), &dashboard, &params, points_per_minute).await;
        });
    }
}
