use crate::chart::{ChartError, ChartModel, ChartSpec, HistoryFrame};
use crate::client::MonitorApi;
use crate::format::compute_n;
use crate::metrics::Snapshot;
use crate::registry::DeviceRegistry;
use crate::view::{LatestView, ViewParams};
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

/// Per-poller sequence numbers. A response is applied only if no newer
/// response of the same poller has been applied already.
#[derive(Debug, Default)]
struct Generation {
    issued: u64,
    applied: u64,
}

impl Generation {
    fn next(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn accept(&mut self, generation: u64) -> bool {
        if generation <= self.applied {
            return false;
        }
        self.applied = generation;
        true
    }
}

/// Outcome of the most recent polls, shown in the footer.
#[derive(Debug, Default, Clone)]
pub struct PollStatus {
    pub latest_ok_at: Option<DateTime<Local>>,
    pub history_ok_at: Option<DateTime<Local>>,
    pub latest_error: Option<String>,
    pub history_error: Option<String>,
    pub history_points: usize,
    pub failures: u64,
}

/// Everything the pollers write and the renderer reads. Created once at startup.
#[derive(Debug)]
pub struct Dashboard {
    pub latest: LatestView,
    pub signal_chart: ChartModel,
    pub latency_chart: ChartModel,
    pub registry: DeviceRegistry,
    pub status: PollStatus,
    latest_gen: Generation,
    history_gen: Generation,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            latest: LatestView::default(),
            signal_chart: ChartModel::new(ChartSpec::signal()),
            latency_chart: ChartModel::new(ChartSpec::latency()),
            registry: DeviceRegistry::new(),
            status: PollStatus::default(),
            latest_gen: Generation::default(),
            history_gen: Generation::default(),
        }
    }

    pub fn shared() -> SharedDashboard {
        Arc::new(Mutex::new(Self::new()))
    }

    fn begin_latest(&mut self) -> u64 {
        self.latest_gen.next()
    }

    fn finish_latest(&mut self, generation: u64, snapshot: &Snapshot) -> bool {
        if !self.latest_gen.accept(generation) {
            return false;
        }
        self.latest.apply(snapshot);
        if self.registry.observe_latest(snapshot) {
            debug!(device = ?snapshot.device_id(), "Discovered device from latest snapshot");
        }
        self.status.latest_ok_at = Some(Local::now());
        self.status.latest_error = None;
        true
    }

    fn begin_history(&mut self) -> u64 {
        self.history_gen.next()
    }

    /// Replaces both charts or neither.
    fn finish_history(&mut self, generation: u64, series: &[Snapshot]) -> Result<bool, ChartError> {
        if generation <= self.history_gen.applied {
            return Ok(false);
        }

        let frame = HistoryFrame::from_series(series);
        let mut signal = self.signal_chart.clone();
        signal.replace(frame.labels.clone(), vec![frame.rssi])?;
        let mut latency = self.latency_chart.clone();
        latency.replace(frame.labels, vec![frame.router_ms, frame.linux_ms])?;

        signal.redraw();
        latency.redraw();
        self.signal_chart = signal;
        self.latency_chart = latency;
        self.history_gen.accept(generation);

        let added = self.registry.observe_history(series);
        if added > 0 {
            debug!(added, "Discovered devices from history");
        }
        self.status.history_points = series.len();
        self.status.history_ok_at = Some(Local::now());
        self.status.history_error = None;
        Ok(true)
    }
}

fn lock(dashboard: &SharedDashboard) -> MutexGuard<'_, Dashboard> {
    dashboard.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fetches the latest snapshot into the status panel.
///
/// Failures are logged and leave the previous display untouched.
pub async fn refresh_latest(api: &dyn MonitorApi, dashboard: &SharedDashboard) {
    let generation = lock(dashboard).begin_latest();

    match api.latest().await {
        Ok(snapshot) => {
            if !lock(dashboard).finish_latest(generation, &snapshot) {
                debug!(generation, "Discarded stale latest snapshot");
            }
        }
        Err(e) => {
            warn!("Latest refresh failed: {}", e);
            let mut d = lock(dashboard);
            d.status.latest_error = Some(e.to_string());
            d.status.failures += 1;
        }
    }
}

/// Fetches the history window selected by `params` into both charts.
///
/// Same failure policy as [`refresh_latest`]: charts keep their last good data.
pub async fn refresh_history(
    api: &dyn MonitorApi,
    dashboard: &SharedDashboard,
    params: &ViewParams,
    points_per_minute: u32,
) {
    let n = compute_n(params.window_minutes, points_per_minute);
    let generation = lock(dashboard).begin_history();
    debug!(generation, n, device = ?params.device(), "Refreshing history");

    let failure = match api.history(n, params.device()).await {
        Ok(series) => match lock(dashboard).finish_history(generation, &series) {
            Ok(true) => None,
            Ok(false) => {
                debug!(generation, "Discarded stale history response");
                None
            }
            Err(e) => Some(e.to_string()),
        },
        Err(e) => Some(e.to_string()),
    };

    if let Some(error) = failure {
        warn!("History refresh failed: {}", error);
        let mut d = lock(dashboard);
        d.status.history_error = Some(error);
        d.status.failures += 1;
    }
}
