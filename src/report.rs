use crate::chart::HistoryFrame;
use crate::format::{format_metric, PLACEHOLDER};
use crate::metrics::StateClass;
use crate::poller::SharedDashboard;
use crate::view::LatestView;
use std::fmt::Write;
use std::future::Future;
use std::sync::PoisonError;
use std::time::Duration;
use tokio::time;
use tracing::info;

pub fn summary_line(view: &LatestView) -> String {
    format!(
        "state={} class={} rssi={} router_ms={} linux_ms={} device={} ts={}",
        view.state,
        view.state_class.map(StateClass::name).unwrap_or("none"),
        view.rssi,
        view.router_ms,
        view.linux_ms,
        view.device,
        view.ts
    )
}

/// One row per history point, gaps shown as the placeholder.
pub fn history_table(frame: &HistoryFrame) -> String {
    let mut out = format!("{:<10}{:>10}{:>12}{:>12}\n", "time", "rssi", "router_ms", "linux_ms");
    if frame.is_empty() {
        out.push_str("(no points)\n");
        return out;
    }
    for i in 0..frame.len() {
        let label = if frame.labels[i].is_empty() {
            PLACEHOLDER
        } else {
            frame.labels[i].as_str()
        };
        let _ = writeln!(
            out,
            "{:<10}{:>10}{:>12}{:>12}",
            label,
            format_metric(frame.rssi[i]),
            format_metric(frame.router_ms[i]),
            format_metric(frame.linux_ms[i]),
        );
    }
    out
}

/// Logs the status panel at `every` until `shutdown` resolves.
pub async fn run_headless(dashboard: SharedDashboard, every: Duration, shutdown: impl Future<Output = ()>) {
    let mut tick = time::interval(every);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tick.tick() => {
                let (view, charted) = {
                    let d = dashboard.lock().unwrap_or_else(PoisonError::into_inner);
                    (d.latest.clone(), d.status.history_points)
                };
                info!(points = charted, "{}", summary_line(&view));
            }
        }
    }
}
