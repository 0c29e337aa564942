use crate::format::DEFAULT_POINTS_PER_MINUTE;
use crate::scheduler::RefreshIntervals;
use crate::view::ViewParams;
use anyhow::{bail, Context};
use clap::Args;
use std::time::Duration;

/// Where to find the monitoring backend and what to ask it for.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Base URL of the monitoring backend
    #[arg(short, long, default_value = "http://localhost:8080")]
    pub base_url: String,

    /// History window in minutes
    #[arg(short, long, default_value = "10")]
    pub window: u32,

    /// Only show history for this device
    #[arg(short, long)]
    pub device: Option<String>,

    /// Expected backend sampling cadence, used to size history requests
    #[arg(long, default_value_t = DEFAULT_POINTS_PER_MINUTE)]
    pub points_per_minute: u32,
}

/// Refresh cadence of the live dashboard.
#[derive(Debug, Clone, Args)]
pub struct RefreshArgs {
    /// Interval between latest-snapshot refreshes in milliseconds
    #[arg(long, default_value = "2000")]
    pub latest_interval_ms: u64,

    /// Interval between history refreshes in milliseconds
    #[arg(long, default_value = "5000")]
    pub history_interval_ms: u64,
}

impl Default for RefreshArgs {
    fn default() -> Self {
        Self {
            latest_interval_ms: 2000,
            history_interval_ms: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub base_url: String,
    pub intervals: RefreshIntervals,
    pub initial_view: ViewParams,
    pub points_per_minute: u32,
}

impl DashboardConfig {
    pub fn from_args(source: &SourceArgs, refresh: &RefreshArgs) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(&source.base_url)
            .with_context(|| format!("invalid base URL {:?}", source.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base URL must be http or https, got {:?}", url.scheme());
        }
        if refresh.latest_interval_ms == 0 || refresh.history_interval_ms == 0 {
            bail!("refresh intervals must be greater than zero");
        }
        if source.points_per_minute == 0 {
            bail!("points per minute must be greater than zero");
        }

        Ok(Self {
            base_url: source.base_url.clone(),
            intervals: RefreshIntervals {
                latest: Duration::from_millis(refresh.latest_interval_ms),
                history: Duration::from_millis(refresh.history_interval_ms),
            },
            initial_view: ViewParams::new(
                source.window,
                source.device.clone().unwrap_or_default(),
            ),
            points_per_minute: source.points_per_minute,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceArgs {
        SourceArgs {
            base_url: "http://localhost:8080".into(),
            window: 10,
            device: None,
            points_per_minute: DEFAULT_POINTS_PER_MINUTE,
        }
    }

    fn refresh() -> RefreshArgs {
        RefreshArgs::default()
    }

    #[test]
    fn defaults_match_the_dashboard_cadence() {
        let config = DashboardConfig::from_args(&source(), &refresh()).unwrap();
        assert_eq!(config.intervals, RefreshIntervals::default());
        assert_eq!(config.initial_view, ViewParams::new(10, ""));
        assert_eq!(config.points_per_minute, 30);
    }

    #[test]
    fn zero_window_is_clamped_and_device_kept() {
        let mut args = source();
        args.window = 0;
        args.device = Some("esp32-a".into());
        let config = DashboardConfig::from_args(&args, &refresh()).unwrap();
        assert_eq!(config.initial_view.window_minutes, 1);
        assert_eq!(config.initial_view.device(), Some("esp32-a"));
    }

    #[test]
    fn rejects_bad_values() {
        let mut args = source();
        args.base_url = "localhost:8080/api".into();
        assert!(DashboardConfig::from_args(&args, &refresh()).is_err());

        args.base_url = "ftp://monitor".into();
        assert!(DashboardConfig::from_args(&args, &refresh()).is_err());

        let mut fast = refresh();
        fast.latest_interval_ms = 0;
        assert!(DashboardConfig::from_args(&source(), &fast).is_err());

        let mut args = source();
        args.points_per_minute = 0;
        assert!(DashboardConfig::from_args(&args, &refresh()).is_err());
    }
}
