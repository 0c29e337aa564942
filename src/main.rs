mod chart;
mod client;
mod config;
mod format;
mod metrics;
mod poller;
mod registry;
mod report;
mod scheduler;
#[cfg(test)]
mod testing;
mod tui;
mod view;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chart::HistoryFrame;
use crate::client::{HttpMonitorClient, MonitorApi};
use crate::config::{DashboardConfig, RefreshArgs, SourceArgs};
use crate::format::compute_n;
use crate::poller::Dashboard;
use crate::scheduler::RefreshScheduler;
use crate::view::{LatestView, ViewControls};

#[derive(Parser)]
#[command(name = "linkwatch")]
#[command(about = "Live dashboard for network link health readings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live dashboard
    Dashboard {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        refresh: RefreshArgs,

        /// Path to store log files
        #[arg(short, long, default_value = "logs")]
        log_dir: PathBuf,

        /// Log a summary line instead of drawing the terminal dashboard
        #[arg(long, default_value = "false")]
        headless: bool,
    },
    /// Print the latest reading once
    Latest {
        /// Base URL of the monitoring backend
        #[arg(short, long, default_value = "http://localhost:8080")]
        base_url: String,
    },
    /// Print the history window once
    History {
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn init_logging(log_dir: &Path, to_stdout: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::HOURLY, log_dir, "linkwatch.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // stdout belongs to the terminal dashboard unless running headless
    let stdout_layer = to_stdout.then(|| fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .with(fmt::layer().json().with_writer(non_blocking))
        .init();

    Ok(guard)
}

fn init_console_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dashboard {
            source,
            refresh,
            log_dir,
            headless,
        } => {
            let config = DashboardConfig::from_args(&source, &refresh)?;
            let _guard = init_logging(&log_dir, headless)?;

            let client = HttpMonitorClient::new(&config.base_url);
            info!("Starting linkwatch");
            info!("Monitoring backend: {}", client.base_url());
            info!("Log directory: {:?}", log_dir);

            let dashboard = Dashboard::shared();
            let (controls, view_rx) = ViewControls::new(config.initial_view.clone());
            let (stop_tx, stop_rx) = oneshot::channel::<()>();

            let scheduler = RefreshScheduler::new(
                Arc::new(client),
                dashboard.clone(),
                config.intervals,
                view_rx,
                config.points_per_minute,
            );
            let scheduler = tokio::spawn(scheduler.run(async move {
                let _ = stop_rx.await;
            }));

            if headless {
                info!("Running in headless mode. Press Ctrl+C to stop");
                let _controls = controls;
                report::run_headless(dashboard, config.intervals.latest, async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
            } else {
                tokio::task::spawn_blocking(move || tui::run(dashboard, controls)).await??;
            }

            info!("Shutting down...");
            let _ = stop_tx.send(());
            scheduler.await?;
            Ok(())
        }
        Commands::Latest { base_url } => {
            init_console_logging();
            let client = HttpMonitorClient::new(&base_url);
            let snapshot = client.latest().await?;
            let mut view = LatestView::default();
            view.apply(&snapshot);
            println!("{}", report::summary_line(&view));
            Ok(())
        }
        Commands::History { source } => {
            init_console_logging();
            let config = DashboardConfig::from_args(&source, &RefreshArgs::default())?;
            let client = HttpMonitorClient::new(&config.base_url);
            let n = compute_n(config.initial_view.window_minutes, config.points_per_minute);
            let series = client.history(n, config.initial_view.device()).await?;
            print!("{}", report::history_table(&HistoryFrame::from_series(&series)));
            Ok(())
        }
    }
}
