//! elephantd - Elephant-Flow Rerouting Controller Daemon
//!
//! Entry point: wires the controller core to the stats poller and runs
//! until interrupted. The switch-protocol transport hands inbound events
//! into the controller's queue and drains each datapath's outbound channel
//! onto the wire.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use elephantd::{ControllerConfig, ElephantController, StatsPoller};

#[derive(Parser, Debug)]
#[command(name = "elephantd", about = "Elephant-flow rerouting controller")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the statistics polling interval, seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Log filter (overridden by RUST_LOG when set)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<ControllerConfig> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = secs;
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("elephantd failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("--- Starting elephantd ---");
    info!(
        "Generator port ranges (informational): mouse {}..{} elephant {}..{}",
        config.mouse_udp_ports.start,
        config.mouse_udp_ports.end,
        config.elephant_udp_ports.start,
        config.elephant_udp_ports.end
    );

    let cancel = CancellationToken::new();
    let controller = Arc::new(ElephantController::new(config));
    let poller = StatsPoller::from_config(
        Arc::clone(controller.registry()),
        controller.config(),
        cancel.clone(),
    );

    // The transport feeds connect/disconnect, stats replies, packet-ins and
    // topology-change signals into this queue; `event_tx` is its handle.
    let (event_tx, event_rx) = mpsc::channel(1024);

    let poller_task = tokio::spawn(poller.run());
    let core = Arc::clone(&controller);
    let core_cancel = cancel.clone();
    let core_task = tokio::spawn(async move { core.run(event_rx, core_cancel).await });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Signal handler failed: {e}");
    }
    info!("Shutdown requested");
    drop(event_tx);
    cancel.cancel();

    let _ = poller_task.await;
    let _ = core_task.await;
    info!("elephantd stopped");
    ExitCode::SUCCESS
}
