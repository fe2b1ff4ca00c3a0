//! Weather overlay worker.
//!
//! Polls for the latest GFS cycle and, whenever it changes:
//! - Fetches mean sea level pressure and 10 m wind (NOMADS or a local file)
//! - Decodes the GRIB2 fields off the async runtime
//! - Builds isobars and wind arrows and rasterises them
//! - Publishes the result to a single-slot mailbox for the consumer

mod cycle;
mod pipeline;
mod scheduler;
mod slot;
mod source;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use renderer::OverlayConfig;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use cycle::NOMADS_GFS_FILTER;
use scheduler::{CycleScheduler, SchedulerConfig, UpdateOutcome};
use slot::OverlaySlot;
use source::{FileSource, GribSource, NomadsSource};

#[derive(Parser, Debug)]
#[command(name = "overlay-worker")]
#[command(about = "Pressure isobar and wind arrow overlay worker")]
struct Args {
    /// Run a single update and exit (vs continuous polling)
    #[arg(long)]
    once: bool,

    /// Decode this GRIB2 file instead of fetching from NOMADS
    #[arg(short, long, env = "OVERLAY_INPUT")]
    input: Option<PathBuf>,

    /// Write each published overlay to this PNG file
    #[arg(short, long, env = "OVERLAY_OUTPUT")]
    output: Option<PathBuf>,

    /// NOMADS grib filter endpoint
    #[arg(long, env = "NOMADS_BASE_URL", default_value = NOMADS_GFS_FILTER)]
    base_url: String,

    /// Overlay width in pixels
    #[arg(long, default_value = "660")]
    width: u32,

    /// Overlay height in pixels
    #[arg(long, default_value = "330")]
    height: u32,

    /// Seconds between cycle checks
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "900")]
    poll_interval_secs: u64,

    /// Hours after a cycle starts before its data is assumed published
    #[arg(long, env = "LATENCY_HOURS", default_value = "4")]
    latency_hours: i64,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "120")]
    request_timeout_secs: u64,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn drain_to_disk(slot: &OverlaySlot, output: &Path) {
    if let Err(e) = pipeline::drain_slot(slot, output).await {
        warn!(error = format!("{:#}", e), "Failed to write overlay");
    }
}

/// Drain the slot periodically and write each new overlay to disk.
///
/// Waits for the scheduler to stop before the final drain, so an overlay
/// published just before shutdown is still written.
async fn write_published(
    slot: OverlaySlot,
    output: PathBuf,
    mut shutdown: broadcast::Receiver<()>,
    scheduler_done: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => drain_to_disk(&slot, &output).await,
        }
    }
    scheduler_done.await.ok();
    drain_to_disk(&slot, &output).await;
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    info!("Starting overlay worker");

    let source: Arc<dyn GribSource> = match &args.input {
        Some(path) => {
            info!(path = %path.display(), "Using local GRIB2 file");
            Arc::new(FileSource::new(path))
        }
        None => Arc::new(NomadsSource::new(
            args.base_url.clone(),
            Duration::from_secs(args.request_timeout_secs),
        )?),
    };

    let config = SchedulerConfig {
        latency: SchedulerConfig::latency_from_hours(args.latency_hours)?,
        poll_interval: Duration::from_secs(args.poll_interval_secs),
        overlay: OverlayConfig {
            width: args.width,
            height: args.height,
            ..OverlayConfig::default()
        },
    };

    let slot = OverlaySlot::new();
    let scheduler = CycleScheduler::new(source, slot.clone(), config);

    if args.once {
        info!("Running single update");

        match scheduler.update(Utc::now()).await? {
            UpdateOutcome::Published(cycle) => info!(cycle = %cycle, "Overlay published"),
            UpdateOutcome::Unchanged(cycle) => info!(cycle = %cycle, "Overlay already current"),
        }

        if let (Some(output), Some(published)) = (&args.output, slot.take()) {
            pipeline::write_png(&published, output).await?;
        }
        return Ok(());
    }

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    let (done_tx, done_rx) = oneshot::channel();
    let writer = args.output.clone().map(|output| {
        tokio::spawn(write_published(
            slot.clone(),
            output,
            shutdown_tx.subscribe(),
            done_rx,
        ))
    });

    let result = scheduler.run_forever(shutdown_tx.subscribe()).await;
    done_tx.send(()).ok();

    if let Some(writer) = writer {
        writer.await.ok();
    }
    result?;

    info!(
        has_data = slot.has_data(),
        unread = slot.has_pending(),
        last_cycle = ?slot.last_cycle(),
        last_update = ?slot.last_update(),
        "Overlay worker stopped"
    );

    Ok(())
}
