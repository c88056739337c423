use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use ruuvitag_ingest::bluetooth::{open_adapter, watch_advertisements, AdvertisementTracker};
use ruuvitag_ingest::config::SensorConfig;
use ruuvitag_ingest::database::{ensure_schema, PostgresSink};
use ruuvitag_ingest::pipeline::forward;
use ruuvitag_ingest::registry::SensorRegistry;
use ruuvitag_ingest::utils::{duration_to_seconds, format_datetime};

const ADVERTISEMENT_QUEUE: usize = 256;
const RESTART_DELAY_SECS: u64 = 5;

/// Forward RuuviTag readings from Bluetooth LE advertisements to PostgreSQL.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; environment variables are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

async fn main_loop(
    adapter: bluer::Adapter,
    registry: Arc<SensorRegistry>,
    sink: Arc<PostgresSink>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Listening for {} RuuviTag sensors", registry.len());
    let mut tracker = AdvertisementTracker::new();

    loop {
        let start_time = OffsetDateTime::now_utc();
        info!("Starting discovery at: {}", format_datetime(&start_time));

        let (tx, mut rx) = mpsc::channel(ADVERTISEMENT_QUEUE);
        let forwarding = async {
            while let Some(advertisement) = rx.recv().await {
                let registry = Arc::clone(&registry);
                let sink = Arc::clone(&sink);
                // Writes retry on their own; scanning does not wait for them
                tokio::spawn(async move {
                    if let Err(e) = forward(&advertisement, &registry, sink.as_ref()).await {
                        error!("Failed to store reading: {}", e);
                    }
                });
            }
        };

        let watching = watch_advertisements(&adapter, &mut tracker, tx);
        let (result, ()) = tokio::join!(watching, forwarding);
        let elapsed = duration_to_seconds(OffsetDateTime::now_utc() - start_time);
        match result {
            Ok(()) => warn!("Discovery stopped after {} seconds", elapsed),
            Err(e) => error!("Discovery failed after {} seconds: {}", elapsed, e),
        }

        sleep(Duration::from_secs(RESTART_DELAY_SECS)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match SensorConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = ensure_schema(&config.database_url).await {
        warn!("Could not verify sensor_readings table: {}", e);
    }

    let adapter = open_adapter(config.adapter.as_deref()).await?;
    let registry = Arc::new(config.registry());
    let sink = Arc::new(PostgresSink::new(
        config.database_url.clone(),
        config.measurement.clone(),
    ));

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = tx.send(());
    });

    // Run main loop or wait for shutdown signal
    tokio::select! {
        result = main_loop(adapter, registry, sink) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
