//! Transit points - QR code trip tracker
//!
//! Riders scan a station QR code when boarding and again when alighting;
//! each completed trip earns points for the distance travelled.
//!
//! Module structure:
//! - `domain/` - Core types (Station, TripRecord, geo distance)
//! - `io/` - External interfaces (camera, trip log, CSV export)
//! - `services/` - Business logic (capture loop, trip session, session)
//! - `infra/` - Infrastructure (Config, Metrics, Clock)

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use transit_points::domain::trip::format_epoch_ms;
use transit_points::domain::UserId;
use transit_points::infra::{Config, Metrics, SystemClock};
use transit_points::io::{
    export::export_history_csv, shared_camera, JsonlTripLog, ReplayCamera, SharedTripStore,
    TextFrameDecoder, TripStore,
};
use transit_points::services::{CaptureUpdate, ScanResult, Session, SessionError};

/// Transit points - scan station QR codes, earn points per trip
#[derive(Parser, Debug)]
#[command(name = "transit-points", version, about)]
struct Args {
    /// Path to TOML configuration file [default: $CONFIG_FILE, then config/dev.toml]
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// User the session belongs to
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan station codes from the camera and record trips
    Scan {
        /// Camera device, overrides the config file
        #[arg(short, long)]
        device: Option<String>,

        /// Stop after this many completed trips
        #[arg(long)]
        trips: Option<u32>,
    },

    /// Show the user's trip history and total points
    History,

    /// Export the user's trip history as CSV
    Export {
        /// Output file
        #[arg(short, long, default_value = "trip_history.csv")]
        output: PathBuf,
    },

    /// List known stations
    Stations,
}

fn require_user(user: Option<&str>) -> anyhow::Result<UserId> {
    match user {
        Some(name) if !name.trim().is_empty() => Ok(UserId::new(name)),
        _ => bail!("--user is required for this command"),
    }
}

/// `--trips` counts every completed trip, saved or not
fn trip_limit_reached(completed: u32, max_trips: Option<u32>) -> bool {
    max_trips.is_some_and(|max| completed >= max)
}

fn open_store(config: &Config) -> anyhow::Result<SharedTripStore> {
    let store = TripStore::open(Box::new(JsonlTripLog::new(config.store_file())))
        .with_context(|| format!("Failed to open trip log {}", config.store_file()))?;
    Ok(store.into_shared())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();

    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "transit-points starting");

    let config = Config::load(args.config.as_deref());
    info!(
        config_file = %config.config_file(),
        camera_device = %config.camera_device(),
        cooldown_secs = %config.cooldown().as_secs(),
        poll_interval_ms = %config.poll_interval().as_millis(),
        store_file = %config.store_file(),
        "config_loaded"
    );

    match args.command {
        Command::Scan { device, trips } => {
            let user = require_user(args.user.as_deref())?;
            let config = match device {
                Some(device) => config.with_camera_device(&device),
                None => config,
            };
            run_scan(user, &config, trips).await
        }
        Command::History => {
            let user = require_user(args.user.as_deref())?;
            let store = open_store(&config)?;
            let store = store.lock();
            let trips = store.list_for(&user);
            if trips.is_empty() {
                println!("No trips recorded for {}", user);
                return Ok(());
            }
            println!(
                "{:<22} {:<22} {:<20} {:<20} {:>10} {:>7}",
                "Start Location", "End Location", "Start Time", "End Time", "Distance", "Points"
            );
            for trip in &trips {
                println!(
                    "{:<22} {:<22} {:<20} {:<20} {:>7.2} km {:>7}",
                    trip.start_station,
                    trip.end_station,
                    format_epoch_ms(trip.start_time),
                    format_epoch_ms(trip.end_time),
                    trip.distance_km,
                    trip.points_earned
                );
            }
            println!("Total points: {}", store.total_points_for(&user));
            Ok(())
        }
        Command::Export { output } => {
            let user = require_user(args.user.as_deref())?;
            let store = open_store(&config)?;
            let store = store.lock();
            let trips = store.list_for(&user);
            export_history_csv(&output, &trips)
                .with_context(|| format!("Failed to export history to {}", output.display()))?;
            println!("Exported {} trips to {}", trips.len(), output.display());
            Ok(())
        }
        Command::Stations => {
            for station in config.station_registry().iter() {
                println!("{:<22} {:>9.4} {:>9.4}", station.id, station.coord.lat, station.coord.lon);
            }
            Ok(())
        }
    }
}

async fn run_scan(user: UserId, config: &Config, max_trips: Option<u32>) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let metrics = Arc::new(Metrics::new());

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let camera = shared_camera(ReplayCamera::from_file(config.camera_device()));
    let mut session = Session::login(
        user,
        config,
        camera,
        Arc::new(TextFrameDecoder),
        Arc::new(SystemClock),
        store,
        metrics.clone(),
    );

    let mut last_status = String::new();
    let mut print_status = |update: CaptureUpdate<'_>| {
        let line = update.status_line();
        if line != last_status {
            println!("{}", line);
            last_status = line;
        }
    };

    let mut completed = 0u32;
    let result = loop {
        match session.state().start_station() {
            None => println!("Scan the QR code at your starting station"),
            Some(start) => println!("Trip started at {}. Scan the QR code at your destination", start.id),
        }

        match session.scan(&mut print_status, shutdown_rx.clone()).await {
            Ok(ScanResult::Cancelled) => break Ok(()),
            Ok(outcome) => {
                println!("{}", outcome.summary());
                if let ScanResult::Completed(_) = outcome {
                    completed += 1;
                    println!("Total points: {}", session.total_points());
                }
            }
            Err(SessionError::Store(e)) => {
                // Trip is kept for this run even though it was not saved
                eprintln!("Warning: trip not saved: {}", e);
                completed += 1;
            }
            Err(SessionError::Trip(e)) => {
                eprintln!("{}", e);
            }
            Err(SessionError::Device(e)) => {
                error!(error = %e, "scan_stopped");
                break Err(anyhow::Error::new(e).context("Camera stopped"));
            }
        }

        if trip_limit_reached(completed, max_trips) {
            break Ok(());
        }
    };

    metrics.report().log();
    session.logout();
    info!("transit-points shutdown complete");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_limit() {
        assert!(!trip_limit_reached(5, None));
        assert!(!trip_limit_reached(0, Some(1)));
        assert!(trip_limit_reached(1, Some(1)));
        assert!(trip_limit_reached(2, Some(1)));
    }

    #[test]
    fn test_config_flag_is_optional() {
        let args = Args::try_parse_from(["transit-points", "stations"]).unwrap();
        assert_eq!(args.config, None);

        let args = Args::try_parse_from(["transit-points", "--config", "a.toml", "stations"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("a.toml"));
    }
}
