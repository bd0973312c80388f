// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! ticktrace-feed - Populate a telemetry board with synthetic values.
//!
//! Development stand-in for the robot runtime: creates the shared
//! memory segment, registers the channel set, and publishes slowly
//! drifting sine values until Ctrl+C, then unlinks the segment.
//!
//! Usage:
//!   ticktrace-feed --segment /ticktrace
//!   ticktrace-feed --segment /ticktrace --sensor-list sensors.txt --rate-hz 200

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use ticktrace::registry::{default_sensor_keys, parse_sensor_keys};
use ticktrace::TelemetryBoard;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ticktrace-feed")]
#[command(about = "Populate a telemetry board with synthetic values")]
#[command(version)]
struct Args {
    /// Telemetry board segment name
    #[arg(long, default_value = "/ticktrace")]
    segment: String,

    /// Channel list file (defaults to the stock sensor set)
    #[arg(short, long)]
    sensor_list: Option<PathBuf>,

    /// Publish rate in Hz
    #[arg(long, default_value = "100")]
    rate_hz: u32,

    /// Sine amplitude
    #[arg(long, default_value = "1.0")]
    amplitude: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    let keys = match &args.sensor_list {
        Some(path) => parse_sensor_keys(&std::fs::read_to_string(path)?),
        None => default_sensor_keys(),
    };
    anyhow::ensure!(!keys.is_empty(), "channel list is empty");
    anyhow::ensure!(args.rate_hz > 0, "--rate-hz must be positive");

    let board = TelemetryBoard::create(&args.segment, keys.len())?;
    for key in &keys {
        board.register(key)?;
    }
    info!(
        "Feeding {} channels on {} at {} Hz",
        keys.len(),
        args.segment,
        args.rate_hz
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let period = Duration::from_secs_f64(1.0 / f64::from(args.rate_hz));
    let start = Instant::now();
    let mut updates: Vec<(usize, f64)> = (0..keys.len()).map(|ix| (ix, 0.0)).collect();

    while running.load(Ordering::SeqCst) {
        let t = start.elapsed().as_secs_f64();
        for (ix, value) in &mut updates {
            // Phase-shift each channel so columns are distinguishable.
            *value = args.amplitude * (t + *ix as f64 * 0.1).sin();
        }
        board.publish(&updates);
        std::thread::sleep(period);
    }

    info!("Stopping, unlinking {}", args.segment);
    drop(board);
    TelemetryBoard::unlink(&args.segment)?;
    Ok(())
}
