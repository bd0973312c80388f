// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 ticktrace contributors

//! ticktrace-record - Sample telemetry channels to a trace file.
//!
//! Usage:
//!   ticktrace-record --sensor-list sensors.txt --output run.data
//!   ticktrace-record --builtin-list --output run.data --period-ms 10
//!   ticktrace-record --builtin-list --output run.data --duration 60

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use ticktrace::registry::default_sensor_keys;
use ticktrace::{Sampler, SamplerConfig, SensorList, TelemetryBoard, ThreadTicker};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ticktrace-record")]
#[command(about = "Sample telemetry channels to a trace file")]
#[command(version)]
struct Args {
    /// Sensor list file (one channel key per line)
    #[arg(short, long, conflicts_with = "builtin_list")]
    sensor_list: Option<PathBuf>,

    /// Use the stock leg/inertial/battery channel set
    #[arg(long)]
    builtin_list: bool,

    /// Output trace file path
    #[arg(short, long)]
    output: PathBuf,

    /// Telemetry board segment name
    #[arg(long, default_value = "/ticktrace")]
    segment: String,

    /// Tick period in milliseconds
    #[arg(long, default_value = "10")]
    period_ms: u64,

    /// Duration to record (seconds, 0 = until Ctrl+C)
    #[arg(long, default_value = "0")]
    duration: u64,

    /// Skip the metadata sidecar
    #[arg(long)]
    no_meta: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Quiet mode (minimal output)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    let sensor_list = if args.builtin_list {
        SensorList::Inline(default_sensor_keys())
    } else {
        let path = args
            .sensor_list
            .clone()
            .ok_or_else(|| anyhow::anyhow!("either --sensor-list or --builtin-list is required"))?;
        SensorList::File(path)
    };

    let board = TelemetryBoard::open(&args.segment).map_err(|e| {
        anyhow::anyhow!(
            "cannot open telemetry segment {}: {e} (is the robot runtime or ticktrace-feed up?)",
            args.segment
        )
    })?;

    if !args.quiet {
        info!("ticktrace v{}", env!("CARGO_PKG_VERSION"));
        info!("Segment: {} ({} channels)", args.segment, board.count());
        info!("Output:  {}", args.output.display());
        info!("Period:  {} ms", args.period_ms);
    }

    let clock = Arc::new(ThreadTicker::new(Duration::from_millis(args.period_ms)));
    let sampler = Sampler::new(clock, Arc::new(board));

    let config = SamplerConfig::new(sensor_list, &args.output).sidecar(!args.no_meta);
    sampler.start(config)?;

    if !args.quiet {
        info!("Recording started. Press Ctrl+C to stop.");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let start = Instant::now();
    let duration_limit = if args.duration > 0 {
        Some(Duration::from_secs(args.duration))
    } else {
        None
    };
    let mut last_report = Instant::now();

    while running.load(Ordering::SeqCst) {
        if let Some(limit) = duration_limit {
            if start.elapsed() >= limit {
                info!("Duration limit reached");
                break;
            }
        }

        if !args.quiet && last_report.elapsed() >= Duration::from_secs(10) {
            if let Some(stats) = sampler.stats() {
                info!(
                    "Recorded {} records ({} ticks skipped)",
                    stats.records_written, stats.ticks_skipped
                );
            }
            last_report = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(100));
    }

    let stats = sampler.stats().unwrap_or_default();
    sampler.stop();

    if !args.quiet {
        info!("Recording stopped");
        info!("  Records:       {}", stats.records_written);
        info!("  Ticks skipped: {}", stats.ticks_skipped);
        info!("  Write errors:  {}", stats.write_errors);
        info!("  File:          {}", args.output.display());
    }

    Ok(())
}
