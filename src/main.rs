// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Pitwall - Spatial Awareness Engine for Racing Telemetry
//!
//! Replays recorded telemetry (one JSON snapshot per line) through the
//! engine and writes every overlap and three-wide event as a JSON line.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pitwall::{Config, Engine, TelemetrySnapshot, VERSION};

/// Pitwall - Spatial Awareness Engine for Racing Telemetry
#[derive(Parser, Debug)]
#[command(name = "pitwall")]
#[command(version = VERSION)]
#[command(about = "Overlap and three-wide detection over multi-car racing telemetry")]
struct Args {
    /// Telemetry file, one JSON snapshot per line ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Override spatial hash bucket size in meters
    #[arg(long)]
    bucket_size: Option<f64>,

    /// Override overlap range in meters
    #[arg(long)]
    overlap_range: Option<f64>,

    /// Log engine statistics when the input ends
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for events
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Pitwall v{}", VERSION);

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;
    info!("Configuration loaded from {:?}", config_path);

    // Override with command line args
    if let Some(bucket_size) = args.bucket_size {
        config.world.bucket_size_meters = bucket_size;
    }
    if let Some(range) = args.overlap_range {
        config.overlap.overlap_range_meters = range;
    }

    let mut engine = Engine::new(config)?;

    let reader: Box<dyn BufRead> = if args.input.as_os_str() == "-" {
        info!("Reading telemetry from stdin");
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&args.input)
            .with_context(|| format!("opening {:?}", args.input))?;
        info!("Replaying telemetry from {:?}", args.input);
        Box::new(BufReader::new(file))
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let telemetry = match TelemetrySnapshot::from_json(&line) {
            Ok(t) => t,
            Err(e) => {
                warn!("Line {}: skipping malformed telemetry: {}", line_no + 1, e);
                continue;
            }
        };

        let report = engine.process(&telemetry);
        for event in &report.events {
            writeln!(out, "{}", event.to_json()?)?;
        }
        debug!(
            "Line {}: {} cars, {} events",
            line_no + 1,
            report.cars_tracked,
            report.events.len()
        );
    }
    out.flush()?;

    if args.summary {
        let stats = engine.stats();
        info!(
            "Processed {} ticks: {} overlap events, {} three-wide events, {} cars rejected, {} snapshots held",
            stats.ticks_processed,
            stats.overlap_events,
            stats.three_wide_events,
            stats.cars_rejected,
            stats.snapshots_stored
        );
    }

    Ok(())
}
