//! ZoomDB CLI - Command Line Interface
//!
//! Drives a ZoomDB instance from the terminal: a live demo that streams
//! synthetic signals through the ingest worker while a tailing view follows
//! them, and a benchmark of bulk ingestion and level-of-detail queries.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use clap::{Parser, Subcommand};
use rand::Rng;
use std::f64::consts::PI;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};
use zoomdb_common::{DatabaseConfig, Result, TreeConfig, ZoomConfig, ZoomError};
use zoomdb_streaming::{
    ingest_queue, IngestSender, IngestWorker, SampleFrame, SharedDatabase, TailingView,
};
use zoomdb_timeseries::{Query, RangeQueryResult, Sample, SeriesDatabase, TimeSpan};

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Parser)]
#[command(name = "zoomdb")]
#[command(author = "AutomataNexus Development Team")]
#[command(version = "0.1.0")]
#[command(about = "ZoomDB level-of-detail time series database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream synthetic signals and tail them live
    Demo {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Channels to generate
        #[arg(long, value_delimiter = ',', default_value = "Trace1,Trace2")]
        channels: Vec<String>,
        /// How long to stream, in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        /// Sample interval in seconds
        #[arg(long, default_value_t = 1e-4)]
        dt: f64,
        /// Samples per frame
        #[arg(long, default_value_t = 2000)]
        frame_size: usize,
    },
    /// Measure ingestion and query speed
    Bench {
        /// Number of samples to ingest
        #[arg(long, default_value_t = 1_000_000)]
        samples: usize,
        /// Tree fan-out
        #[arg(long, default_value_t = zoomdb_common::DEFAULT_FAN_OUT)]
        fan_out: usize,
        /// Point budget for range queries
        #[arg(long, default_value_t = 1000)]
        budget: usize,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Demo {
            config,
            channels,
            seconds,
            dt,
            frame_size,
        } => run_demo(config, channels, seconds, dt, frame_size).await,
        Commands::Bench {
            samples,
            fan_out,
            budget,
        } => run_bench(samples, fan_out, budget),
    };

    if let Err(err) = outcome {
        error!(error = %err, "Command failed");
        std::process::exit(1);
    }
}

// =============================================================================
// Demo
// =============================================================================

async fn run_demo(
    config_path: Option<PathBuf>,
    channels: Vec<String>,
    seconds: f64,
    dt: f64,
    frame_size: usize,
) -> Result<()> {
    let config = match config_path {
        Some(path) => ZoomConfig::from_file(path)?,
        None => ZoomConfig::default(),
    };
    if !(dt.is_finite() && dt > 0.0) {
        return Err(ZoomError::Configuration(format!(
            "sample interval must be a positive number of seconds, got {}",
            dt
        )));
    }

    let db = SharedDatabase::with_change_buffer(
        SeriesDatabase::with_config(config.database.clone())?,
        config.ingest.change_buffer,
    );
    let (tx, rx) = ingest_queue(&config.ingest);
    let (worker, shutdown) = IngestWorker::new(db.clone(), rx, &config.ingest);
    let worker = worker.spawn();

    let frames = ((seconds / (dt * frame_size.max(1) as f64)).ceil() as usize).max(1);
    info!(channels = channels.len(), frames, "Starting signal generators");
    let producers: Vec<_> = channels
        .iter()
        .cloned()
        .map(|name| tokio::spawn(generate(tx.clone(), name, frames, frame_size, dt)))
        .collect();
    drop(tx);

    let view = TailingView::from_config(channels.clone(), &config.viewer)?;
    let mut refresh = tokio::time::interval(Duration::from_millis(
        config.viewer.refresh_interval_ms.max(1),
    ));
    let mut changes = db.subscribe();
    let started = Instant::now();

    while producers.iter().any(|p| !p.is_finished()) {
        refresh.tick().await;
        // Skip a redraw when nothing arrived.
        if changes.try_recv().is_err() {
            continue;
        }
        while changes.try_recv().is_ok() {}

        if let Some(frame) = view.refresh(&db)? {
            for (name, result) in &frame.results {
                let kind = if result.is_raw() { "raw" } else { "summary" };
                info!(
                    channel = %name,
                    window = %frame.window,
                    kind,
                    points = result.len(),
                    "{}",
                    describe(result)
                );
            }
        }
    }

    for producer in producers {
        match producer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(error = %err, "Generator stopped early"),
            Err(err) => error!(error = %err, "Generator task failed"),
        }
    }
    shutdown.shutdown();
    match worker.await {
        Ok(stats) => info!(
            messages = stats.messages,
            samples = stats.samples_applied,
            rejected = stats.batches_rejected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Demo finished"
        ),
        Err(err) => error!(error = %err, "Ingest worker failed"),
    }

    for name in &channels {
        let summary = db.query_summary(name, None)?;
        println!(
            "{:<12} {:>10} samples  min {:>9.3}  max {:>9.3}  mean {:>9.3}",
            name, summary.count, summary.min, summary.max, summary.mean
        );
    }
    Ok(())
}

/// Two sines plus noise, sent one frame at a time in real time.
async fn generate(
    tx: IngestSender,
    name: String,
    frames: usize,
    frame_size: usize,
    dt: f64,
) -> Result<()> {
    const AMPLITUDE: f64 = 10.0;
    const FREQUENCY: f64 = 1.3;
    const OFFSET: f64 = 5.0;
    const RIPPLE_AMPLITUDE: f64 = 1.2;
    const RIPPLE_FREQUENCY: f64 = 100.0;

    let frame_duration = Duration::from_secs_f64(dt * frame_size as f64);
    for index in 0..frames {
        let t0 = (index * frame_size) as f64 * dt;
        let values: Vec<f64> = {
            let mut rng = rand::thread_rng();
            (0..frame_size)
                .map(|i| {
                    let t = t0 + i as f64 * dt;
                    AMPLITUDE * (2.0 * PI * FREQUENCY * t).sin()
                        + OFFSET
                        + RIPPLE_AMPLITUDE * (2.0 * PI * RIPPLE_FREQUENCY * t).sin()
                        + rng.gen_range(-0.5..0.5)
                })
                .collect()
        };
        tx.send_frame(SampleFrame::new(name.clone(), t0, dt, values)).await?;
        tokio::time::sleep(frame_duration).await;
    }
    Ok(())
}

fn describe(result: &RangeQueryResult) -> String {
    let aggregation = result.aggregation();
    if aggregation.is_empty() {
        return "no data".to_string();
    }
    format!(
        "min {:.3} max {:.3} mean {:.3}",
        aggregation.min, aggregation.max, aggregation.mean
    )
}

// =============================================================================
// Benchmark
// =============================================================================

fn run_bench(samples: usize, fan_out: usize, budget: usize) -> Result<()> {
    let mut db = SeriesDatabase::with_config(DatabaseConfig {
        tree: TreeConfig { fan_out },
        ..Default::default()
    })?;

    let mut rng = rand::thread_rng();
    let data: Vec<Sample> = (0..samples)
        .map(|i| Sample::new(i as f64 * 1e-3, rng.gen_range(-1.0..1.0)))
        .collect();

    let started = Instant::now();
    for chunk in data.chunks(2000) {
        db.add_samples("bench", chunk)?;
    }
    let ingest = started.elapsed();
    println!(
        "ingest   {:>10} samples in {:>8.2?} ({:.1} M samples/s)",
        samples,
        ingest,
        samples as f64 / ingest.as_secs_f64().max(1e-9) / 1e6
    );

    let Some(last) = db.last_timestamp("bench") else {
        println!("no samples ingested");
        return Ok(());
    };

    let whole = TimeSpan::new(0.0, last)?;
    let middle = whole.middle();
    let zoomed = TimeSpan::new(middle, middle + whole.duration() / 1000.0)?;

    for (label, span) in [("whole", whole), ("zoomed", zoomed)] {
        let result = db.query("bench", Query::new(span, budget))?;
        println!(
            "query    {:<8} {:>6} {} in {} us",
            label,
            result.len(),
            if result.inner.is_raw() { "samples" } else { "summaries" },
            result.query_time_us
        );
    }

    let started = Instant::now();
    let metrics = db.query_metrics("bench", &zoomed)?;
    println!(
        "metrics  {:>10} samples in {:>8.2?} (mean {:.4})",
        metrics.count,
        started.elapsed(),
        metrics.mean
    );
    Ok(())
}
