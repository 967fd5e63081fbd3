//! Stride simulation binary.
//!
//! Generates a handful of growing partitions, consumes each with its own
//! worker and, optionally, splits a random live worker at a fixed interval
//! so the residual is picked up by a fresh worker:
//!
//! ```bash
//! stride --seed 7 --duration-secs 10 --split-interval-ms 750 --split-fraction 0.5
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::time::Duration;

use clap::Parser;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tokio::time::Interval;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stride_core::SimulationConfig;
use stride_runner::{generate_partitions, PartitionProcessor, ProcessedRecord, Scheduler};

/// Simulated consumption of splittable, growing partitions.
#[derive(Parser, Debug)]
#[command(name = "stride")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of partitions to generate.
    #[arg(long, default_value = "4")]
    partitions: u32,

    /// Seed for partition generation and worker randomness.
    /// A random seed is picked if omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// How long to run before shutting down.
    #[arg(long, default_value = "10")]
    duration_secs: u64,

    /// Pause between two polls of a worker, in milliseconds.
    #[arg(long, default_value = "100")]
    poll_timeout_ms: u64,

    /// Interval between split requests, in milliseconds.
    /// No splits are requested if omitted.
    #[arg(long)]
    split_interval_ms: Option<u64>,

    /// Fraction of the remainder passed to each split request.
    /// Zero checkpoints the worker.
    #[arg(long, default_value = "0.5")]
    split_fraction: f64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = SimulationConfig::new()
        .with_num_partitions(args.partitions)
        .with_poll_timeout(Duration::from_millis(args.poll_timeout_ms));
    config.validate()?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        seed,
        partitions = config.num_partitions,
        duration_secs = args.duration_secs,
        split_interval_ms = ?args.split_interval_ms,
        split_fraction = args.split_fraction,
        "Starting Stride simulation"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (tx, rx) = mpsc::unbounded_channel();
    let mut scheduler = Scheduler::new(PartitionProcessor::new(config), seed, tx);

    for partition in generate_partitions(&config, &mut rng) {
        info!(
            partition = %partition.id(),
            committed = %partition.get_committed_position(),
            last = %partition.last_offset(),
            "Generated partition"
        );
        scheduler.assign(partition);
    }

    let consumer = tokio::spawn(consume(rx));

    let deadline = tokio::time::sleep(Duration::from_secs(args.duration_secs));
    tokio::pin!(deadline);
    let split_period = args
        .split_interval_ms
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis);
    let mut splits = split_period.map(tokio::time::interval);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            () = next_split(&mut splits) => {
                let live = scheduler.live_workers();
                if let Some(&worker) = live.choose(&mut rng) {
                    match scheduler.try_split(worker, args.split_fraction)? {
                        Some(residual) => info!(%worker, %residual, "Residual handed to new worker"),
                        None => info!(%worker, "Split produced no residual worker"),
                    }
                }
            }
        }
    }

    info!(live_workers = scheduler.live_workers().len(), "Shutting down");
    scheduler.shutdown();
    scheduler.join().await;

    // All senders are gone once the scheduler is dropped by `join`.
    let processed = consumer.await?;
    info!(processed, "Simulation finished");
    Ok(())
}

/// Waits for the next split tick, forever if splits are disabled.
async fn next_split(splits: &mut Option<Interval>) {
    match splits {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Logs every processed record until all workers are gone.
async fn consume(mut rx: mpsc::UnboundedReceiver<ProcessedRecord>) -> u64 {
    let mut processed = 0;
    while let Some(record) = rx.recv().await {
        info!(partition = record.partition_id.get(), "{}", record.message);
        processed += 1;
    }
    processed
}
