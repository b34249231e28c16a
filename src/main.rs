//! imgbatch - batch file inspection driven by the bounded-concurrency engine
//!
//! Queues the given files, runs them through the controller and prints
//! per-item progress from the event stream.

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use imgbatch::utils::logging::init_tracing;
use imgbatch::{BatchController, BatchEvent, BatchOutcome, Config, FileInspector, Priority};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "imgbatch", version, about = "Process files with bounded concurrency")]
struct Args {
    /// YAML configuration file (defaults to IMGBATCH_* environment variables)
    #[arg(short, long, env = "IMGBATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Simultaneous files in flight, clamped to 1..=6
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Automatic retries per file
    #[arg(long)]
    max_retries: Option<u32>,

    /// Priority for every queued file (high, normal, low)
    #[arg(short, long)]
    priority: Option<Priority>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Print final stats as JSON
    #[arg(long)]
    json: bool,

    /// Files to process
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Args {
    /// Per-item lines would corrupt the JSON document on stdout
    fn prints_progress(&self) -> bool {
        !self.json
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::from_env()?,
    };
    if let Some(concurrency) = args.concurrency {
        config.batch.concurrency = concurrency;
    }
    if let Some(max_retries) = args.max_retries {
        config.batch.max_retries = max_retries;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.batch.item_timeout_ms = Some(timeout_ms);
    }
    config.validate()?;
    init_tracing(&config.logging)?;

    let controller = BatchController::new(config.batch.clone());
    let printer = args
        .prints_progress()
        .then(|| tokio::spawn(print_events(controller.clone(), controller.subscribe())));

    let ids = args
        .files
        .iter()
        .map(|path| path.to_string_lossy().into_owned());
    let queued = controller.add_to_queue(ids, args.priority);
    info!(
        queued,
        concurrency = controller.concurrency(),
        "Starting batch"
    );

    let handle = controller.start(FileInspector::new());
    let interrupted = handle.clone();
    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, waiting for in-flight files");
            controller.pause();
            interrupted.wait().await
        }
    };

    if let Some(printer) = printer {
        if outcome == BatchOutcome::Drained {
            printer.await.context("Event printer task failed")?;
        } else {
            printer.abort();
        }
    }

    let stats = controller.get_stats();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "{} completed, {} failed, {} remaining of {} ({:.0}%)",
            stats.completed,
            stats.failed,
            stats.remaining(),
            stats.total,
            stats.progress
        );
        for id in controller.snapshot().failed {
            if let Some(item) = controller.get_item(&id) {
                let reason = item.last_error.unwrap_or_default();
                println!("  failed: {} ({})", id, reason);
            }
        }
    }

    if outcome == BatchOutcome::Drained && stats.failed == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn print_events(controller: BatchController, mut events: Receiver<BatchEvent>) {
    loop {
        match events.recv().await {
            Ok(BatchEvent::ItemCompleted { item_id }) => {
                let stats = controller.get_stats();
                println!("[{:>3.0}%] done     {}", stats.progress, item_id);
            }
            Ok(BatchEvent::ItemRetrying {
                item_id,
                retry_count,
                error,
            }) => {
                println!("[ retry {}] {}: {}", retry_count, item_id, error);
            }
            Ok(BatchEvent::ItemFailed { item_id, error }) => {
                println!("[failed] {}: {}", item_id, error);
            }
            Ok(BatchEvent::BatchDrained { .. }) | Ok(BatchEvent::BatchCleared) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
