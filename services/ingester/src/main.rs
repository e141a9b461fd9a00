//! Sentinel-1 tile layer ingester.
//!
//! Processes one radar archive into a tile pyramid, writes its metadata
//! descriptor and records it in the shared layer catalog. Also lists and
//! removes catalog entries.

mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use config::{LoggingConfig, PipelineOverrides, ServiceConfig};
use ingestion::{Pipeline, PipelineReport};
use layer_catalog::JsonCatalogStore;
use sar_common::ZoomRange;

#[derive(Parser, Debug)]
#[command(name = "sar-ingester")]
#[command(about = "Turn Sentinel-1 archives into web map tile layers")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "SAR_INGESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Output base directory (layer directories and catalog)
    #[arg(long, global = true)]
    output_base: Option<PathBuf>,

    /// Log level or filter directive (overrides config and RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: json or pretty
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one archive (default)
    Process(ProcessArgs),

    /// List layers in the catalog
    Layers {
        /// Print the catalog document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a layer from the catalog (tiles stay on disk)
    Remove {
        /// Layer id, e.g. sentinel1-2023-03-29
        id: String,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ProcessArgs {
    /// Archive to process
    #[arg(long)]
    input: Option<PathBuf>,

    /// Zoom range, e.g. 10-15
    #[arg(long)]
    zoom: Option<ZoomRange>,

    /// Worker processes for the tiling tool
    #[arg(long)]
    processes: Option<usize>,

    /// Tiling timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Remove the extraction directory after success
    #[arg(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let loaded = config::load_config(args.config.as_deref());

    let mut logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    if let Some(format) = &args.log_format {
        logging.format = format.clone();
    }
    if let Err(e) = logging::init_tracing(&logging, args.log_level.as_deref()) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(output_base) = &args.output_base {
        config.pipeline.output_base_dir = output_base.clone();
    }

    let result = match args.command.unwrap_or(Command::Process(ProcessArgs::default())) {
        Command::Process(process) => return run_process(config, process).await,
        Command::Layers { json } => {
            let store = catalog_store(&config);
            commands::list_layers(&store, json, &mut std::io::stdout()).map(|_| ())
        }
        Command::Remove { id } => {
            let store = catalog_store(&config);
            commands::remove_layer(&store, &id, &mut std::io::stdout()).map(|_| ())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn catalog_store(config: &ServiceConfig) -> JsonCatalogStore {
    JsonCatalogStore::new(config.pipeline.catalog_path())
}

async fn run_process(mut config: ServiceConfig, args: ProcessArgs) -> ExitCode {
    let overrides = PipelineOverrides {
        input: args.input,
        output_base: None,
        zoom: args.zoom,
        processes: args.processes,
        timeout_secs: args.timeout_secs,
        cleanup: args.cleanup,
    };
    overrides.apply(&mut config.pipeline);

    let pipeline = match Pipeline::new(config.pipeline) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "Invalid pipeline configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        input = %pipeline.config().input_archive_path.display(),
        output_base = %pipeline.config().output_base_dir.display(),
        "Starting Sentinel-1 ingestion"
    );

    // Dropping the run future on interruption kills a running tiling tool.
    tokio::select! {
        result = pipeline.run() => match result {
            Ok(report) => {
                log_report(&report);
                ExitCode::SUCCESS
            }
            Err(failure) => {
                error!(stage = %failure.stage, error = %failure.source, "Processing failed");
                ExitCode::FAILURE
            }
        },
        _ = shutdown_signal() => {
            warn!("Interrupted, processing stopped");
            ExitCode::FAILURE
        }
    }
}

fn log_report(report: &PipelineReport) {
    let catalog_action = if report.catalog_replaced { "replaced" } else { "inserted" };
    info!(
        layer_id = %report.layer_id,
        layer_dir = %report.layer_dir.display(),
        tiles_dir = %report.tiles_dir.display(),
        tile_count = report.tile_count,
        metadata = %report.metadata_path.display(),
        catalog = %report.catalog_location,
        catalog_action,
        elapsed_secs = report.elapsed.as_secs_f64(),
        "Layer ready"
    );
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
