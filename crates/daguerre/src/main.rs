//! Daguerre CLI binary.
//!
//! This binary provides command-line access to Daguerre's operations:
//! - Ingest a file and print its identifier
//! - Read an asset back, optionally transformed
//! - Print runtime statistics

use clap::Parser;
use daguerre::{
    AssetService, DaguerreConfig, ObservabilityConfig, StatsReporter, build_storage,
    init_observability_with_config,
};
use std::sync::Arc;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, ingest_file, print_stats, read_to_file};

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = DaguerreConfig::load_with(cli.config.as_deref())?;

    // Initialize tracing
    let mut observability = ObservabilityConfig::from(config.logging());
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability_with_config(observability)?;

    let storage = build_storage(config.storage())?;
    let service = AssetService::with_raster_engine(config.service_config(), storage);

    // Execute the requested command
    match cli.command {
        Commands::Ingest { file } => {
            ingest_file(&service, &file).await?;
        }

        Commands::Read {
            id,
            transform,
            output,
        } => {
            read_to_file(&service, &id, &transform, &output).await?;
        }

        Commands::Stats => {
            print_stats(&StatsReporter::new(Arc::clone(service.engine())))?;
        }
    }

    Ok(())
}
