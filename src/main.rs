use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mail_archive_etl::config::AppConfig;
use mail_archive_etl::logging::init_logging;
use mail_archive_etl::pipeline::{run_pipeline, PipelineOptions, PipelineStatus};
use mail_archive_etl::sample::generate_sample_emails;
use mail_archive_etl::validation::InputValidator;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, link and load every archive file in a directory
    Run {
        /// Directory holding the .eml files
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for CSV files and the SQLite database
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of concurrent parser workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Explicit YAML or JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write sample .eml files for trying the pipeline
    GenerateSamples {
        /// Destination directory
        #[arg(short, long, default_value = "data/input")]
        output: PathBuf,

        /// Number of files
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config_file = match &cli.command {
        Commands::Run { config, .. } => config.clone(),
        Commands::GenerateSamples { .. } => None,
    };
    let config = match &config_file {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    // Initialize logging
    let _guard = init_logging(
        Some(&config.log_level()),
        &config.logging.format,
        config.logging.file_path.as_deref(),
    )?;

    info!("Starting mail-archive-etl");

    match cli.command {
        Commands::Run {
            input,
            output,
            workers,
            ..
        } => run(config, input, output, workers).await?,
        Commands::GenerateSamples { output, count } => {
            let samples = generate_sample_emails(&output, count)
                .with_context(|| format!("Failed to write samples to {}", output.display()))?;
            info!("Wrote {} sample files", samples.len());
        }
    }

    Ok(())
}

async fn run(
    config: AppConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<()> {
    let mut options = PipelineOptions::from_config(&config)?;

    // Command line flags win over configuration
    if let Some(input) = input {
        options.input_dir = input;
    }
    if let Some(output) = output {
        options.output_dir = output;
    }
    if let Some(workers) = workers {
        InputValidator::validate_worker_count(workers)?;
        options.workers = workers;
    }

    let summary = run_pipeline(&options)
        .await
        .with_context(|| format!("Pipeline failed for {}", options.input_dir.display()))?;

    if summary.status == PipelineStatus::NoMessages {
        warn!("Nothing was loaded");
    }
    Ok(())
}
