use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tenor_cli::app::run_pipeline;
use tenor_cli::generate::{generate_inputs, GeneratorSpec};
use tenor_cli::telemetry::init_tracing;
use tenor_config::{load_config, AppConfig};
use tenor_markets::BondCatalog;

#[derive(Parser)]
#[command(author, version, about = "Tenor treasury trading pipeline")]
struct Cli {
    /// Increases logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Explicit configuration file (defaults to ./tenor.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic input files for the benchmark issues
    Generate(GenerateArgs),
    /// Drain the four input files through the pipeline
    Run(RunArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Price ticks per bond
    #[arg(long, default_value_t = 1_000)]
    prices: usize,
    /// Historical trades per bond
    #[arg(long, default_value_t = 10)]
    trades: usize,
    /// Order book updates per bond
    #[arg(long, default_value_t = 1_000)]
    books: usize,
    /// Customer inquiries per bond
    #[arg(long, default_value_t = 10)]
    inquiries: usize,
    /// Generator seed, fixed for reproducible fixtures
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Destination directory (defaults to the configured input dir)
    #[arg(long)]
    input_dir: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    /// Override the configured input directory
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Override the configured output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config: AppConfig =
        load_config(cli.config.as_deref()).context("failed to load configuration")?;

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| match cli.verbose {
        0 => config.log_level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    });
    init_tracing(&filter).context("failed to initialize logging")?;

    match cli.command {
        Commands::Generate(args) => {
            let catalog = match &config.catalog_file {
                Some(path) => BondCatalog::load_from_file(path)?,
                None => BondCatalog::builtin(),
            };
            let input_dir = args.input_dir.unwrap_or_else(|| config.input_dir.clone());
            let spec = GeneratorSpec {
                prices: args.prices,
                trades: args.trades,
                books: args.books,
                inquiries: args.inquiries,
            };
            generate_inputs(&input_dir, &catalog, spec, args.seed)?;
        }
        Commands::Run(args) => {
            if let Some(dir) = args.input_dir {
                config.input_dir = dir;
            }
            if let Some(dir) = args.output_dir {
                config.output_dir = dir;
            }
            run_pipeline(&config)?;
        }
    }

    Ok(())
}
