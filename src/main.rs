//! chartscope - catalog and build-graph tooling for cdk8s chart repositories
//!
//! Generates Backstage catalog entities from synthesized charts, tracks
//! chart dependencies from TypeScript sources and synthesizes charts in
//! parallel dependency levels.

use anyhow::{Context, Result};
use chartscope::cli::{
    self, ConfigSubcommand, SelectionArgs, display_version, handle_config_command, init_logging,
};
use chartscope::config::ConfigLoader;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Catalog and build-graph tooling for cdk8s chart repositories
#[derive(Parser, Debug)]
#[command(name = "chartscope")]
#[command(about = "Catalog and build-graph tooling for cdk8s chart repositories", long_about = None)]
struct Args {
    /// Write debug logs to a temporary file
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Log progress to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Project configuration file (default: ./chartscope.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze chart sources and persist the dependency graph
    Analyze {
        /// Rebuild even when no source changed
        #[arg(long)]
        force: bool,
        /// Print graph statistics
        #[arg(long)]
        stats: bool,
    },
    /// List charts affected by changes to the given files
    Impact {
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Print the execution plan for the selected charts
    Plan {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Synthesize the selected charts in parallel dependency levels
    Synth {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Print the plan without running anything
        #[arg(long)]
        dry_run: bool,
        /// Maximum groups running at once
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,
    },
    /// Re-synthesize affected charts whenever sources change
    Watch {
        /// Quiet period before rebuilding, in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,
        /// Maximum groups running at once
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,
    },
    /// Generate Backstage catalog entities from synthesized charts
    Catalog {
        /// Manifest directory (`NNNN-<chart>.k8s.yaml` files) or tree document
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Enrich chart components with static analysis of chart sources
        #[arg(long)]
        with_analysis: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = init_logging(args.debug, args.verbose);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    let explicit = args.config.as_deref();
    match args.command {
        Command::Config { subcommand } => handle_config_command(subcommand, explicit),
        Command::Version => {
            display_version();
            Ok(())
        }
        command => run(command, explicit).await,
    }
}

async fn run(command: Command, explicit: Option<&Path>) -> Result<()> {
    let config = ConfigLoader::load(explicit).context("Failed to load configuration")?;
    let root = std::env::current_dir().context("Failed to resolve working directory")?;
    tracing::debug!("Configuration loaded for {}", root.display());

    match command {
        Command::Analyze { force, stats } => cli::pipeline::analyze(&root, &config, force, stats),
        Command::Impact { files } => cli::pipeline::impact(&root, &config, &files),
        Command::Plan { selection } => cli::pipeline::plan(&root, &config, &selection),
        Command::Synth {
            selection,
            dry_run,
            concurrency,
        } => cli::pipeline::synth(&root, &config, &selection, dry_run, concurrency).await,
        Command::Watch {
            debounce_ms,
            concurrency,
        } => cli::pipeline::watch(&root, &config, debounce_ms, concurrency).await,
        Command::Catalog {
            input,
            output,
            with_analysis,
        } => cli::pipeline::catalog(&root, &config, &input, output.as_deref(), with_analysis),
        Command::Config { subcommand } => handle_config_command(subcommand, explicit),
        Command::Version => {
            display_version();
            Ok(())
        }
    }
}
