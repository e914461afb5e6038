mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kiln_lib::consts::DEFAULT_TIMEOUT_SECS;

use crate::cmd::{Repositories, cmd_fetch, cmd_plan, cmd_resolve};
use crate::output::OutputFormat;

/// kiln - dependency resolution and parallel build scheduling
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Resolver configuration file (default: $XDG_CONFIG_HOME/kiln/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Local repository directory, overriding the configuration
  #[arg(long, global = true)]
  repository: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve an artifact and its transitive dependencies
  Resolve {
    /// Artifact descriptor, e.g. org.slf4j:slf4j-api:1.7.36
    descriptor: String,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the leaf groups an artifact's dependencies are built in
  Plan {
    /// Artifact descriptor
    descriptor: String,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Fetch an artifact's dependencies in parallel
  Fetch {
    /// Artifact descriptor
    descriptor: String,

    /// Number of dependencies fetched at once (default: available parallelism)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Longest wait for the next dependency to finish (e.g., "30s", "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let repositories = Repositories {
    config: cli.config,
    local: cli.repository,
  };

  match cli.command {
    Commands::Resolve { descriptor, output } => cmd_resolve(&descriptor, &repositories, output),
    Commands::Plan { descriptor, output } => cmd_plan(&descriptor, &repositories, output),
    Commands::Fetch {
      descriptor,
      jobs,
      timeout,
      output,
    } => {
      let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
      cmd_fetch(&descriptor, &repositories, jobs, timeout, output)
    }
  }
}
