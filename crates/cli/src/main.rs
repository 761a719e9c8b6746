use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use output::{OutputFormat, print_error};

/// bplan - resolve package-build specs into a dependency-ordered build plan
#[derive(Parser)]
#[command(name = "bplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the specs needed to build a target, in build order
  Order {
    /// File holding one or more YAML spec documents
    file: PathBuf,

    /// Name of the spec to build
    target: String,

    /// Build argument applied to every spec before ordering (repeatable)
    #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    args: Vec<(String, String)>,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Load and validate every spec in a file
  Validate {
    /// File holding one or more YAML spec documents
    file: PathBuf,
  },

  /// Print every spec in build order with its in-batch dependencies
  Graph {
    /// File holding one or more YAML spec documents
    file: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
  },
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
  let Some((key, value)) = s.split_once('=') else {
    bail!("expected KEY=VALUE, got {s:?}");
  };
  if key.is_empty() {
    bail!("empty key in {s:?}");
  }
  Ok((key.to_string(), value.to_string()))
}

fn init_logging(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let result = match cli.command {
    Commands::Order {
      file,
      target,
      args,
      format,
    } => cmd::cmd_order(&file, &target, &args, format),
    Commands::Validate { file } => cmd::cmd_validate(&file),
    Commands::Graph { file, format } => cmd::cmd_graph(&file, format),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
