mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use snapforge_lib::{ExecuteConfig, Phase};

use crate::output::{OutputFormat, print_error};

/// snapforge - build independently defined parts into one staged and primed tree
#[derive(Parser)]
#[command(name = "snapforge")]
#[command(author, version, about, long_about = None, disable_version_flag = true)]
struct Cli {
  /// Directory containing snapforge.yaml
  #[arg(short = 'C', long, global = true, default_value = ".")]
  project_dir: PathBuf,

  /// Parallel jobs handed to build tools (0 = cpu count + 1)
  #[arg(short, long, global = true, default_value_t = 0)]
  jobs: usize,

  /// Enable verbose output
  #[arg(short = 'V', long, global = true)]
  verbose: bool,

  /// Print version
  #[arg(long = "version", action = ArgAction::Version)]
  _version: Option<bool>,

  #[command(subcommand)]
  command: Commands,
}

/// Arguments shared by the phase commands.
#[derive(Args)]
struct PhaseArgs {
  /// Parts to process (default: all parts)
  parts: Vec<String>,

  /// Re-run the named parts from this phase on
  #[arg(long, value_name = "PHASE")]
  force_from: Option<Phase>,

  /// Output format
  #[arg(short, long, value_enum, default_value_t)]
  output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch part sources
  Pull(PhaseArgs),

  /// Build parts (pulling them first)
  Build(PhaseArgs),

  /// Merge built parts into stage/
  Stage(PhaseArgs),

  /// Merge staged parts into prime/
  #[command(alias = "snap")]
  Prime(PhaseArgs),

  /// Remove part outputs back to a phase
  Clean {
    /// Parts to clean (default: all parts)
    parts: Vec<String>,

    /// Earliest phase to undo
    #[arg(long, value_name = "PHASE", default_value = "pull")]
    step: Phase,
  },

  /// Show per-part phase status
  Status {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn init_logging(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let config = ExecuteConfig::with_jobs(cli.jobs, cli.verbose);
  let project_dir = dunce::canonicalize(&cli.project_dir).unwrap_or(cli.project_dir);
  let dir = project_dir.as_path();
  debug!(project_dir = %dir.display(), jobs = config.jobs, "resolved execution config");

  match cli.command {
    Commands::Pull(args) => cmd::cmd_phase(dir, Phase::Pull, &args.parts, args.force_from, args.output, config),
    Commands::Build(args) => cmd::cmd_phase(dir, Phase::Build, &args.parts, args.force_from, args.output, config),
    Commands::Stage(args) => cmd::cmd_phase(dir, Phase::Stage, &args.parts, args.force_from, args.output, config),
    Commands::Prime(args) => cmd::cmd_phase(dir, Phase::Prime, &args.parts, args.force_from, args.output, config),
    Commands::Clean { parts, step } => cmd::cmd_clean(dir, &parts, step, config),
    Commands::Status { output } => cmd::cmd_status(dir, output, config),
  }
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  if let Err(err) = run(cli) {
    print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}
