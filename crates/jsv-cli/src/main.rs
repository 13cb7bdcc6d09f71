//! # jsv CLI Entry Point
//!
//! Parses arguments, installs logging, resolves settings, and dispatches
//! to the handler modules.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use jsv_cli::settings::{Overrides, Settings};
use tracing_subscriber::EnvFilter;

/// Exit status when at least one instance is invalid.
const EXIT_INVALID: u8 = 2;

/// jsv — JSON Schema compiler and evaluator.
///
/// Compiles JSON Schema (drafts 4, 6, 7, 2019-09 and 2020-12) into
/// instruction templates and validates JSON or YAML instances against them.
#[derive(Parser, Debug)]
#[command(name = "jsv", version, about)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Settings file (YAML or JSON). Flags override it; it overrides the
    /// `JSV_*` environment variables.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compile a schema into a template.
    Compile(jsv_cli::compile::CompileArgs),
    /// Validate instances against a schema or template.
    Validate(jsv_cli::validate::ValidateArgs),
    /// Print the reference frame of a schema.
    Frame(jsv_cli::frame::FrameArgs),
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let settings = Settings::load(cli.config.as_deref(), &cli.overrides)?;
    let mut out = io::stdout().lock();

    let status = match &cli.command {
        Commands::Compile(args) => {
            jsv_cli::compile::run(args, &settings, &mut out)?;
            ExitCode::SUCCESS
        }
        Commands::Validate(args) => {
            if jsv_cli::validate::run(args, &settings, &mut out)? {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_INVALID)
            }
        }
        Commands::Frame(args) => {
            jsv_cli::frame::run(args, &mut out)?;
            ExitCode::SUCCESS
        }
    };
    out.flush()?;
    Ok(status)
}
