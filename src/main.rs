use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use movecov::analyze::FileFilter;
use movecov::cli::{cmd_bytecode, cmd_lcov, cmd_source, Style};
use movecov::error::MovecovError;

/// movecov — Analyze Sui Move coverage output and point at untested code.
#[derive(Parser)]
#[command(name = "movecov", version, about)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an lcov.info file from `sui move coverage lcov`.
    Lcov {
        /// Path to the lcov.info file.
        lcov_file: PathBuf,

        /// Directory containing the Move sources, used to quote lines in
        /// suggestions.
        #[arg(short, long)]
        source_dir: Option<PathBuf>,

        /// Output as JSON.
        #[arg(short, long)]
        json: bool,

        /// Only show files whose path contains this string.
        #[arg(short, long)]
        filter: Option<String>,

        /// Only show files with coverage issues.
        #[arg(short, long)]
        issues_only: bool,
    },

    /// Analyze `sui move coverage bytecode` output piped on stdin.
    Bytecode {
        /// Output as JSON.
        #[arg(short, long)]
        json: bool,
    },

    /// Analyze `sui move coverage source` output piped on stdin.
    Source {
        /// Output as JSON.
        #[arg(short, long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Read all of stdin, refusing to wait on an interactive terminal.
fn read_stdin(command: &str) -> Result<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        let mut usage = format!(
            "Usage: sui move coverage {command} --module <name> 2>&1 | movecov {command}"
        );
        if command == "source" {
            usage.push_str(
                "\n\nTo preserve colors when piping:\n  script -q /dev/null sui move coverage source --module <name> | movecov source",
            );
        }
        return Err(MovecovError::Usage(usage).into());
    }

    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut stdin.lock(), &mut bytes)
        .context("Failed to read coverage output from stdin")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let output = match args.command {
        Commands::Lcov {
            lcov_file,
            source_dir,
            json,
            filter,
            issues_only,
        } => {
            let filter = FileFilter {
                path_contains: filter,
                issues_only,
            };
            cmd_lcov(
                &lcov_file,
                source_dir.as_deref(),
                &filter,
                Style::from_json_flag(json),
            )?
        }
        Commands::Bytecode { json } => {
            let input = read_stdin("bytecode")?;
            cmd_bytecode(&input, Style::from_json_flag(json))?
        }
        Commands::Source { json } => {
            let input = read_stdin("source")?;
            cmd_source(&input, Style::from_json_flag(json))?
        }
    };

    print!("{output}");
    Ok(())
}
