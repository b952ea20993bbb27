//! lazyschema CLI entry point.
//!
//! Provides command-line tools for working with expression documents:
//! - `lzs get` - Evaluate one path of a document
//! - `lzs check` - Evaluate every expression and report failures
//! - `lzs variants` - Show which variant wins for a context

mod commands;
mod output;

use std::io::stderr;
use std::process::exit;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{run_check, run_get, run_variants, CheckArgs, GetArgs, VariantsArgs};
use tracing_subscriber::{fmt, EnvFilter};

/// Lazy expression document tools.
#[derive(Debug, Parser)]
#[command(name = "lzs")]
#[command(about = "Lazy expression document tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Color output control
    #[arg(long, value_enum, default_value_t = ColorWhen::Auto, global = true)]
    pub color: ColorWhen,

    /// Log evaluation and cache activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// When to use colored output.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate a path of a JSON document
    Get(GetArgs),
    /// Evaluate every expression key and report failures
    Check(CheckArgs),
    /// List variant groups and the key each one resolves to
    Variants(VariantsArgs),
}

/// Set up color output based on user preference.
fn setup_colors(color_when: ColorWhen) {
    match color_when {
        ColorWhen::Auto => {
            // owo-colors automatically checks TTY, NO_COLOR, FORCE_COLOR
        }
        ColorWhen::Always => {
            owo_colors::set_override(true);
        }
        ColorWhen::Never => {
            owo_colors::set_override(false);
        }
    }
}

/// RUST_LOG wins; otherwise `--verbose` selects debug and the default is warn.
fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(stderr)
        .with_target(false)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    setup_colors(cli.color);
    setup_logging(cli.verbose);

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))?;

    let result = match cli.command {
        Commands::Get(args) => run_get(args),
        Commands::Check(args) => run_check(args),
        Commands::Variants(args) => run_variants(args),
    };

    match result {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("{:?}", e);
            exit(exitcode::SOFTWARE);
        }
    }
}
