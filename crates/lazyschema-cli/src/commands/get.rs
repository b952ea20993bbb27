//! Implementation of the `lzs get` command.

use std::path::PathBuf;

use futures::executor::block_on;
use lazyschema::{GetOptions, ValueExt};
use miette::IntoDiagnostic;
use owo_colors::OwoColorize;
use serde_json::{json, Value};

use super::{context_from, load_tree, parse_key_val};

/// Arguments for the get command.
#[derive(Debug, clap::Args)]
pub struct GetArgs {
    /// JSON document to read
    pub file: PathBuf,

    /// Path to evaluate (e.g. user.greet); the whole document if omitted
    #[arg(default_value = "")]
    pub path: String,

    /// Context entries in dimension=value format (repeatable)
    #[arg(short = 'c', long = "ctx", value_parser = parse_key_val)]
    pub context: Vec<(String, String)>,

    /// Bypass cached results
    #[arg(long)]
    pub fresh: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the get command.
pub fn run_get(args: GetArgs) -> miette::Result<i32> {
    let tree = load_tree(&args.file)?;
    let options = GetOptions::builder()
        .fresh(args.fresh)
        .context(context_from(&args.context))
        .build();

    match block_on(tree.get_with(&args.path, options)) {
        Ok(Some(value)) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
            } else if let Value::String(text) = &value {
                println!("{}", text);
            } else {
                println!("{}", value.render());
            }
            Ok(exitcode::OK)
        }
        Ok(None) => {
            if args.json {
                println!("null");
            } else {
                eprintln!("{} nothing at '{}'", "warning:".yellow(), args.path);
            }
            Ok(exitcode::DATAERR)
        }
        Err(e) => {
            if args.json {
                let output = json!({
                    "error": e.to_string(),
                    "kind": e.kind().to_string(),
                });
                eprintln!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
            } else {
                eprintln!("{} {}", "error:".red(), e);
            }
            Ok(exitcode::DATAERR)
        }
    }
}
