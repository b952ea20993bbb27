//! Implementation of the `lzs check` command.

use std::path::PathBuf;

use futures::executor::block_on;
use lazyschema::GetOptions;
use miette::IntoDiagnostic;
use owo_colors::OwoColorize;
use serde::Serialize;

use super::{context_from, load_tree, parse_key_val};
use crate::output::table::{format_failure_table, Failure};

/// Arguments for the check command.
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// JSON document to check
    pub file: PathBuf,

    /// Context entries in dimension=value format (repeatable)
    #[arg(short = 'c', long = "ctx", value_parser = parse_key_val)]
    pub context: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for check results.
#[derive(Debug, Serialize)]
struct CheckJson<'a> {
    evaluated: usize,
    failures: &'a [Failure],
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> miette::Result<i32> {
    let tree = load_tree(&args.file)?;
    let context = context_from(&args.context);
    let paths = tree.expression_paths();

    let mut failures = Vec::new();
    for path in &paths {
        let options = GetOptions::builder().context(context.clone()).build();
        if let Err(e) = block_on(tree.get_with(&path.to_string(), options)) {
            failures.push(Failure {
                path: path.to_string(),
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
        }
    }

    if args.json {
        let output = CheckJson {
            evaluated: paths.len(),
            failures: &failures,
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else if failures.is_empty() {
        println!(
            "{} {} expressions evaluated in {}",
            "ok:".green(),
            paths.len(),
            args.file.display()
        );
    } else {
        println!("{}", format_failure_table(&failures));
        println!(
            "\n{} {} of {} expressions failed",
            "error:".red(),
            failures.len(),
            paths.len()
        );
    }

    if failures.is_empty() {
        Ok(exitcode::OK)
    } else {
        Ok(exitcode::DATAERR)
    }
}
