//! Implementation of the `lzs variants` command.

use std::path::PathBuf;

use miette::IntoDiagnostic;
use serde::Serialize;

use super::{context_from, load_tree, parse_key_val};
use crate::output::table::format_variant_table;

/// Arguments for the variants command.
#[derive(Debug, clap::Args)]
pub struct VariantsArgs {
    /// JSON document to inspect
    pub file: PathBuf,

    /// Context entries in dimension=value format (repeatable)
    #[arg(short = 'c', long = "ctx", value_parser = parse_key_val)]
    pub context: Vec<(String, String)>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CandidateJson {
    key: String,
    score: u32,
    extras: usize,
}

/// JSON output format for one variant group.
#[derive(Debug, Serialize)]
struct GroupJson {
    path: String,
    winner: Option<String>,
    candidates: Vec<CandidateJson>,
}

/// Run the variants command.
pub fn run_variants(args: VariantsArgs) -> miette::Result<i32> {
    let tree = load_tree(&args.file)?;
    let groups = tree.variant_groups(&context_from(&args.context));

    if args.json {
        let json_data: Vec<GroupJson> = groups
            .iter()
            .map(|group| GroupJson {
                path: group.path.to_string(),
                winner: group.winner.clone(),
                candidates: group
                    .candidates
                    .iter()
                    .map(|c| CandidateJson {
                        key: c.key.clone(),
                        score: c.score,
                        extras: c.extras,
                    })
                    .collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_data).into_diagnostic()?);
    } else if groups.is_empty() {
        println!("No variant keys in {}", args.file.display());
    } else {
        println!("{}", format_variant_table(&groups));
    }

    Ok(exitcode::OK)
}
