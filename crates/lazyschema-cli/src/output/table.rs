//! Table formatting utilities for CLI output.

use comfy_table::{presets, ContentArrangement, Table};
use lazyschema::VariantGroup;
use serde::Serialize;

/// One expression that failed to evaluate.
#[derive(Debug, Serialize)]
pub struct Failure {
    /// Concrete path of the expression key.
    pub path: String,
    /// Error category: cycle, depth or evaluation.
    pub kind: String,
    pub message: String,
}

/// Format check failures as an ASCII table.
pub fn format_failure_table(failures: &[Failure]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Path", "Kind", "Error"]);

    for failure in failures {
        table.add_row(vec![
            failure.path.clone(),
            failure.kind.clone(),
            failure.message.clone(),
        ]);
    }

    table
}

/// Format variant groups with their ranked candidates.
pub fn format_variant_table(groups: &[VariantGroup]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Slot", "Candidates", "Resolves To"]);

    for group in groups {
        let candidates = group
            .candidates
            .iter()
            .map(|c| format!("{} ({})", c.key, c.score))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            group.path.to_string(),
            candidates,
            group.winner.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    table
}
