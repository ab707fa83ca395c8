//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::catalog::{CatalogEntry, Comparison};
use crate::planner::{Action, FieldDelta};
use crate::report::Outcome;

use super::commands::OutputFormat;

/// Longest value shown in a delta table cell.
const MAX_CELL_LEN: usize = 60;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Field delta row for table display.
#[derive(Tabled)]
struct DeltaRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Current")]
    old: String,
    #[tabled(rename = "Desired")]
    new: String,
}

/// Catalog row for table display.
#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Identity")]
    identity: String,
    #[tabled(rename = "Update")]
    update: String,
    #[tabled(rename = "Compared fields")]
    fields: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a reconciliation outcome for display.
    #[must_use]
    pub fn format_outcome(&self, outcome: &Outcome) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome).unwrap_or_default(),
            OutputFormat::Text => Self::format_outcome_text(outcome),
        }
    }

    fn format_outcome_text(outcome: &Outcome) -> String {
        let mut output = String::new();

        if let Some(err) = &outcome.error {
            let _ = writeln!(
                output,
                "{} {} '{}' failed ({})",
                "✗".red(),
                outcome.kind,
                outcome.display_name,
                err.kind.to_string().red()
            );
            let _ = writeln!(output, "   {}", err.message);
            if let Some(detail) = &err.detail {
                let _ = writeln!(output, "   detail: {detail}");
            }
        } else if outcome.changed {
            let verb = if outcome.dry_run { "would" } else { "did" };
            let _ = writeln!(
                output,
                "{} {} '{}': {verb} {}",
                "~".yellow(),
                outcome.kind,
                outcome.display_name,
                Self::format_action(outcome.action)
            );
        } else {
            let _ = writeln!(
                output,
                "{} {} '{}' is up to date",
                "✓".green(),
                outcome.kind,
                outcome.display_name
            );
        }

        if let Some(id) = &outcome.resource_id {
            let _ = writeln!(output, "   id: {id}");
        }

        if !outcome.diff.is_empty() {
            output.push('\n');
            output.push_str(&Self::format_deltas(&outcome.diff));
            output.push('\n');
        }

        let _ = writeln!(
            output,
            "   {}",
            format!("invocation {}", outcome.invocation_id).dimmed()
        );

        output
    }

    fn format_deltas(deltas: &[FieldDelta]) -> String {
        let rows: Vec<DeltaRow> = deltas
            .iter()
            .map(|d| DeltaRow {
                field: d.field.clone(),
                old: Self::truncate(&d.old.to_json().to_string(), MAX_CELL_LEN),
                new: Self::truncate(&d.new.to_json().to_string(), MAX_CELL_LEN),
            })
            .collect();

        Table::new(rows).to_string()
    }

    /// Formats the resource catalog for display.
    #[must_use]
    pub fn format_kinds(&self, entries: &[CatalogEntry]) -> String {
        match self.format {
            OutputFormat::Json => {
                let kinds: Vec<KindJson> = entries.iter().map(KindJson::from).collect();
                serde_json::to_string_pretty(&kinds).unwrap_or_default()
            }
            OutputFormat::Text => {
                let rows: Vec<KindRow> = entries
                    .iter()
                    .map(|e| KindRow {
                        kind: e.kind.to_string(),
                        path: e.path.to_string(),
                        identity: e.identity_field.to_string(),
                        update: e.update_method.to_string(),
                        fields: e
                            .fields
                            .iter()
                            .map(|f| match f.comparison {
                                Comparison::Set => format!("{} (set)", f.name),
                                Comparison::Sequence => format!("{} (list)", f.name),
                                Comparison::Scalar => f.name.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    /// Formats an action with color.
    fn format_action(action: Action) -> String {
        match action {
            Action::Create => "create".green().to_string(),
            Action::Update => "update".yellow().to_string(),
            Action::Delete => "delete".red().to_string(),
            Action::None => "nothing".dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct KindJson {
    kind: &'static str,
    path: &'static str,
    identity_field: &'static str,
    update_method: String,
    fields: Vec<&'static str>,
}

impl From<&CatalogEntry> for KindJson {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            kind: entry.kind.as_str(),
            path: entry.path,
            identity_field: entry.identity_field,
            update_method: entry.update_method.to_string(),
            fields: entry.fields.iter().map(|f| f.name).collect(),
        }
    }
}
