//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Apstra - Declarative reconciliation for Juniper Apstra resources.
#[derive(Parser, Debug)]
#[command(name = "apstra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile one resource onto the state described in a request file.
    Apply {
        /// Request file (YAML or JSON).
        #[arg(short, long, env = "APSTRA_REQUEST")]
        file: PathBuf,

        /// Check mode: report what would change without writing.
        #[arg(long)]
        check: bool,
    },

    /// Show the change-set for a request without applying it.
    Plan {
        /// Request file (YAML or JSON).
        #[arg(short, long, env = "APSTRA_REQUEST")]
        file: PathBuf,
    },

    /// List the resource kinds the client can reconcile.
    Kinds,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
