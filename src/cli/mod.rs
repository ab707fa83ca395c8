//! CLI module for the Apstra reconciliation tool.
//!
//! This module provides the command-line interface that reconciles one
//! resource per invocation.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
