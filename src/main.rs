//! Apstra CLI entrypoint.
//!
//! This is the main entrypoint for the apstra command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use apstra_reconcile::catalog::entries;
use apstra_reconcile::cli::{Cli, Commands, OutputFormatter};
use apstra_reconcile::config::{ReconcileRequest, RequestParser};
use apstra_reconcile::error::Result;
use apstra_reconcile::reconciler::reconcile_request;
use apstra_reconcile::report::Reporter;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr so that stdout carries only the command result.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Runs the CLI command. Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Apply { file, check } => cmd_reconcile(&file, check, &formatter).await,
        Commands::Plan { file } => cmd_reconcile(&file, true, &formatter).await,
        Commands::Kinds => {
            emit(&formatter.format_kinds(entries()))?;
            Ok(true)
        }
    }
}

/// Reconciles the request in `file`, applying it unless `dry_run` is set.
async fn cmd_reconcile(file: &Path, dry_run: bool, formatter: &OutputFormatter) -> Result<bool> {
    let base_path = file.parent().filter(|p| !p.as_os_str().is_empty());
    let parser = match base_path {
        Some(dir) => RequestParser::new().with_base_path(dir),
        None => RequestParser::new(),
    };

    let outcome = match load(&parser, file) {
        Ok(request) => {
            info!(
                "Reconciling {} '{}'{}",
                request.kind,
                request.display_name,
                if dry_run { " in check mode" } else { "" }
            );
            reconcile_request(&request, dry_run).await
        }
        Err(e) => {
            debug!("Request could not be loaded: {e}");
            Reporter::new("", "", dry_run).failure(None, &e)
        }
    };

    emit(&formatter.format_outcome(&outcome))?;
    Ok(!outcome.is_error())
}

fn load(parser: &RequestParser, file: &Path) -> Result<ReconcileRequest> {
    parser.load_dotenv()?;
    parser.load_with_env(file)
}

/// Writes command output to stdout.
fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{text}")?;
    if !text.ends_with('\n') {
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}
