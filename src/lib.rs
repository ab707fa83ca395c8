// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Apstra Reconcile
//!
//! A declarative, idempotent reconciliation client for Juniper Apstra.
//!
//! ## Overview
//!
//! Each invocation converges one Apstra object onto a desired state:
//!
//! - Describe the object (kind, identity, attributes) in a YAML or JSON request
//! - Fetch the current object from the Apstra REST API by its identity
//! - Compute a field-level change-set against the catalog's comparable fields
//! - Apply at most one write, or none in check mode
//! - Report a single structured outcome
//!
//! ## Architecture
//!
//! 1. **Desired State**: the [`config::ReconcileRequest`]
//! 2. **Observed State**: fetched through a [`api::Transport`]
//! 3. **Reconciler**: diffs the two and applies the change-set
//!
//! ## Modules
//!
//! - [`api`]: HTTP transport, session and state fetching
//! - [`catalog`]: Resource kinds and their comparable fields
//! - [`config`]: Request parsing, validation and token resolution
//! - [`planner`]: Diff computation and change-set execution
//! - [`reconciler`]: End-to-end reconciliation of one request
//! - [`report`]: Structured outcomes
//! - [`retry`]: Retry policy for transient failures
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! server: apstra.example.net
//! api_token: "..."
//! kind: ip-pools
//! display_name: cicd_test
//! state: present
//! subnets:
//!   - 100.1.1.0/24
//!   - 100.1.2.0/24
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;
pub mod report;
pub mod retry;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{ApstraClient, StateFetcher, Transport};
pub use catalog::{CatalogEntry, ResourceKind};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ReconcileRequest, RequestParser, RequestValidator, ResourceSpec};
pub use error::{ApstraError, ErrorKind, Result};
pub use planner::{ChangeSet, DiffEngine, PlanExecutor};
pub use reconciler::{reconcile_request, reconcile_request_with, Reconciler};
pub use report::{Outcome, Reporter};
pub use retry::RetryPolicy;
