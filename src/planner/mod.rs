//! Planning module for reconciliation.
//!
//! This module compares desired and current state, producing a change-set,
//! and applies change-sets against the Apstra API.

mod diff;
mod executor;
mod plan;

pub use diff::DiffEngine;
pub use executor::{Applied, PlanExecutor};
pub use plan::{Action, ChangeSet, FieldDelta};
