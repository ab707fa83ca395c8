//! Resource catalog for Apstra object kinds.
//!
//! This module holds the static, read-only table that maps each resource kind
//! to its API path, identity key and comparable field set, together with the
//! typed projection of JSON objects onto those fields.

mod entries;
mod snapshot;

pub use entries::{
    entries, entry, lookup, CatalogEntry, Comparison, FieldSpec, ResourceKind, WireShape,
};
pub use snapshot::{to_wire, FieldValue, Snapshot};
