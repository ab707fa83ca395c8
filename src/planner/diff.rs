//! Diff engine for comparing desired vs current state.
//!
//! Only fields the caller mentions are compared. A digest over the mentioned
//! fields settles the common converged case before any field-by-field work.

use tracing::debug;

use crate::api::RemoteResource;
use crate::catalog::FieldValue;
use crate::config::{ResourceSpec, TargetState};

use super::plan::{Action, ChangeSet, FieldDelta};

/// Engine for computing change-sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the change-set that converges `current` onto `spec`.
    #[must_use]
    pub fn compute(&self, spec: &ResourceSpec, current: Option<&RemoteResource>) -> ChangeSet {
        match (spec.target_state, current) {
            (TargetState::Absent, None) => {
                debug!("{} '{}' is already absent", spec.kind, spec.display_name);
                ChangeSet::none(None)
            }
            (TargetState::Absent, Some(current)) => ChangeSet {
                action: Action::Delete,
                resource_id: Some(current.id.clone()),
                field_deltas: Vec::new(),
            },
            (TargetState::Present, None) => Self::create(spec),
            (TargetState::Present, Some(current)) => Self::update(spec, current),
        }
    }

    fn create(spec: &ResourceSpec) -> ChangeSet {
        let desired = spec.desired_snapshot();
        let field_deltas = desired
            .iter()
            .filter(|(_, value)| !value.is_absent())
            .map(|(field, value)| FieldDelta {
                field: field.to_string(),
                old: FieldValue::Absent,
                new: value.clone(),
            })
            .collect();

        debug!("{} '{}' needs to be created", spec.kind, spec.display_name);
        ChangeSet {
            action: Action::Create,
            resource_id: None,
            field_deltas,
        }
    }

    fn update(spec: &ResourceSpec, current: &RemoteResource) -> ChangeSet {
        let desired = spec.desired_snapshot();
        let mentioned = desired.present_fields();
        let observed = current.snapshot().restricted_to(&mentioned);

        if desired.digest() == observed.digest() {
            debug!("{} '{}' is up to date", spec.kind, spec.display_name);
            return ChangeSet::none(Some(current.id.clone()));
        }

        let field_deltas: Vec<FieldDelta> = desired
            .iter()
            .filter(|(_, value)| !value.is_absent())
            .filter_map(|(field, value)| {
                let old = observed.get(field);
                (old != value).then(|| FieldDelta {
                    field: field.to_string(),
                    old: old.clone(),
                    new: value.clone(),
                })
            })
            .collect();

        let action = if field_deltas.is_empty() {
            Action::None
        } else {
            debug!(
                "{} '{}' differs in {} field(s)",
                spec.kind,
                spec.display_name,
                field_deltas.len()
            );
            Action::Update
        };

        ChangeSet {
            action,
            resource_id: Some(current.id.clone()),
            field_deltas,
        }
    }
}
