//! Result reporting.
//!
//! Every reconciliation, successful or not, ends in exactly one [`Outcome`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::RemoteResource;
use crate::error::{ApstraError, ErrorKind, Result};
use crate::planner::{Action, Applied, ChangeSet, FieldDelta};

/// Structured result of one reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Whether the server was (or in check mode, would be) modified.
    pub changed: bool,
    /// Backend id of the resource, when known.
    pub resource_id: Option<String>,
    /// Action taken or planned.
    pub action: Action,
    /// Differing fields.
    pub diff: Vec<FieldDelta>,
    /// Failure, if any.
    pub error: Option<OutcomeError>,
    /// Resource kind as requested.
    pub kind: String,
    /// Resource identity.
    pub display_name: String,
    /// Whether this was a check-mode run.
    pub dry_run: bool,
    /// Remote object before reconciliation.
    pub before: Option<Value>,
    /// Remote object after reconciliation.
    pub after: Option<Value>,
    /// When the reconciliation finished.
    pub reconciled_at: DateTime<Utc>,
    /// Correlates the log lines of one invocation.
    pub invocation_id: Uuid,
}

/// Error part of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeError {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Server-provided detail, if any.
    pub detail: Option<String>,
}

/// Builds outcomes for one invocation.
#[derive(Debug, Clone)]
pub struct Reporter {
    kind: String,
    display_name: String,
    dry_run: bool,
    invocation_id: Uuid,
}

impl Outcome {
    /// Returns true if the reconciliation failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&ApstraError> for OutcomeError {
    fn from(err: &ApstraError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            detail: err.detail().map(String::from),
        }
    }
}

impl Reporter {
    /// Creates a reporter with a fresh invocation id.
    #[must_use]
    pub fn new(kind: impl Into<String>, display_name: impl Into<String>, dry_run: bool) -> Self {
        Self {
            kind: kind.into(),
            display_name: display_name.into(),
            dry_run,
            invocation_id: Uuid::new_v4(),
        }
    }

    /// Returns the invocation id.
    #[must_use]
    pub const fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Summarizes a change-set and the result of applying it.
    #[must_use]
    pub fn summarize(
        &self,
        change_set: ChangeSet,
        before: Option<&RemoteResource>,
        applied: Result<Applied>,
    ) -> Outcome {
        match applied {
            Ok(applied) => {
                let resource_id = applied
                    .resource
                    .as_ref()
                    .map(|r| r.id.clone())
                    .or(change_set.resource_id);

                info!(
                    invocation_id = %self.invocation_id,
                    "{} {} '{}': changed={}",
                    change_set.action, self.kind, self.display_name, applied.performed
                );

                Outcome {
                    changed: applied.performed,
                    resource_id,
                    action: change_set.action,
                    diff: change_set.field_deltas,
                    error: None,
                    before: before.map(RemoteResource::to_json),
                    after: applied.resource.as_ref().map(RemoteResource::to_json),
                    ..self.base()
                }
            }
            Err(err) => {
                let mut outcome = self.failure(before, &err);
                outcome.resource_id = change_set.resource_id;
                outcome.action = change_set.action;
                outcome.diff = change_set.field_deltas;
                outcome
            }
        }
    }

    /// Builds the outcome of a reconciliation that failed before or during
    /// apply.
    #[must_use]
    pub fn failure(&self, before: Option<&RemoteResource>, err: &ApstraError) -> Outcome {
        error!(
            invocation_id = %self.invocation_id,
            "{} '{}' failed: {err}",
            self.kind, self.display_name
        );

        Outcome {
            resource_id: before.map(|r| r.id.clone()),
            before: before.map(RemoteResource::to_json),
            error: Some(OutcomeError::from(err)),
            ..self.base()
        }
    }

    fn base(&self) -> Outcome {
        Outcome {
            changed: false,
            resource_id: None,
            action: Action::None,
            diff: Vec::new(),
            error: None,
            kind: self.kind.clone(),
            display_name: self.display_name.clone(),
            dry_run: self.dry_run,
            before: None,
            after: None,
            reconciled_at: Utc::now(),
            invocation_id: self.invocation_id,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error {
            Some(err) => write!(
                f,
                "{} '{}' failed ({}): {}",
                self.kind, self.display_name, err.kind, err.message
            ),
            None => write!(
                f,
                "{} '{}': {}{}",
                self.kind,
                self.display_name,
                if self.changed { "changed" } else { "ok" },
                if self.dry_run { " (check mode)" } else { "" }
            ),
        }
    }
}
