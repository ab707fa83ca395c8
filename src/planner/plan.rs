//! Change-set types.
//!
//! A change-set is the minimal description of what must happen for one
//! resource to match its desired state.

use serde::Serialize;

use crate::catalog::FieldValue;

/// Action required to converge a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Already converged.
    None,
    /// The resource must be created.
    Create,
    /// The resource must be updated in place.
    Update,
    /// The resource must be deleted.
    Delete,
}

/// One differing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDelta {
    /// Field name.
    pub field: String,
    /// Current value (`null` when absent).
    pub old: FieldValue,
    /// Desired value.
    pub new: FieldValue,
}

/// Result of comparing desired and current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Required action.
    pub action: Action,
    /// Backend id of the object the action targets, if it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Differing fields, in catalog order. Empty unless the action is
    /// `Create` or `Update`.
    pub field_deltas: Vec<FieldDelta>,
}

impl ChangeSet {
    /// A change-set that requires nothing.
    #[must_use]
    pub const fn none(resource_id: Option<String>) -> Self {
        Self {
            action: Action::None,
            resource_id,
            field_deltas: Vec::new(),
        }
    }

    /// Returns true if no write is required.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.action == Action::None
    }

    /// Names of the differing fields.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&str> {
        self.field_deltas.iter().map(|d| d.field.as_str()).collect()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.action)?;
        if !self.field_deltas.is_empty() {
            write!(f, " ({})", self.changed_fields().join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        let change_set = ChangeSet {
            action: Action::Update,
            resource_id: Some(String::from("p1")),
            field_deltas: vec![FieldDelta {
                field: String::from("tags"),
                old: FieldValue::Absent,
                new: FieldValue::Set(vec![json!("a")]),
            }],
        };
        assert_eq!(change_set.to_string(), "update (tags)");
        assert_eq!(ChangeSet::none(None).to_string(), "none");
    }

    #[test]
    fn test_serialize() {
        let change_set = ChangeSet {
            action: Action::Create,
            resource_id: None,
            field_deltas: vec![FieldDelta {
                field: String::from("subnets"),
                old: FieldValue::Absent,
                new: FieldValue::Set(vec![json!("10.0.0.0/8")]),
            }],
        };
        assert_eq!(
            serde_json::to_value(&change_set).unwrap(),
            json!({
                "action": "create",
                "field_deltas": [{ "field": "subnets", "old": null, "new": ["10.0.0.0/8"] }]
            })
        );
    }
}
