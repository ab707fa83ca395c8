//! Typed projection of resource attributes onto catalog fields.
//!
//! Raw JSON objects, whether they come from the caller or from the API, are
//! projected onto the comparable fields of their catalog entry before any
//! comparison happens. The projection normalizes wire shapes and set
//! semantics so that equality is well defined.

use ipnet::IpNet;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::entries::{CatalogEntry, Comparison, FieldSpec, WireShape};

/// Normalized value of a comparable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// The field is missing or null.
    Absent,
    /// A value compared by plain JSON equality.
    Scalar(Value),
    /// Sorted, de-duplicated elements of a set-like list.
    Set(Vec<Value>),
    /// Elements of an order-sensitive list.
    Sequence(Vec<Value>),
}

static ABSENT: FieldValue = FieldValue::Absent;

/// Comparable fields of one object, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    fields: Vec<(&'static str, FieldValue)>,
}

impl FieldValue {
    /// Projects a raw JSON value according to a field spec.
    #[must_use]
    pub fn project(spec: &FieldSpec, raw: Option<&Value>) -> Self {
        let Some(value) = raw.filter(|v| !v.is_null()) else {
            return Self::Absent;
        };

        match (spec.comparison, value) {
            (Comparison::Set, Value::Array(items)) => {
                let mut keyed: Vec<(String, Value)> = items
                    .iter()
                    .map(|item| normalize_element(spec.shape, item))
                    .map(|item| (canonical(&item), item))
                    .collect();
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
                keyed.dedup_by(|a, b| a.0 == b.0);
                Self::Set(keyed.into_iter().map(|(_, item)| item).collect())
            }
            (Comparison::Sequence, Value::Array(items)) => Self::Sequence(
                items
                    .iter()
                    .map(|item| normalize_element(spec.shape, item))
                    .collect(),
            ),
            // A list field holding a non-list still compares, as an opaque value.
            _ => Self::Scalar(value.clone()),
        }
    }

    /// Returns true if the field is missing.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Converts back to plain JSON (`null` when absent).
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Absent => Value::Null,
            Self::Scalar(value) => value.clone(),
            Self::Set(items) | Self::Sequence(items) => Value::Array(items.clone()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Snapshot {
    /// Projects every comparable field of an object.
    #[must_use]
    pub fn of(entry: &CatalogEntry, attributes: &Map<String, Value>) -> Self {
        Self {
            fields: entry
                .fields
                .iter()
                .map(|spec| (spec.name, FieldValue::project(spec, attributes.get(spec.name))))
                .collect(),
        }
    }

    /// Returns the value of a field (`Absent` for unknown names).
    #[must_use]
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map_or(&ABSENT, |(_, value)| value)
    }

    /// Iterates over fields in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// Names of the fields that carry a value.
    #[must_use]
    pub fn present_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, value)| !value.is_absent())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Restricts the snapshot to the given fields; others become `Absent`.
    #[must_use]
    pub fn restricted_to(&self, names: &[&str]) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|(name, value)| {
                    if names.contains(name) {
                        (*name, value.clone())
                    } else {
                        (*name, FieldValue::Absent)
                    }
                })
                .collect(),
        }
    }

    /// Computes a SHA-256 digest over the canonical form of the snapshot.
    ///
    /// Set fields are already sorted, so two snapshots that are equal as sets
    /// share a digest.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();

        for (name, value) in &self.fields {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(canonical(&value.to_json()).as_bytes());
            hasher.update([0u8]);
        }

        hex::encode(hasher.finalize())
    }
}

/// Converts a desired field value to its wire representation.
#[must_use]
pub fn to_wire(spec: &FieldSpec, value: &Value) -> Value {
    match (spec.shape, value) {
        (WireShape::Networks, Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::String(network) => serde_json::json!({ "network": network }),
                    other => other.clone(),
                })
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Normalizes one list element according to its wire shape.
fn normalize_element(shape: WireShape, item: &Value) -> Value {
    match (shape, item) {
        (WireShape::Networks, Value::String(network)) => normalize_network(network),
        (WireShape::Networks, Value::Object(obj)) => match obj.get("network") {
            Some(Value::String(network)) => normalize_network(network),
            _ => item.clone(),
        },
        (WireShape::Ranges, Value::Object(obj)) => {
            let projected: Map<String, Value> = ["first", "last"]
                .into_iter()
                .filter_map(|key| obj.get(key).map(|v| (key.to_string(), v.clone())))
                .collect();
            Value::Object(projected)
        }
        _ => item.clone(),
    }
}

/// Canonical spelling of a network: host bits cleared, addresses in their
/// shortest lowercase form. Unparseable values are kept verbatim.
fn normalize_network(network: &str) -> Value {
    network.trim().parse::<IpNet>().map_or_else(
        |_| Value::String(network.to_string()),
        |net| Value::String(net.trunc().to_string()),
    )
}

/// Canonical string form of a JSON value. Object keys serialize sorted.
fn canonical(value: &Value) -> String {
    value.to_string()
}
