//! Reconciliation request types.
//!
//! This module defines the document a caller submits: where the Apstra server
//! is, how to authenticate, and the desired state of one resource. Every
//! top-level key that is not a connection or tuning setting is a resource
//! attribute.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{ClientSettings, RemoteResource};
use crate::catalog::{entry, lookup, to_wire, CatalogEntry, FieldValue, ResourceKind, Snapshot};
use crate::error::CatalogError;
use crate::retry::RetryPolicy;

use super::auth::Secret;

/// Default HTTPS port.
pub const DEFAULT_PORT: u16 = 443;

/// Default header carrying the session token.
pub const DEFAULT_AUTH_HEADER: &str = "AuthToken";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// A reconciliation request as submitted by the caller.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReconcileRequest {
    /// Apstra server host name or address.
    #[serde(default)]
    pub server: String,
    /// Apstra server port (443 when unset).
    #[serde(default)]
    pub port: Option<u16>,
    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub validate_certs: bool,
    /// Session token supplied directly.
    #[serde(default)]
    pub api_token: Option<Secret>,
    /// Session token supplied by a secret store.
    #[serde(default)]
    pub vault_token: Option<Secret>,
    /// Login user name, used when no token is available.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<Secret>,
    /// Resource kind, e.g. `ip-pools`.
    #[serde(alias = "type")]
    pub kind: String,
    /// Identity of the resource.
    pub display_name: String,
    /// Whether the resource should exist.
    #[serde(default)]
    pub state: TargetState,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per operation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Header carrying the session token.
    #[serde(default = "default_auth_header")]
    pub auth_header: String,
    /// Desired resource attributes.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Target existence state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// The resource should exist with the given attributes.
    #[default]
    Present,
    /// The resource should not exist.
    Absent,
}

/// Desired state of one resource, resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Identity of the resource.
    pub display_name: String,
    /// Desired attributes. Attributes not mentioned are left alone.
    pub attributes: Map<String, Value>,
    /// Whether the resource should exist.
    pub target_state: TargetState,
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

const fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

fn default_auth_header() -> String {
    String::from(DEFAULT_AUTH_HEADER)
}

impl ReconcileRequest {
    /// Connection settings for the HTTP client.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: ClientSettings::base_url_for(&self.server, self.port.unwrap_or(DEFAULT_PORT)),
            auth_header: self.auth_header.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            validate_certs: self.validate_certs,
        }
    }

    /// Retry policy for every remote operation.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    /// Resolves the requested kind and builds the desired resource.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if the kind is not in the catalog.
    pub fn resource_spec(&self) -> Result<ResourceSpec, CatalogError> {
        let catalog_entry = lookup(&self.kind)?;
        Ok(ResourceSpec {
            kind: catalog_entry.kind,
            display_name: self.display_name.clone(),
            attributes: self.attributes.clone(),
            target_state: self.state,
        })
    }
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

impl ResourceSpec {
    /// Creates a spec for a present resource.
    #[must_use]
    pub fn present(kind: ResourceKind, display_name: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            attributes,
            target_state: TargetState::Present,
        }
    }

    /// Creates a spec for an absent resource.
    #[must_use]
    pub fn absent(kind: ResourceKind, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            attributes: Map::new(),
            target_state: TargetState::Absent,
        }
    }

    /// Catalog entry of this resource's kind.
    #[must_use]
    pub fn entry(&self) -> &'static CatalogEntry {
        entry(self.kind)
    }

    /// Projection of the desired attributes onto the comparable fields.
    #[must_use]
    pub fn desired_snapshot(&self) -> Snapshot {
        Snapshot::of(self.entry(), &self.attributes)
    }

    /// Builds the request body for a create or update.
    ///
    /// For an update, comparable fields the caller did not mention are carried
    /// over from the current object so a full replace leaves them untouched.
    #[must_use]
    pub fn payload(&self, current: Option<&RemoteResource>) -> Value {
        let catalog_entry = self.entry();
        let mut body = Map::new();

        if let Some(current) = current {
            for spec in catalog_entry.fields {
                let existing = FieldValue::project(spec, current.attributes.get(spec.name));
                if !existing.is_absent() {
                    body.insert(spec.name.to_string(), to_wire(spec, &existing.to_json()));
                }
            }
        }

        for (key, value) in &self.attributes {
            let wire = catalog_entry
                .field(key)
                .map_or_else(|| value.clone(), |spec| to_wire(spec, value));
            body.insert(key.clone(), wire);
        }

        body.insert(
            catalog_entry.identity_field.to_string(),
            Value::String(self.display_name.clone()),
        );

        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(yaml: &str) -> ReconcileRequest {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_attributes_are_flattened() {
        let req = request(
            r"
server: apstra.dmz.home
api_token: abc
type: ip-pools
display_name: cicd_test
subnets:
  - 100.1.1.0/24
tags: [ci]
",
        );

        assert_eq!(req.port, None);
        assert!(req.validate_certs);
        assert_eq!(req.kind, "ip-pools");
        assert_eq!(req.state, TargetState::Present);
        assert_eq!(req.auth_header, "AuthToken");
        assert_eq!(req.attributes.len(), 2);
        assert_eq!(req.attributes["subnets"], json!(["100.1.1.0/24"]));
        assert!(!req.attributes.contains_key("api_token"));
    }

    #[test]
    fn test_secrets_do_not_leak_through_debug() {
        let req = request(
            r"
server: a
api_token: very-secret
password: also-secret
kind: ip-pools
display_name: x
",
        );
        let debug = format!("{req:?}");
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
    }

    #[test]
    fn test_client_settings_and_policy() {
        let req = request(
            r"
server: 10.0.0.1
port: 8443
validate_certs: false
kind: asn-pools
display_name: x
timeout_secs: 5
max_attempts: 4
retry_base_delay_ms: 0
",
        );

        let settings = req.client_settings();
        assert_eq!(settings.base_url, "https://10.0.0.1:8443/api");
        assert!(!settings.validate_certs);
        assert_eq!(settings.timeout, Duration::from_secs(5));

        let policy = req.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::ZERO);
    }

    #[test]
    fn test_resource_spec_resolves_kind() {
        let req = request("server: a\nkind: ip-pool\ndisplay_name: x\nstate: absent\n");
        let spec = req.resource_spec().unwrap();
        assert_eq!(spec.kind, ResourceKind::IpPool);
        assert_eq!(spec.target_state, TargetState::Absent);

        let req = request("server: a\nkind: widgets\ndisplay_name: x\n");
        assert!(req.resource_spec().is_err());
    }

    #[test]
    fn test_create_payload_uses_wire_shapes() {
        let spec = ResourceSpec::present(
            ResourceKind::IpPool,
            "cicd_test",
            json!({ "subnets": ["100.1.1.0/24"], "description": "ci" })
                .as_object()
                .cloned()
                .unwrap(),
        );

        assert_eq!(
            spec.payload(None),
            json!({
                "display_name": "cicd_test",
                "subnets": [{ "network": "100.1.1.0/24" }],
                "description": "ci"
            })
        );
    }

    #[test]
    fn test_update_payload_keeps_unmentioned_fields() {
        let current = RemoteResource::from_item(
            ResourceKind::IpPool,
            json!({
                "id": "p1",
                "display_name": "cicd_test",
                "subnets": [{ "network": "10.0.0.0/8", "status": "pool_element_available" }],
                "tags": ["keep"]
            }),
        )
        .unwrap();
        let spec = ResourceSpec::present(
            ResourceKind::IpPool,
            "cicd_test",
            json!({ "subnets": ["100.1.1.0/24"] }).as_object().cloned().unwrap(),
        );

        let payload = spec.payload(Some(&current));
        assert_eq!(payload["subnets"], json!([{ "network": "100.1.1.0/24" }]));
        assert_eq!(payload["tags"], json!(["keep"]));
        assert!(payload.get("id").is_none());
    }
}
