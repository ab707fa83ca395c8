//! Request validation.
//!
//! This module checks a reconciliation request before any network call is
//! made, so that malformed input is reported without touching the server.

use ipnet::IpNet;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::{lookup, CatalogEntry, Comparison, FieldSpec, WireShape};
use crate::error::{ApstraError, ConfigError, Result};

use super::spec::{ReconcileRequest, TargetState};

/// Validator for reconciliation requests.
#[derive(Debug, Default)]
pub struct RequestValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl RequestValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a request.
    ///
    /// An unknown kind is not reported here; it surfaces as `UnknownKind`
    /// when the request is resolved against the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, request: &ReconcileRequest) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_connection(request, &mut result);
        Self::validate_identity(request, &mut result);

        if let Ok(catalog_entry) = lookup(&request.kind) {
            Self::validate_attributes(request, catalog_entry, &mut result);
        }

        for warning in &result.warnings {
            warn!("{warning}");
        }

        if result.errors.is_empty() {
            debug!("Request validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ApstraError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn validate_connection(request: &ReconcileRequest, result: &mut ValidationResult) {
        if request.server.trim().is_empty() {
            result.error("server", "Server cannot be empty (set it or APSTRA_SERVER)");
        }

        if request.port == Some(0) {
            result.error("port", "Port must be between 1 and 65535");
        }

        if request.timeout_secs == 0 {
            result.error("timeout_secs", "Timeout must be at least one second");
        }

        if request.max_attempts == 0 {
            result.error("max_attempts", "At least one attempt is required");
        }

        if request.auth_header.is_empty()
            || !request
                .auth_header
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            result.error(
                "auth_header",
                format!("'{}' is not a valid header name", request.auth_header),
            );
        }

        if !request.validate_certs {
            result
                .warnings
                .push(String::from("TLS certificate verification is disabled"));
        }

        if request.username.is_some() != request.password.is_some() {
            result.warnings.push(String::from(
                "username and password must both be set for login; login is disabled",
            ));
        }
    }

    fn validate_identity(request: &ReconcileRequest, result: &mut ValidationResult) {
        let name = request.display_name.trim();
        if name.is_empty() {
            result.error("display_name", "Display name cannot be empty");
        } else if name.contains('/') {
            result.error(
                "display_name",
                format!("Display name '{name}' cannot contain '/'"),
            );
        }

        if request.state == TargetState::Absent && !request.attributes.is_empty() {
            result.warnings.push(String::from(
                "Attributes are ignored when state is 'absent'",
            ));
        }
    }

    fn validate_attributes(
        request: &ReconcileRequest,
        catalog_entry: &CatalogEntry,
        result: &mut ValidationResult,
    ) {
        if let Some(identity) = request.attributes.get(catalog_entry.identity_field) {
            if identity.as_str() != Some(request.display_name.as_str()) {
                result.error(
                    catalog_entry.identity_field,
                    format!(
                        "'{}' conflicts with display_name '{}'",
                        catalog_entry.identity_field, request.display_name
                    ),
                );
            }
        }

        for (name, value) in &request.attributes {
            match catalog_entry.field(name) {
                Some(spec) => validate_field(spec, value, result),
                None => debug!("Attribute '{name}' is sent but not compared"),
            }
        }
    }
}

fn validate_field(spec: &FieldSpec, value: &Value, result: &mut ValidationResult) {
    if value.is_null() || spec.comparison == Comparison::Scalar {
        return;
    }

    let Value::Array(items) = value else {
        result.error(spec.name, format!("'{}' must be a list", spec.name));
        return;
    };

    for item in items {
        match spec.shape {
            WireShape::Plain => {}
            WireShape::Networks => {
                let network = match item {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj) => obj.get("network").and_then(Value::as_str),
                    _ => None,
                };
                if !network.is_some_and(is_cidr) {
                    result.error(
                        spec.name,
                        format!("'{item}' in '{}' is not a CIDR network", spec.name),
                    );
                }
            }
            WireShape::Ranges => {
                let first = item.get("first").and_then(Value::as_u64);
                let last = item.get("last").and_then(Value::as_u64);
                match (first, last) {
                    (Some(first), Some(last)) if first <= last => {}
                    (Some(_), Some(_)) => result.error(
                        spec.name,
                        format!("Range {item} in '{}' has first > last", spec.name),
                    ),
                    _ => result.error(
                        spec.name,
                        format!(
                            "Range {item} in '{}' needs integer 'first' and 'last'",
                            spec.name
                        ),
                    ),
                }
            }
        }
    }
}

/// Accepts `address/prefix` in IPv4 or IPv6 notation.
fn is_cidr(network: &str) -> bool {
    network.trim().parse::<IpNet>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestParser;
    use crate::error::ErrorKind;

    fn request(yaml: &str) -> ReconcileRequest {
        RequestParser::new().parse_str(yaml, None).unwrap()
    }

    #[test]
    fn test_valid_request() {
        let req = request(
            "server: a\nkind: ip-pools\ndisplay_name: x\nsubnets: ['100.1.1.0/24', '2001:db8::/32']\n",
        );
        let result = RequestValidator::new().validate(&req).unwrap();
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_empty_server_is_rejected() {
        let req = request("kind: ip-pools\ndisplay_name: x\n");
        let err = RequestValidator::new().validate(&req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert!(matches!(
            err,
            ApstraError::Config(ConfigError::ValidationError { field: Some(f), .. }) if f == "server"
        ));
    }

    #[test]
    fn test_bad_subnet_is_rejected() {
        let req = request("server: a\nkind: ip-pools\ndisplay_name: x\nsubnets: [not-a-network]\n");
        assert!(RequestValidator::new().validate(&req).is_err());

        let req = request("server: a\nkind: ip-pools\ndisplay_name: x\nsubnets: 10.0.0.0/8\n");
        assert!(RequestValidator::new().validate(&req).is_err());
    }

    #[test]
    fn test_bad_range_is_rejected() {
        let req = request(
            "server: a\nkind: vlan-pools\ndisplay_name: x\nranges:\n  - first: 200\n    last: 100\n",
        );
        assert!(RequestValidator::new().validate(&req).is_err());

        let req = request("server: a\nkind: vlan-pools\ndisplay_name: x\nranges:\n  - first: 1\n");
        assert!(RequestValidator::new().validate(&req).is_err());
    }

    #[test]
    fn test_identity_conflict() {
        let req = request("server: a\nkind: interface-maps\ndisplay_name: x\nlabel: y\n");
        assert!(RequestValidator::new().validate(&req).is_err());

        let req = request("server: a\nkind: interface-maps\ndisplay_name: x\nlabel: x\n");
        assert!(RequestValidator::new().validate(&req).is_ok());
    }

    #[test]
    fn test_warnings() {
        let req = request(
            "server: a\nvalidate_certs: false\nkind: ip-pools\ndisplay_name: x\nstate: absent\ntags: [a]\n",
        );
        let result = RequestValidator::new().validate(&req).unwrap();
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_is_cidr() {
        assert!(is_cidr("10.0.0.0/8"));
        assert!(is_cidr("fc01:a05:fab::/48"));
        assert!(is_cidr("FC01:0A05:0FAB::/48"));
        assert!(!is_cidr("10.0.0.0/33"));
        assert!(!is_cidr("10.0.0.0"));
        assert!(!is_cidr("host/24"));
    }
}
