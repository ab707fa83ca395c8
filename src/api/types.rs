//! Apstra API types and data structures.
//!
//! This module defines the values exchanged with the Apstra REST API.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::{entry, ResourceKind, Snapshot};
use crate::error::{Result, TransportError};

/// HTTP verbs used by the reconciliation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Full replace.
    Put,
    /// Partial update.
    Patch,
    /// Remove.
    Delete,
}

/// A decoded API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body (`null` when the body was empty).
    pub body: Value,
}

/// Connection settings for one Apstra server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// API root, e.g. `https://apstra.example.com:443/api`.
    pub base_url: String,
    /// Header carrying the session token.
    pub auth_header: String,
    /// Bound on every request.
    pub timeout: Duration,
    /// Whether TLS certificates are verified.
    pub validate_certs: bool,
}

/// An object as it currently exists on the Apstra server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource {
    /// Backend-assigned identifier.
    pub id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Full attribute map as returned by the API.
    pub attributes: Map<String, Value>,
    /// Version marker, when the backend supplies one.
    pub version: Option<String>,
}

impl HttpMethod {
    /// Returns the equivalent `reqwest` method.
    #[must_use]
    pub const fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

impl ClientSettings {
    /// Builds the API root from a server name and port.
    ///
    /// A server given with an explicit `http://` or `https://` scheme is used
    /// as-is and the port is ignored.
    #[must_use]
    pub fn base_url_for(server: &str, port: u16) -> String {
        let server = server.trim().trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            format!("{server}/api")
        } else {
            format!("https://{server}:{port}/api")
        }
    }

    /// Joins a relative API path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl RemoteResource {
    /// Builds a remote resource from one API object.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or has no string `id`.
    pub fn from_item(kind: ResourceKind, item: Value) -> Result<Self> {
        let Value::Object(attributes) = item else {
            return Err(TransportError::invalid_response(format!(
                "expected a {kind} object, got {}",
                json_type(&item)
            ))
            .into());
        };

        let id = attributes
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| {
                TransportError::invalid_response(format!("{kind} object has no string 'id'"))
            })?;

        let version = ["version", "last_modified_at"]
            .into_iter()
            .find_map(|key| attributes.get(key))
            .map(|v| v.as_str().map_or_else(|| v.to_string(), String::from));

        Ok(Self {
            id,
            kind,
            attributes,
            version,
        })
    }

    /// Returns the value of the identity field, if it is a string.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.attributes
            .get(entry(self.kind).identity_field)
            .and_then(Value::as_str)
    }

    /// Projects the comparable fields of this object.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::of(entry(self.kind), &self.attributes)
    }

    /// Returns the raw object as JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.attributes.clone())
    }
}

/// Extracts the list of objects from a collection response.
///
/// Collections come back as `{"items": [...]}`; a bare array is accepted too.
///
/// # Errors
///
/// Returns an error if the body has neither shape.
pub fn collection_items(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(TransportError::invalid_response("collection body has no 'items' list").into()),
        },
        other => Err(TransportError::invalid_response(format!(
            "expected a collection, got {}",
            json_type(&other)
        ))
        .into()),
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
