//! Error types for the Apstra reconciliation client.
//!
//! This module provides the error hierarchy for every stage of a
//! reconciliation: request configuration, catalog lookup, transport and the
//! reconciliation protocol itself. Every error maps onto the caller-facing
//! [`ErrorKind`] taxonomy reported in an [`Outcome`](crate::report::Outcome).

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// The main error type for the Apstra reconciliation client.
#[derive(Debug, Error)]
pub enum ApstraError {
    /// Request configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource catalog errors.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Apstra API transport errors.
    #[error("Apstra API error: {0}")]
    Transport(#[from] TransportError),

    /// Reconciliation protocol errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The token was rejected or no token could be resolved.
    Unauthorized,
    /// The object does not exist. Resolved internally as absence.
    NotFound,
    /// The request was rejected by the backend or is invalid.
    Malformed,
    /// A retryable failure (5xx, timeout, connection reset).
    Transient,
    /// Transient failures exhausted the retry budget.
    Unavailable,
    /// More than one remote object carries the requested identity.
    AmbiguousIdentity,
    /// The requested kind is not registered in the catalog.
    UnknownKind,
}

/// Request configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The request file was not found.
    #[error("Request file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The request document could not be parsed.
    #[error("Failed to parse request: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Request validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// No token source produced a value.
    #[error("No API token available (tried parameter, APSTRA_API_TOKEN, APSTRA_API_KEY, vault, login)")]
    MissingToken,
}

/// Resource catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The kind string does not match a registered entry.
    #[error("Unknown resource kind: {kind}")]
    UnknownKind {
        /// The unrecognized kind string.
        kind: String,
    },
}

/// Apstra API transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend rejected the token (401/403).
    #[error("Apstra authentication failed ({status}): {detail}")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail.
        detail: String,
    },

    /// The requested path does not exist (404).
    #[error("Not found: {path}")]
    NotFound {
        /// Request path.
        path: String,
    },

    /// The backend rejected the request (4xx other than 401/403/404).
    #[error("Apstra rejected the request ({status}): {detail}")]
    Malformed {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail.
        detail: String,
    },

    /// Retryable failure: 5xx, 429, timeout or connection failure.
    #[error("Transient failure talking to Apstra: {message}")]
    Transient {
        /// Description of the failure.
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("Invalid response from Apstra API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Reconciliation protocol errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Several remote objects share the requested identity.
    #[error("{count} {kind} objects match {identity_field} '{display_name}'")]
    AmbiguousIdentity {
        /// Resource kind.
        kind: String,
        /// Identity field used for matching.
        identity_field: String,
        /// Requested display name.
        display_name: String,
        /// Number of matches.
        count: usize,
    },

    /// Transient failures exhausted the retry budget.
    #[error("{operation} still failing after {attempts} attempts: {last_error}")]
    Unavailable {
        /// Operation that was retried.
        operation: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last transient failure.
        last_error: String,
    },

    /// The object vanished between fetch and write.
    #[error("{kind} '{display_name}' disappeared while being updated")]
    Vanished {
        /// Resource kind.
        kind: String,
        /// Requested display name.
        display_name: String,
    },
}

/// Result type alias for Apstra operations.
pub type Result<T> = std::result::Result<T, ApstraError>;

impl ApstraError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Maps this error onto the caller-facing taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(ConfigError::MissingToken)
            | Self::Transport(TransportError::Unauthorized { .. }) => ErrorKind::Unauthorized,
            Self::Catalog(CatalogError::UnknownKind { .. }) => ErrorKind::UnknownKind,
            Self::Transport(TransportError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Transport(TransportError::Transient { .. }) => ErrorKind::Transient,
            Self::Reconcile(ReconcileError::Unavailable { .. }) => ErrorKind::Unavailable,
            Self::Reconcile(ReconcileError::AmbiguousIdentity { .. }) => {
                ErrorKind::AmbiguousIdentity
            }
            Self::Config(_)
            | Self::Transport(TransportError::Malformed { .. } | TransportError::InvalidResponse { .. })
            | Self::Reconcile(ReconcileError::Vanished { .. })
            | Self::Io(_)
            | Self::Internal(_) => ErrorKind::Malformed,
        }
    }

    /// Returns the server-provided detail string, when there is one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Transport(
                TransportError::Unauthorized { detail, .. } | TransportError::Malformed { detail, .. },
            ) if !detail.is_empty() => Some(detail),
            Self::Reconcile(ReconcileError::Unavailable { last_error, .. }) => Some(last_error),
            _ => None,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient)
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl TransportError {
    /// Creates a transient error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Malformed => "malformed",
            Self::Transient => "transient",
            Self::Unavailable => "unavailable",
            Self::AmbiguousIdentity => "ambiguous_identity",
            Self::UnknownKind => "unknown_kind",
        };
        write!(f, "{s}")
    }
}
