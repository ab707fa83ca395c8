//! Request configuration for the Apstra reconciliation client.
//!
//! This module handles everything about the inbound request:
//! - Parsing the request document from YAML or JSON
//! - Filling connection settings from the environment
//! - Validation before any network call
//! - Token resolution and secret handling

mod auth;
mod parser;
mod spec;
mod validator;

pub use auth::{AuthToken, Secret, TokenResolver, TokenSource, REDACTED, TOKEN_ENV_VARS};
pub use parser::{apply_env_overrides, RequestParser, ENV_PASSWORD, ENV_PORT, ENV_SERVER, ENV_USERNAME};
pub use spec::{
    ReconcileRequest, ResourceSpec, TargetState, DEFAULT_AUTH_HEADER, DEFAULT_PORT,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_TIMEOUT_SECS,
};
pub use validator::{RequestValidator, ValidationError, ValidationResult};
