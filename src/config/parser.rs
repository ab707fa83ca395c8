//! Request parser for loading reconciliation requests.
//!
//! This module loads requests from YAML or JSON files and fills connection
//! settings the document leaves out from environment variables.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ApstraError, ConfigError, Result};

use super::auth::Secret;
use super::spec::ReconcileRequest;

/// Environment variable for the server name.
pub const ENV_SERVER: &str = "APSTRA_SERVER";

/// Environment variable for the server port.
pub const ENV_PORT: &str = "APSTRA_PORT";

/// Environment variable for the login user name.
pub const ENV_USERNAME: &str = "APSTRA_USERNAME";

/// Environment variable for the login password.
pub const ENV_PASSWORD: &str = "APSTRA_PASSWORD";

/// Parser for reconciliation requests.
#[derive(Debug, Default)]
pub struct RequestParser {
    /// Directory searched for a `.env` file.
    base_path: Option<PathBuf>,
}

impl RequestParser {
    /// Creates a new request parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for a `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a request from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ReconcileRequest> {
        let path = path.as_ref();
        info!("Loading request from: {}", path.display());

        if !path.exists() {
            return Err(ApstraError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ApstraError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_str(&content, Some(path))
    }

    /// Parses a request document. JSON is accepted as a subset of YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid.
    pub fn parse_str(&self, content: &str, source: Option<&Path>) -> Result<ReconcileRequest> {
        debug!("Parsing request document");

        let request: ReconcileRequest = serde_yaml::from_str(content).map_err(|e| {
            ApstraError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        debug!(
            "Parsed request for {} '{}'",
            request.kind, request.display_name
        );
        Ok(request)
    }

    /// Loads a request and fills missing settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ReconcileRequest> {
        let mut request = self.load_file(path)?;
        apply_env_overrides(&mut request, |name| std::env::var(name).ok());
        Ok(request)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ApstraError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Fills connection settings the request leaves unset from `lookup`.
///
/// Values present in the request always win.
pub fn apply_env_overrides<F>(request: &mut ReconcileRequest, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if request.server.trim().is_empty() {
        if let Some(server) = lookup(ENV_SERVER) {
            debug!("Using server from {ENV_SERVER}");
            request.server = server;
        }
    }

    if request.port.is_none() {
        if let Some(port) = lookup(ENV_PORT) {
            match port.trim().parse::<u16>() {
                Ok(port) => {
                    debug!("Using port from {ENV_PORT}");
                    request.port = Some(port);
                }
                Err(_) => warn!("Ignoring invalid {ENV_PORT} value '{port}'"),
            }
        }
    }

    if request.username.is_none() {
        request.username = lookup(ENV_USERNAME);
    }

    if request.password.is_none() {
        request.password = lookup(ENV_PASSWORD).map(Secret::new);
    }
}
