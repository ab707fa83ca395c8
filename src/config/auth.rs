//! API token handling.
//!
//! Tokens are wrapped in [`Secret`] so they never reach logs, `Debug` output
//! or error details.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variables consulted for a token, in precedence order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["APSTRA_API_TOKEN", "APSTRA_API_KEY"];

/// Placeholder shown instead of a secret value.
pub const REDACTED: &str = "***";

/// A secret string that is never printed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

/// Where a session token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    /// Supplied directly with the request.
    Parameter,
    /// Read from an environment variable.
    Environment {
        /// Variable name.
        variable: &'static str,
    },
    /// Supplied by a secret store.
    Vault,
    /// Obtained by logging in with username and password.
    Login,
}

/// A resolved session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: Secret,
    source: TokenSource,
}

/// Resolves the session token from explicit values and the environment.
///
/// Precedence: explicit parameter, `APSTRA_API_TOKEN`, `APSTRA_API_KEY`,
/// vault token. Login is handled by the client when this yields nothing.
pub struct TokenResolver<F> {
    lookup: F,
}

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying value. Only for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the secret is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Replaces every occurrence of this secret in `text`.
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        if self.is_blank() {
            text.to_string()
        } else {
            text.replace(&self.0, REDACTED)
        }
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({REDACTED})")
    }
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parameter => write!(f, "parameter"),
            Self::Environment { variable } => write!(f, "environment ({variable})"),
            Self::Vault => write!(f, "vault"),
            Self::Login => write!(f, "login"),
        }
    }
}

impl AuthToken {
    /// Creates a token from a secret and its source.
    #[must_use]
    pub const fn new(value: Secret, source: TokenSource) -> Self {
        Self { value, source }
    }

    /// Returns the secret value.
    #[must_use]
    pub const fn secret(&self) -> &Secret {
        &self.value
    }

    /// Returns where the token came from.
    #[must_use]
    pub const fn source(&self) -> TokenSource {
        self.source
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl TokenResolver<fn(&str) -> Option<String>> {
    /// Creates a resolver that reads the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self { lookup: env_lookup }
    }
}

impl<F> TokenResolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Creates a resolver over a custom variable lookup.
    #[must_use]
    pub const fn with_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    /// Returns the first non-empty token in precedence order.
    #[must_use]
    pub fn resolve(&self, explicit: Option<&Secret>, vault: Option<&Secret>) -> Option<AuthToken> {
        if let Some(token) = explicit.filter(|s| !s.is_blank()) {
            debug!("Using API token from request parameter");
            return Some(AuthToken::new(token.clone(), TokenSource::Parameter));
        }

        for variable in TOKEN_ENV_VARS {
            if let Some(value) = (self.lookup)(variable).filter(|v| !v.trim().is_empty()) {
                debug!("Using API token from {variable}");
                return Some(AuthToken::new(
                    Secret::new(value),
                    TokenSource::Environment { variable },
                ));
            }
        }

        vault.filter(|s| !s.is_blank()).map(|token| {
            debug!("Using API token from vault");
            AuthToken::new(token.clone(), TokenSource::Vault)
        })
    }
}
