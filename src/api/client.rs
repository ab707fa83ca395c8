//! Apstra REST API client implementation.
//!
//! This module provides the HTTP transport for the Apstra REST API: token
//! authentication, request timeouts and classification of failures.

use async_trait::async_trait;
use reqwest::header::{self, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::config::{AuthToken, Secret, TokenSource};
use crate::error::{ApstraError, ConfigError, Result, TransportError};

use super::transport::Transport;
use super::types::{ApiResponse, ClientSettings, HttpMethod};

/// Login endpoint, relative to the API root.
const LOGIN_PATH: &str = "user/login";

/// Keys that commonly carry an error description in Apstra responses.
const DETAIL_KEYS: [&str; 4] = ["errors", "error", "message", "detail"];

/// Longest server detail kept in an error.
const MAX_DETAIL_LEN: usize = 512;

/// Apstra API client.
#[derive(Debug, Clone)]
pub struct ApstraClient {
    /// HTTP client.
    client: Client,
    /// Connection settings.
    settings: ClientSettings,
    /// Header carrying the token.
    auth_header: HeaderName,
    /// Token header value, marked sensitive.
    auth_value: HeaderValue,
    /// Session token.
    token: AuthToken,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

impl ApstraClient {
    /// Opens an authenticated session.
    ///
    /// No request is sent; an invalid token surfaces as `Unauthorized` on
    /// the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or token is not a valid HTTP
    /// header, or the HTTP client cannot be created.
    pub fn connect(settings: ClientSettings, token: AuthToken) -> Result<Self> {
        let client = build_http_client(&settings)?;

        let auth_header = HeaderName::from_bytes(settings.auth_header.as_bytes())
            .map_err(|_| ConfigError::validation("invalid auth header name", "auth_header"))?;
        let mut auth_value = HeaderValue::from_str(token.secret().expose())
            .map_err(|_| ConfigError::validation("token is not a valid header value", "api_token"))?;
        auth_value.set_sensitive(true);

        debug!(
            "Connected to {} with token from {}",
            settings.base_url,
            token.source()
        );

        Ok(Self {
            client,
            settings,
            auth_header,
            auth_value,
            token,
        })
    }

    /// Exchanges username and password for a session token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the credentials are rejected, or a transport
    /// error if the server cannot be reached.
    pub async fn login(
        settings: &ClientSettings,
        username: &str,
        password: &Secret,
    ) -> Result<AuthToken> {
        let client = build_http_client(settings)?;
        let url = settings.url(LOGIN_PATH);
        debug!("Logging in to {} as {username}", settings.base_url);

        let response = client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({ "username": username, "password": password.expose() }))
            .send()
            .await
            .map_err(|e| classify_send_error(&e, password))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::transient(password.redact(&e.to_string())))?;

        if !(200..300).contains(&status) {
            return Err(match classify_status(status, &text, LOGIN_PATH, password) {
                // Every rejected login is an authentication failure.
                TransportError::Malformed { status, detail }
                | TransportError::Unauthorized { status, detail } => {
                    TransportError::Unauthorized { status, detail }
                }
                other => other,
            }
            .into());
        }

        let body: LoginResponse = serde_json::from_str(&text).map_err(|e| {
            TransportError::invalid_response(format!("failed to parse login response: {e}"))
        })?;

        body.token
            .filter(|t| !t.is_empty())
            .map(|t| AuthToken::new(Secret::new(t), TokenSource::Login))
            .ok_or_else(|| TransportError::invalid_response("login response has no token").into())
    }

    /// Executes a single request.
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse> {
        let url = self.settings.url(path);
        trace!("{method} {url}");

        let mut request = self
            .client
            .request(method.as_reqwest(), &url)
            .header(self.auth_header.clone(), self.auth_value.clone());

        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .json(&body);
        }

        let secret = self.token.secret();
        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(&e, secret))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::transient(secret.redact(&format!("reading body: {e}"))))?;

        if !(200..300).contains(&status) {
            return Err(classify_status(status, &text, path, secret).into());
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                TransportError::invalid_response(format!("{method} {path}: undecodable body: {e}"))
            })?
        };

        debug!("{method} {path} -> {status}");
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl Transport for ApstraClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse> {
        self.execute(method, path, body).await
    }
}

fn build_http_client(settings: &ClientSettings) -> Result<Client> {
    Client::builder()
        .timeout(settings.timeout)
        .danger_accept_invalid_certs(!settings.validate_certs)
        .build()
        .map_err(|e| ApstraError::internal(format!("Failed to create HTTP client: {e}")))
}

/// Classifies a non-2xx response.
///
/// 401/403 are authentication failures, 404 is absence, 429 and 5xx are
/// retryable, and every other status is a rejected request.
#[must_use]
pub fn classify_status(status: u16, body: &str, path: &str, secret: &Secret) -> TransportError {
    let detail = truncate(secret.redact(&detail_text(body)), MAX_DETAIL_LEN);
    match status {
        401 | 403 => TransportError::Unauthorized { status, detail },
        404 => TransportError::NotFound {
            path: path.to_string(),
        },
        429 | 500..=599 => TransportError::transient(if detail.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {detail}")
        }),
        _ => TransportError::Malformed { status, detail },
    }
}

/// Pulls a human-readable description out of an error body.
///
/// Looks for the usual error keys in a JSON object and falls back to the raw
/// text, truncated.
#[must_use]
pub fn extract_detail(body: &str) -> String {
    truncate(detail_text(body), MAX_DETAIL_LEN)
}

fn detail_text(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        let Value::Object(obj) = value else {
            return None;
        };
        DETAIL_KEYS
            .iter()
            .find_map(|key| obj.get(*key))
            .map(|v| v.as_str().map_or_else(|| v.to_string(), String::from))
    });

    from_json.unwrap_or_else(|| body.trim().to_string())
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

fn classify_send_error(error: &reqwest::Error, secret: &Secret) -> ApstraError {
    let message = secret.redact(&error.to_string());
    if error.is_builder() {
        return ConfigError::validation(format!("invalid request: {message}"), "server").into();
    }
    if error.is_timeout() {
        return TransportError::transient(format!("request timed out: {message}")).into();
    }
    TransportError::transient(message).into()
}
