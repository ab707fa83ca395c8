//! Transport seam between the reconciliation engine and the API.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

use super::types::{ApiResponse, HttpMethod};

/// Issues authenticated requests against the Apstra API.
///
/// Implementations classify failures into [`TransportError`](crate::error::TransportError)
/// variants; a `NotFound` is an error at this level and is turned into
/// absence by the state fetcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request. `path` is relative to the API root.
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse>;
}
