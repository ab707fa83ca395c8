//! Apstra REST API integration.
//!
//! This module provides the transport seam, the HTTP client implementing it
//! and the state fetcher built on top of it.

mod client;
mod fetcher;
mod transport;
mod types;

pub use client::{classify_status, extract_detail, ApstraClient};
pub use fetcher::StateFetcher;
pub use transport::Transport;
pub use types::{collection_items, ApiResponse, ClientSettings, HttpMethod, RemoteResource};

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::Value;

    use crate::error::Result;

    use super::{ApiResponse, HttpMethod, Transport};

    mockall::mock! {
        pub Transport {}

        #[async_trait::async_trait]
        impl Transport for Transport {
            async fn request(
                &self,
                method: HttpMethod,
                path: &str,
                body: Option<Value>,
            ) -> Result<ApiResponse>;
        }
    }

    /// A 200 response with the given body.
    pub fn ok(body: Value) -> Result<ApiResponse> {
        Ok(ApiResponse { status: 200, body })
    }

    /// A response with an explicit status.
    pub fn status(status: u16, body: Value) -> Result<ApiResponse> {
        Ok(ApiResponse { status, body })
    }
}
