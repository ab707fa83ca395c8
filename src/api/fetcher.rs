//! State fetcher for Apstra objects.
//!
//! Resolves the object carrying a requested identity. A missing object is a
//! normal result (`None`), never an error.

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{entry, CatalogEntry, ResourceKind};
use crate::error::{ErrorKind, ReconcileError, Result};
use crate::retry::{with_retry, RetryPolicy};

use super::transport::Transport;
use super::types::{collection_items, HttpMethod, RemoteResource};

/// Reads current state through a transport.
#[derive(Debug)]
pub struct StateFetcher<'a, T: ?Sized> {
    transport: &'a T,
    policy: RetryPolicy,
}

impl<'a, T: Transport + ?Sized> StateFetcher<'a, T> {
    /// Creates a fetcher over a transport.
    #[must_use]
    pub const fn new(transport: &'a T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Lists every object of a kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or an item has no `id`.
    pub async fn list(&self, kind: ResourceKind) -> Result<Vec<RemoteResource>> {
        let catalog_entry = entry(kind);
        let operation = format!("list {kind}");

        let response = with_retry(&self.policy, &operation, || {
            self.transport
                .request(HttpMethod::Get, catalog_entry.path, None)
        })
        .await?;

        let resources = collection_items(response.body)?
            .into_iter()
            .map(|item| RemoteResource::from_item(kind, item))
            .collect::<Result<Vec<_>>>()?;

        debug!("Found {} {kind} objects", resources.len());
        Ok(resources)
    }

    /// Finds the object of `kind` whose identity field equals `display_name`.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousIdentity` if more than one object matches, or the
    /// underlying transport error.
    pub async fn fetch(
        &self,
        kind: ResourceKind,
        display_name: &str,
    ) -> Result<Option<RemoteResource>> {
        let catalog_entry = entry(kind);
        info!("Fetching {kind} '{display_name}'");

        let listed = match self.list(kind).await {
            Ok(listed) => listed,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{kind} collection not found, treating '{display_name}' as absent");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let mut matches: Vec<RemoteResource> = listed
            .into_iter()
            .filter(|resource| identity_matches(catalog_entry, resource, display_name))
            .collect();

        match matches.len() {
            0 => {
                debug!("{kind} '{display_name}' does not exist");
                Ok(None)
            }
            1 => Ok(matches.pop()),
            count => Err(ReconcileError::AmbiguousIdentity {
                kind: kind.to_string(),
                identity_field: catalog_entry.identity_field.to_string(),
                display_name: display_name.to_string(),
                count,
            }
            .into()),
        }
    }

    /// Reads one object by its backend id.
    ///
    /// # Errors
    ///
    /// Returns the underlying transport error; a 404 yields `Ok(None)`.
    pub async fn fetch_by_id(&self, kind: ResourceKind, id: &str) -> Result<Option<RemoteResource>> {
        let path = entry(kind).item_path(id);
        let operation = format!("read {kind} {id}");

        let result = with_retry(&self.policy, &operation, || {
            self.transport.request(HttpMethod::Get, &path, None)
        })
        .await;

        match result {
            Ok(response) => RemoteResource::from_item(kind, response.body).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn identity_matches(catalog_entry: &CatalogEntry, resource: &RemoteResource, display_name: &str) -> bool {
    match resource.attributes.get(catalog_entry.identity_field) {
        Some(Value::String(value)) => value == display_name,
        _ => false,
    }
}
