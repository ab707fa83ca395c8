//! Plan executor for applying change-sets.
//!
//! Each change-set is applied with exactly one write request. The resulting
//! server state is taken from the write response when it carries the full
//! object, and read back by id otherwise.

use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;
use tracing::{debug, info};

use crate::api::{HttpMethod, RemoteResource, StateFetcher, Transport};
use crate::config::ResourceSpec;
use crate::error::{ApstraError, ErrorKind, ReconcileError, Result, TransportError};
use crate::retry::{with_retry, RetryPolicy};

use super::plan::{Action, ChangeSet};

/// Executor for change-sets.
#[derive(Debug)]
pub struct PlanExecutor<'a, T: ?Sized> {
    /// Transport used for writes and read-backs.
    transport: &'a T,
    /// Retry policy for every request.
    policy: RetryPolicy,
}

/// What a create attempt produced.
enum Written {
    /// Body of the write response.
    Response(Value),
    /// The object turned out to exist already.
    Existing(RemoteResource),
}

/// Result of applying a change-set.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Server state after the write (`None` after a delete).
    pub resource: Option<RemoteResource>,
    /// Whether a write actually changed the server.
    pub performed: bool,
}

impl<'a, T: Transport + ?Sized> PlanExecutor<'a, T> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(transport: &'a T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Applies a change-set.
    ///
    /// `current` is the object the change-set was computed against.
    ///
    /// # Errors
    ///
    /// Returns the classified transport error, `Unavailable` when retries are
    /// exhausted, or `Vanished` when the object disappears during an update.
    pub async fn apply(
        &self,
        spec: &ResourceSpec,
        current: Option<&RemoteResource>,
        change_set: &ChangeSet,
    ) -> Result<Applied> {
        match change_set.action {
            Action::None => Ok(Applied {
                resource: current.cloned(),
                performed: false,
            }),
            Action::Create => self.create(spec).await,
            Action::Update => {
                let id = target_id(change_set, current)?;
                self.update(spec, current, id).await
            }
            Action::Delete => {
                let id = target_id(change_set, current)?;
                self.delete(spec, id).await
            }
        }
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<Applied> {
        let catalog_entry = spec.entry();
        let payload = spec.payload(None);
        let operation = format!("create {} '{}'", spec.kind, spec.display_name);
        info!("{operation}");

        // A timed-out POST may still have created the object, so every retry
        // looks it up before posting again.
        let fetcher = StateFetcher::new(self.transport, self.policy);
        let attempts = AtomicU32::new(0);
        let (attempts, fetcher, payload) = (&attempts, &fetcher, &payload);

        let written = with_retry(&self.policy, &operation, || async move {
            if attempts.fetch_add(1, Ordering::SeqCst) > 0 {
                if let Some(existing) = fetcher.fetch(spec.kind, &spec.display_name).await? {
                    debug!(
                        "{} '{}' exists after a failed attempt, adopting {}",
                        spec.kind, spec.display_name, existing.id
                    );
                    return Ok(Written::Existing(existing));
                }
            }
            self.transport
                .request(HttpMethod::Post, catalog_entry.path, Some(payload.clone()))
                .await
                .map(|response| Written::Response(response.body))
        })
        .await?;

        let resource = match written {
            Written::Existing(existing) => existing,
            Written::Response(body) => self
                .resolve_written(spec, body, None)
                .await?
                .ok_or_else(|| {
                    TransportError::invalid_response(format!(
                        "created {} '{}' could not be read back",
                        spec.kind, spec.display_name
                    ))
                })?,
        };

        debug!("Created {} '{}' as {}", spec.kind, spec.display_name, resource.id);
        Ok(Applied {
            resource: Some(resource),
            performed: true,
        })
    }

    async fn update(
        &self,
        spec: &ResourceSpec,
        current: Option<&RemoteResource>,
        id: &str,
    ) -> Result<Applied> {
        let catalog_entry = spec.entry();
        let payload = spec.payload(current);
        let path = catalog_entry.item_path(id);
        let operation = format!("update {} '{}'", spec.kind, spec.display_name);
        info!("{operation}");

        let response = with_retry(&self.policy, &operation, || {
            self.transport
                .request(catalog_entry.update_method, &path, Some(payload.clone()))
        })
        .await
        .map_err(|e| vanished_if_not_found(e, spec))?;

        let resource = self
            .resolve_written(spec, response.body, Some(id))
            .await?
            .ok_or_else(|| vanished(spec))?;

        Ok(Applied {
            resource: Some(resource),
            performed: true,
        })
    }

    async fn delete(&self, spec: &ResourceSpec, id: &str) -> Result<Applied> {
        let path = spec.entry().item_path(id);
        let operation = format!("delete {} '{}'", spec.kind, spec.display_name);
        info!("{operation}");

        let result = with_retry(&self.policy, &operation, || {
            self.transport.request(HttpMethod::Delete, &path, None)
        })
        .await;

        match result {
            Ok(_) => Ok(Applied {
                resource: None,
                performed: true,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} '{}' was already gone", spec.kind, spec.display_name);
                Ok(Applied {
                    resource: None,
                    performed: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Determines the server state after a write.
    async fn resolve_written(
        &self,
        spec: &ResourceSpec,
        body: Value,
        known_id: Option<&str>,
    ) -> Result<Option<RemoteResource>> {
        let identity_field = spec.entry().identity_field;
        let complete = body.get("id").is_some_and(Value::is_string)
            && body.get(identity_field).is_some();

        if complete {
            return RemoteResource::from_item(spec.kind, body).map(Some);
        }

        let id = body
            .get("id")
            .and_then(Value::as_str)
            .or(known_id)
            .map(String::from)
            .ok_or_else(|| {
                TransportError::invalid_response(format!(
                    "write response for {} '{}' carries no id",
                    spec.kind, spec.display_name
                ))
            })?;

        debug!("Reading back {} {id}", spec.kind);
        StateFetcher::new(self.transport, self.policy)
            .fetch_by_id(spec.kind, &id)
            .await
    }
}

fn target_id<'c>(change_set: &'c ChangeSet, current: Option<&'c RemoteResource>) -> Result<&'c str> {
    change_set
        .resource_id
        .as_deref()
        .or_else(|| current.map(|c| c.id.as_str()))
        .ok_or_else(|| ApstraError::internal(format!("{} without a target id", change_set.action)))
}

fn vanished(spec: &ResourceSpec) -> ApstraError {
    ReconcileError::Vanished {
        kind: spec.kind.to_string(),
        display_name: spec.display_name.clone(),
    }
    .into()
}

fn vanished_if_not_found(error: ApstraError, spec: &ResourceSpec) -> ApstraError {
    if error.kind() == ErrorKind::NotFound {
        vanished(spec)
    } else {
        error
    }
}
