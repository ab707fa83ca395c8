//! Reconciler for converging one resource onto its desired state.
//!
//! This module drives a single reconciliation: fetch the current object,
//! compute the change-set, apply it and summarize the result. Every failure
//! ends up in the returned [`Outcome`]; nothing here returns a raw error.

use tracing::{debug, info, info_span, Instrument};

use crate::api::{ApstraClient, StateFetcher, Transport};
use crate::config::{
    ReconcileRequest, RequestValidator, ResourceSpec, TokenResolver,
};
use crate::error::{ConfigError, Result};
use crate::planner::{Applied, DiffEngine, PlanExecutor};
use crate::report::{Outcome, Reporter};
use crate::retry::{with_retry, RetryPolicy};

/// Reconciler over a transport.
pub struct Reconciler<'a, T: ?Sized> {
    /// Transport to the Apstra API.
    transport: &'a T,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Retry policy for every request.
    policy: RetryPolicy,
    /// Compute and report only; never write.
    dry_run: bool,
}

impl<'a, T: Transport + ?Sized> Reconciler<'a, T> {
    /// Creates a new reconciler with the default retry policy.
    #[must_use]
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            diff_engine: DiffEngine::new(),
            policy: RetryPolicy::default(),
            dry_run: false,
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables check mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconciles one resource.
    pub async fn reconcile(&self, spec: &ResourceSpec, reporter: &Reporter) -> Outcome {
        info!(
            "Reconciling {} '{}' (state={})",
            spec.kind, spec.display_name, spec.target_state
        );

        let current = match StateFetcher::new(self.transport, self.policy)
            .fetch(spec.kind, &spec.display_name)
            .await
        {
            Ok(current) => current,
            Err(e) => return reporter.failure(None, &e),
        };

        let change_set = self.diff_engine.compute(spec, current.as_ref());
        info!("Change-set: {change_set}");

        if self.dry_run {
            debug!("Check mode, not applying");
            let applied = Applied {
                resource: None,
                performed: !change_set.is_noop(),
            };
            return reporter.summarize(change_set, current.as_ref(), Ok(applied));
        }

        let applied = PlanExecutor::new(self.transport, self.policy)
            .apply(spec, current.as_ref(), &change_set)
            .await;

        reporter.summarize(change_set, current.as_ref(), applied)
    }
}

/// Runs a full reconciliation for a request, resolving the token from the
/// process environment.
pub async fn reconcile_request(request: &ReconcileRequest, dry_run: bool) -> Outcome {
    reconcile_request_with(request, dry_run, &TokenResolver::from_env()).await
}

/// Runs a full reconciliation for a request with an explicit token resolver.
///
/// Validates the request, resolves the token, opens a session, reconciles and
/// drops the session.
pub async fn reconcile_request_with<F>(
    request: &ReconcileRequest,
    dry_run: bool,
    resolver: &TokenResolver<F>,
) -> Outcome
where
    F: Fn(&str) -> Option<String>,
{
    let reporter = Reporter::new(request.kind.clone(), request.display_name.clone(), dry_run);
    let span = info_span!("reconcile", invocation_id = %reporter.invocation_id());

    async {
        let spec = match prepare(request) {
            Ok(spec) => spec,
            Err(e) => return reporter.failure(None, &e),
        };

        let client = match open_session(request, resolver).await {
            Ok(client) => client,
            Err(e) => return reporter.failure(None, &e),
        };

        Reconciler::new(&client)
            .with_retry_policy(request.retry_policy())
            .with_dry_run(dry_run)
            .reconcile(&spec, &reporter)
            .await
    }
    .instrument(span)
    .await
}

fn prepare(request: &ReconcileRequest) -> Result<ResourceSpec> {
    let spec = request.resource_spec()?;
    RequestValidator::new().validate(request)?;
    Ok(spec)
}

async fn open_session<F>(request: &ReconcileRequest, resolver: &TokenResolver<F>) -> Result<ApstraClient>
where
    F: Fn(&str) -> Option<String>,
{
    let settings = request.client_settings();

    let token = match resolver.resolve(request.api_token.as_ref(), request.vault_token.as_ref()) {
        Some(token) => token,
        None => match (&request.username, &request.password) {
            (Some(username), Some(password)) => {
                with_retry(&request.retry_policy(), "login", || {
                    ApstraClient::login(&settings, username, password)
                })
                .await?
            }
            _ => return Err(ConfigError::MissingToken.into()),
        },
    };

    ApstraClient::connect(settings, token)
}
