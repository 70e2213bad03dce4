//! # Reconciliation Logic
//!
//! Main reconciliation loop for Platform resources.
//!
//! One pass runs the bootstrap phases in strict order:
//!
//! 1. Project namespace
//! 2. Gateway API CRDs (install, wait for Established)
//! 3. Core packages (data plane, git server, GitOps engine)
//! 4. Gateway resources and the SDS secret alias
//! 5. GitOps bootstrap (seed repositories, credentials, application-set)
//! 6. Credential rotation (when enabled)
//! 7. Convergence gate (when exit-on-sync is enabled)
//!
//! Any phase may fail softly; `error_policy` requeues the pass shortly
//! after. A once-set shutdown latch makes all subsequent reconciles
//! short-circuit while the process drains.

mod convergence;
mod gateway;
mod gateway_crds;
pub mod gitops;
mod namespace;
mod packages;
mod rotation;

use crate::constants;
use crate::controller::applier::DiscoveryCache;
use crate::crd::{Platform, PlatformStatus};
use crate::error::{Error, Result};
use crate::observability;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, warn};

/// Shared reconciler context, one per controller process
pub struct Reconciler {
    /// Kubernetes client
    pub client: Client,
    /// Shared HTTP client for the Gitea and ArgoCD admin APIs
    pub http: reqwest::Client,
    /// Cached API discovery used by the manifest applier
    pub discovery: DiscoveryCache,
    /// Per-repository locks guarding seed repository scratch directories
    repo_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Write-once shutdown latch for exit-on-sync
    shutdown: AtomicBool,
    shutdown_notify: Arc<tokio::sync::Notify>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(client: Client) -> Result<Self> {
        // Local development terminates TLS with a self-signed platform
        // certificate; production uses the system trust store.
        let local_dev = std::env::var(constants::LOCAL_DEV_ENV)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(local_dev)
            .build()?;

        Ok(Self {
            client,
            http,
            discovery: DiscoveryCache::default(),
            repo_locks: Mutex::new(HashMap::new()),
            shutdown: AtomicBool::new(false),
            shutdown_notify: Arc::new(tokio::sync::Notify::new()),
        })
    }

    /// Lock guarding all filesystem and git work for one seed repository
    pub fn repo_lock(&self, repository: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.repo_locks.lock().expect("repo lock map poisoned");
        Arc::clone(
            locks
                .entry(repository.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// True once the convergence gate has requested process shutdown
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Flip the shutdown latch and wake the controller's shutdown future.
    /// `notify_one` stores a permit, so the wakeup is not lost if the
    /// shutdown future has not been polled yet.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_one();
    }

    /// Future resolving when shutdown has been requested; handed to the
    /// controller's graceful shutdown trigger
    pub fn shutdown_signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let notify = Arc::clone(&self.shutdown_notify);
        let already = self.shutdown_requested();
        async move {
            if !already {
                notify.notified().await;
            }
        }
    }
}

/// Outcome of one full pass through the phases
enum PassOutcome {
    /// All phases ran; keep the loop live for drift correction
    Complete,
    /// A phase asked for an explicit requeue
    Requeue(Action),
    /// Exit-on-sync predicate satisfied; terminate the process
    Converged,
}

/// Main reconciliation function. Soft errors are handled by
/// `error_policy`; only the terminal shutdown latch short-circuits here.
pub async fn reconcile(platform: Arc<Platform>, ctx: Arc<Reconciler>) -> Result<Action, Error> {
    if ctx.shutdown_requested() {
        return Ok(Action::await_change());
    }

    let start = Instant::now();
    let name = platform.name_any();
    let Some(namespace) = platform.namespace() else {
        warn!("platform {name} has no namespace, skipping");
        return Ok(Action::await_change());
    };

    // Re-fetch the spec: the watch cache can lag behind CLI edits, and a
    // deleted Platform must end the loop without a requeue.
    let api: Api<Platform> = Api::namespaced(ctx.client.clone(), &namespace);
    let Some(platform) = api.get_opt(&name).await? else {
        info!("platform {namespace}/{name} is gone, nothing to reconcile");
        return Ok(Action::await_change());
    };

    let span = tracing::span!(
        tracing::Level::INFO,
        "reconcile",
        resource.name = %name,
        resource.namespace = %namespace,
    );
    let _guard = span.enter();

    info!("reconciling platform {namespace}/{name}");
    observability::metrics::increment_reconciliations();

    let mut status = platform.status.clone().unwrap_or_default();
    let outcome = run_phases(&ctx, &platform, &mut status).await;

    // Status reflects this pass whether it succeeded or not
    status.observed_generation = platform.metadata.generation;
    if let Err(e) = update_status(&api, &name, &status).await {
        warn!("failed to update platform status: {e}");
    }

    observability::metrics::observe_reconcile_duration(start.elapsed().as_secs_f64());

    match outcome {
        Ok(PassOutcome::Complete) => Ok(Action::requeue(constants::DEFAULT_REQUEUE)),
        Ok(PassOutcome::Requeue(action)) => Ok(action),
        Ok(PassOutcome::Converged) => {
            info!("platform {namespace}/{name} converged, shutting down");
            ctx.request_shutdown();
            Ok(Action::await_change())
        }
        Err(e) => Err(e),
    }
}

async fn run_phases(
    ctx: &Reconciler,
    platform: &Platform,
    status: &mut PlatformStatus,
) -> Result<PassOutcome> {
    namespace::ensure(ctx, platform)
        .await
        .map_err(|e| phase_error("project namespace", e))?;

    gateway_crds::install(ctx, platform)
        .await
        .map_err(|e| phase_error("gateway api crds", e))?;

    packages::install_core(ctx, platform, status)
        .await
        .map_err(|e| phase_error("core packages", e))?;

    if let Some(action) = gateway::install(ctx, platform, status)
        .await
        .map_err(|e| phase_error("gateway resources", e))?
    {
        return Ok(PassOutcome::Requeue(action));
    }

    if status.git_repositories_created {
        // Write-once latch: repositories are externally owned after
        // bootstrap and never re-seeded.
        tracing::debug!("seed repositories already created, skipping gitops bootstrap");
    } else {
        gitops::bootstrap(ctx, platform)
            .await
            .map_err(|e| phase_error("gitops bootstrap", e))?;
        status.git_repositories_created = true;
    }

    if platform.spec.static_password_enabled {
        rotation::rotate(ctx, platform)
            .await
            .map_err(|e| phase_error("credential rotation", e))?;
    }

    if platform.spec.exit_on_sync {
        if convergence::converged(ctx, platform, status)
            .await
            .map_err(|e| phase_error("convergence gate", e))?
        {
            convergence::refresh_gitops(ctx)
                .await
                .map_err(|e| phase_error("convergence gate", e))?;
            return Ok(PassOutcome::Converged);
        }
        return Ok(PassOutcome::Requeue(Action::requeue(constants::SYNC_REQUEUE)));
    }

    Ok(PassOutcome::Complete)
}

/// Wrap a phase failure with the phase name for the driver's log line
fn phase_error(phase: &'static str, err: Error) -> Error {
    Error::Other(anyhow::Error::new(err).context(format!("{phase} phase failed")))
}

async fn update_status(api: &Api<Platform>, name: &str, status: &PlatformStatus) -> Result<()> {
    api.patch_status(
        name,
        &PatchParams::default(),
        &Patch::Merge(json!({ "status": status })),
    )
    .await?;
    Ok(())
}

/// Requeue policy for reconcile errors: log, count, retry. Transient
/// cluster conditions retry tightly since they dominate during bootstrap;
/// configuration errors back off, a quick retry cannot fix them.
pub fn error_policy(platform: Arc<Platform>, error: &Error, _ctx: Arc<Reconciler>) -> Action {
    error!(
        "reconciliation of platform {} failed: {error:#}",
        platform.name_any()
    );
    observability::metrics::increment_reconciliation_errors();
    if error.is_config() {
        Action::requeue(constants::CONFIG_ERR_REQUEUE)
    } else {
        Action::requeue(constants::ERR_REQUEUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> Reconciler {
        // Building a client from a static config performs no IO; these
        // tests only exercise process-local state.
        let config = kube::Config::new(http::Uri::from_static("http://127.0.0.1:8080"));
        let client = Client::try_from(config).expect("client from static config");
        Reconciler::new(client).expect("reconciler context")
    }

    #[tokio::test]
    async fn repo_locks_are_stable_per_repository() {
        let ctx = reconciler();
        let a = ctx.repo_lock("platform-packages");
        let b = ctx.repo_lock("platform-packages");
        let c = ctx.repo_lock("platform-environments");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn shutdown_latch_is_write_once() {
        let ctx = reconciler();
        assert!(!ctx.shutdown_requested());
        ctx.request_shutdown();
        assert!(ctx.shutdown_requested());
        ctx.request_shutdown();
        assert!(ctx.shutdown_requested());
    }

    #[tokio::test]
    async fn shutdown_signal_resolves_after_request() {
        let ctx = reconciler();
        let signal = ctx.shutdown_signal();
        ctx.request_shutdown();
        // Latch already set when the future was created after the request
        tokio::time::timeout(std::time::Duration::from_secs(1), ctx.shutdown_signal())
            .await
            .expect("signal should resolve immediately once latched");
        drop(signal);
    }
}
