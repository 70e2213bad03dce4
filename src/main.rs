//! # Platform Bootstrap Controller
//!
//! A Kubernetes controller that bootstraps an internal developer platform:
//! it installs and continuously reconciles the core platform packages
//! (Cilium data plane, Gateway API stack, Gitea, ArgoCD), seeds the
//! platform Git repositories, and hands ongoing application delivery to
//! the GitOps engine.
//!
//! ## Overview
//!
//! One reconciliation pass walks the bootstrap phases in strict order:
//!
//! 1. **Project namespace** - ensure the platform's working namespace
//! 2. **Gateway API CRDs** - install and wait for Established
//! 3. **Core packages** - apply data plane, git server, GitOps engine
//! 4. **Gateway resources** - routes, generated service, SDS secret alias
//! 5. **GitOps bootstrap** - seed repositories, credentials, application-set
//! 6. **Credential rotation** - optional static admin passwords
//! 7. **Convergence gate** - optional process exit once fully converged
//!
//! ## Usage
//!
//! See the [README.md](../README.md) for detailed usage instructions.

use anyhow::{Context as AnyhowContext, Result};
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::{watcher, Controller};
use platform_bootstrap_controller::controller::reconciler::{self, Reconciler};
use platform_bootstrap_controller::crd::Platform;
use platform_bootstrap_controller::{constants, observability, server};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platform_bootstrap_controller=info".into()),
        )
        .init();

    info!(
        "Starting Platform Bootstrap Controller {} (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME"),
    );
    debug!("build timestamp {}", env!("BUILD_TIMESTAMP"));

    // Initialize metrics
    observability::metrics::register_metrics()?;

    // Start the probe server; readiness flips once the controller runs
    let ready = Arc::new(AtomicBool::new(false));
    let probe_ready = Arc::clone(&ready);
    let server_port = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(constants::DEFAULT_METRICS_PORT);

    tokio::spawn(async move {
        if let Err(e) = server::serve(server_port, probe_ready).await {
            error!("probe server error: {e}");
        }
    });

    // Create Kubernetes client
    let client = Client::try_default().await?;

    // Watch Platform resources across all namespaces
    let platforms: Api<Platform> = Api::all(client.clone());

    // Create reconciler context
    let reconciler =
        Arc::new(Reconciler::new(client.clone()).context("Failed to build reconciler context")?);

    // Mark as ready
    ready.store(true, Ordering::Relaxed);

    // Run the controller. The convergence gate's shutdown latch drains the
    // controller gracefully so exit-on-sync terminates with code 0.
    Controller::new(platforms, watcher::Config::default())
        .shutdown_on_signal()
        .graceful_shutdown_on(reconciler.shutdown_signal())
        .run(
            reconciler::reconcile,
            reconciler::error_policy,
            Arc::clone(&reconciler),
        )
        .for_each(|_| std::future::ready(()))
        .await;

    info!("Controller stopped");

    Ok(())
}
