//! # Git Server Readiness
//!
//! Four-step gate that must pass before any repository operation:
//! deployment replicas, pod readiness, a dependency yield for the
//! relational DB and cache, and an API warmup pause. Failing any step is
//! a soft error; the reconciler retries the whole phase.

use super::Reconciler;
use crate::constants;
use crate::error::{Error, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use std::time::Instant;
use tracing::{debug, info};

pub async fn wait_for_git_server(ctx: &Reconciler) -> Result<()> {
    wait_for_deployment(ctx).await?;
    wait_for_pods(ctx).await?;

    // The server's DB and cache come up alongside it; give them a moment
    // before hammering the API
    debug!("yielding for git server dependencies");
    tokio::time::sleep(constants::GIT_SERVER_DEPENDENCY_YIELD).await;

    debug!("waiting out git server api warmup");
    tokio::time::sleep(constants::GIT_SERVER_API_WARMUP).await;

    info!("git server is ready");
    Ok(())
}

async fn wait_for_deployment(ctx: &Reconciler) -> Result<()> {
    let deployments: Api<Deployment> =
        Api::namespaced(ctx.client.clone(), constants::GITEA_NAMESPACE);
    let deadline = Instant::now() + constants::GIT_SERVER_DEPLOYMENT_TIMEOUT;

    loop {
        match deployments.get_opt(constants::GITEA_DEPLOYMENT).await? {
            Some(deployment) if deployment_ready(&deployment) => return Ok(()),
            _ => {}
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout(format!(
                "git server deployment {}/{} to become ready",
                constants::GITEA_NAMESPACE,
                constants::GITEA_DEPLOYMENT
            )));
        }
        debug!("git server deployment not ready yet");
        tokio::time::sleep(constants::GIT_SERVER_DEPLOYMENT_INTERVAL).await;
    }
}

async fn wait_for_pods(ctx: &Reconciler) -> Result<()> {
    let pods: Api<Pod> = Api::namespaced(ctx.client.clone(), constants::GITEA_NAMESPACE);
    let params = ListParams::default().labels(constants::GITEA_POD_SELECTOR);
    let deadline = Instant::now() + constants::GIT_SERVER_POD_TIMEOUT;

    loop {
        let list = pods.list(&params).await?;
        if !list.items.is_empty() && list.items.iter().all(pod_ready) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout(format!(
                "git server pods ({}) to become ready",
                constants::GITEA_POD_SELECTOR
            )));
        }
        debug!("git server pods not ready yet");
        tokio::time::sleep(constants::GIT_SERVER_POD_INTERVAL).await;
    }
}

fn deployment_ready(deployment: &Deployment) -> bool {
    deployment.status.as_ref().is_some_and(|status| {
        status.ready_replicas.unwrap_or(0) > 0 && status.available_replicas.unwrap_or(0) > 0
    })
}

fn pod_ready(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    let running = status.phase.as_deref() == Some("Running");
    let ready = status
        .conditions
        .as_ref()
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });
    running && ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use k8s_openapi::api::core::v1::{PodCondition, PodStatus};

    fn deployment(ready: Option<i32>, available: Option<i32>) -> Deployment {
        Deployment {
            status: Some(DeploymentStatus {
                ready_replicas: ready,
                available_replicas: available,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn pod(phase: &str, ready: &str) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: ready.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn deployment_needs_ready_and_available_replicas() {
        assert!(deployment_ready(&deployment(Some(1), Some(1))));
        assert!(!deployment_ready(&deployment(Some(1), None)));
        assert!(!deployment_ready(&deployment(Some(0), Some(1))));
        assert!(!deployment_ready(&Deployment::default()));
    }

    #[test]
    fn pod_needs_running_phase_and_ready_condition() {
        assert!(pod_ready(&pod("Running", "True")));
        assert!(!pod_ready(&pod("Pending", "True")));
        assert!(!pod_ready(&pod("Running", "False")));
        assert!(!pod_ready(&Pod::default()));
    }
}
