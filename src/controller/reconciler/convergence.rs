//! # Convergence Gate
//!
//! Composite predicate behind exit-on-sync: the CLI marker annotation
//! (when rotation is enabled), the repository latch, ready replicas on
//! every core-package workload, and the generated data plane service.
//! When satisfied, every GitOps application and application-set gets a
//! refresh request before the shutdown latch flips.

use super::{gateway, Reconciler};
use crate::constants;
use crate::crd::{Platform, PlatformStatus};
use crate::error::Result;
use crate::packages::{self, WorkloadKind};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, ApiResource, DynamicObject, ListParams, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::ResourceExt;
use serde_json::json;
use tracing::{debug, info};

/// Evaluate the composite convergence predicate
pub async fn converged(
    ctx: &Reconciler,
    platform: &Platform,
    status: &PlatformStatus,
) -> Result<bool> {
    // The CLI stamps its start time once it has observed this cycle;
    // rotating passwords before that would strand the operator
    if platform.spec.static_password_enabled
        && !platform
            .annotations()
            .contains_key(constants::CLI_START_TIME_ANNOTATION)
    {
        debug!("cli start-time annotation missing, not converged");
        return Ok(false);
    }

    if !status.git_repositories_created {
        debug!("seed repositories not created yet, not converged");
        return Ok(false);
    }

    for package in packages::CORE_PACKAGES {
        let descriptor = packages::descriptor(package)?;
        for workload in descriptor.workloads {
            if !workload_ready(ctx, workload).await? {
                debug!(
                    "workload {}/{} of package {package} not ready, not converged",
                    workload.namespace, workload.name
                );
                return Ok(false);
            }
        }
    }

    let namespace = platform.namespace().unwrap_or_default();
    let services: Api<Service> = Api::namespaced(ctx.client.clone(), &namespace);
    if services
        .get_opt(&gateway::dataplane_service_name())
        .await?
        .is_none()
    {
        debug!("data plane gateway service missing, not converged");
        return Ok(false);
    }

    Ok(true)
}

async fn workload_ready(ctx: &Reconciler, workload: &packages::Workload) -> Result<bool> {
    match workload.kind {
        WorkloadKind::Deployment => {
            let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), workload.namespace);
            Ok(api.get_opt(workload.name).await?.is_some_and(|d| {
                d.status.as_ref().is_some_and(|s| {
                    replicas_ready(s.ready_replicas, s.available_replicas)
                })
            }))
        }
        WorkloadKind::StatefulSet => {
            let api: Api<StatefulSet> = Api::namespaced(ctx.client.clone(), workload.namespace);
            Ok(api.get_opt(workload.name).await?.is_some_and(|s| {
                s.status.as_ref().is_some_and(|s| {
                    replicas_ready(s.ready_replicas, s.available_replicas)
                })
            }))
        }
    }
}

/// Both counters must report at least one replica
pub fn replicas_ready(ready: Option<i32>, available: Option<i32>) -> bool {
    ready.unwrap_or(0) >= 1 && available.unwrap_or(0) >= 1
}

/// Ask the engine to refresh every application and application-set so the
/// final state is current before the process exits. Applications owned by
/// an application-set are skipped; refreshing the set covers them.
pub async fn refresh_gitops(ctx: &Reconciler) -> Result<()> {
    let applications = ApiResource::from_gvk(&GroupVersionKind::gvk(
        "argoproj.io",
        "v1alpha1",
        "Application",
    ));
    let api: Api<DynamicObject> = Api::namespaced_with(
        ctx.client.clone(),
        constants::ARGOCD_NAMESPACE,
        &applications,
    );
    let mut annotations = serde_json::Map::new();
    annotations.insert(
        constants::ARGOCD_REFRESH_ANNOTATION.to_string(),
        serde_json::Value::String("normal".to_string()),
    );
    let refresh = json!({ "metadata": { "annotations": annotations } });
    for application in api.list(&ListParams::default()).await? {
        if owned_by_application_set(&application) {
            continue;
        }
        api.patch(
            &application.name_any(),
            &PatchParams::default(),
            &Patch::Merge(&refresh),
        )
        .await?;
    }

    let application_sets = ApiResource::from_gvk(&GroupVersionKind::gvk(
        "argoproj.io",
        "v1alpha1",
        "ApplicationSet",
    ));
    let api: Api<DynamicObject> = Api::namespaced_with(
        ctx.client.clone(),
        constants::ARGOCD_NAMESPACE,
        &application_sets,
    );
    let mut annotations = serde_json::Map::new();
    annotations.insert(
        constants::ARGOCD_APPSET_REFRESH_ANNOTATION.to_string(),
        serde_json::Value::String("true".to_string()),
    );
    let refresh = json!({ "metadata": { "annotations": annotations } });
    for set in api.list(&ListParams::default()).await? {
        api.patch(
            &set.name_any(),
            &PatchParams::default(),
            &Patch::Merge(&refresh),
        )
        .await?;
    }

    info!("requested refresh on gitops applications and application-sets");
    Ok(())
}

/// True when the object carries an owner reference to an ApplicationSet
pub fn owned_by_application_set(object: &DynamicObject) -> bool {
    object
        .metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.kind == "ApplicationSet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    #[test]
    fn replica_counts_gate_on_both_fields() {
        assert!(replicas_ready(Some(1), Some(1)));
        assert!(replicas_ready(Some(2), Some(1)));
        assert!(!replicas_ready(Some(1), None));
        assert!(!replicas_ready(None, Some(1)));
        assert!(!replicas_ready(Some(0), Some(0)));
    }

    #[test]
    fn application_set_ownership_is_detected() {
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(
            "argoproj.io",
            "v1alpha1",
            "Application",
        ));
        let mut object = DynamicObject::new("app", &resource);
        assert!(!owned_by_application_set(&object));

        object.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "argoproj.io/v1alpha1".to_string(),
            kind: "ApplicationSet".to_string(),
            name: "platform".to_string(),
            uid: "123".to_string(),
            ..Default::default()
        }]);
        assert!(owned_by_application_set(&object));
    }
}
