//! # Gateway API CRD Installation
//!
//! Applies the embedded Gateway API CRD bundle and waits for every
//! expected CRD to reach the Established condition. Kubernetes does not
//! block applies on CRD establishment, so a pass that applied Gateway
//! objects right after their CRDs would routinely fail with a no-match
//! error. After establishment the cached discovery is invalidated so the
//! applier sees the new kinds.

use super::Reconciler;
use crate::constants;
use crate::controller::applier;
use crate::crd::Platform;
use crate::error::{Error, Result};
use crate::packages::assets;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::Api;
use std::time::Instant;
use tracing::{debug, info};

/// Apply the CRD bundle, wait for establishment, reset discovery
pub async fn install(ctx: &Reconciler, platform: &Platform) -> Result<()> {
    applier::apply_manifests(&ctx.client, &ctx.discovery, platform, assets::GATEWAY_API_CRDS)
        .await?;

    wait_for_established(ctx).await?;

    // The API surface changed; downstream phases must discover the new kinds
    ctx.discovery.invalidate().await;
    Ok(())
}

/// Poll until all expected CRDs are Established=True. A Forbidden from
/// the API server aborts immediately: RBAC misconfiguration is not
/// retryable at this layer.
async fn wait_for_established(ctx: &Reconciler) -> Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(ctx.client.clone());
    let deadline = Instant::now() + constants::CRD_WAIT_TIMEOUT;

    loop {
        let mut pending = None;
        for name in constants::GATEWAY_API_CRDS {
            match crds.get_opt(name).await {
                Ok(Some(crd)) if is_established(&crd) => {}
                Ok(_) => {
                    pending = Some(name);
                    break;
                }
                Err(e) => {
                    let err = Error::from(e);
                    if err.is_forbidden() {
                        return Err(err);
                    }
                    pending = Some(name);
                    break;
                }
            }
        }

        let Some(pending) = pending else {
            info!("gateway api crds are established");
            return Ok(());
        };

        if Instant::now() >= deadline {
            return Err(Error::Timeout(format!(
                "gateway api crd {pending} to become established"
            )));
        }
        debug!("waiting for crd {pending} to become established");
        tokio::time::sleep(constants::CRD_WAIT_INTERVAL).await;
    }
}

fn is_established(crd: &CustomResourceDefinition) -> bool {
    crd.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Established" && c.status == "True")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
        CustomResourceDefinitionCondition, CustomResourceDefinitionStatus,
    };

    fn crd_with_condition(type_: &str, status: &str) -> CustomResourceDefinition {
        CustomResourceDefinition {
            status: Some(CustomResourceDefinitionStatus {
                conditions: Some(vec![CustomResourceDefinitionCondition {
                    type_: type_.to_string(),
                    status: status.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn established_true_passes() {
        assert!(is_established(&crd_with_condition("Established", "True")));
    }

    #[test]
    fn established_false_or_absent_fails() {
        assert!(!is_established(&crd_with_condition("Established", "False")));
        assert!(!is_established(&crd_with_condition("NamesAccepted", "True")));
        assert!(!is_established(&CustomResourceDefinition::default()));
    }

    #[test]
    fn bundle_contains_every_expected_crd() {
        let objects = crate::controller::applier::decode_documents(assets::GATEWAY_API_CRDS).unwrap();
        let names: Vec<_> = objects
            .iter()
            .map(|o| o.metadata.name.clone().unwrap())
            .collect();
        for expected in constants::GATEWAY_API_CRDS {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }
}
