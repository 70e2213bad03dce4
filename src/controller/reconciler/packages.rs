//! # Core Package Installation
//!
//! Applies the data plane, git server and GitOps engine bundles in fixed
//! order. A package is marked available only after every one of its
//! documents server-side-applied without error; availability may flap if
//! the cluster is damaged between passes.

use super::Reconciler;
use crate::constants;
use crate::controller::applier;
use crate::crd::{Platform, PlatformStatus};
use crate::error::Result;
use crate::observability;
use crate::packages;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Install every core package in order, recording availability
pub async fn install_core(
    ctx: &Reconciler,
    platform: &Platform,
    status: &mut PlatformStatus,
) -> Result<()> {
    for name in packages::CORE_PACKAGES {
        set_available(status, name, false);
        install_package(ctx, platform, name).await?;
        set_available(status, name, true);
        debug!("package {name} applied");
    }

    // The admin credential lives outside the bundle: rotation patches it,
    // and a re-applied bundle must not stomp the rotated password.
    ensure_git_admin_credential(ctx).await?;
    Ok(())
}

async fn install_package(ctx: &Reconciler, platform: &Platform, name: &str) -> Result<()> {
    let streams = packages::render(name, &platform.spec.build_customization)?;
    for stream in &streams {
        applier::apply_manifests(&ctx.client, &ctx.discovery, platform, stream).await?;
        observability::metrics::increment_manifests_applied();
    }
    Ok(())
}

fn set_available(status: &mut PlatformStatus, package: &str, available: bool) {
    match package {
        "cilium" => status.cilium_available = available,
        "gitea" => status.gitea_available = available,
        "argocd" => status.argocd_available = available,
        _ => {}
    }
}

/// Create the git server admin credential once, with a random initial
/// password. Never updated here: credential rotation owns later writes.
async fn ensure_git_admin_credential(ctx: &Reconciler) -> Result<()> {
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), constants::GITEA_NAMESPACE);
    if secrets
        .get_opt(constants::GITEA_CREDENTIAL_SECRET)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();

    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(constants::GITEA_CREDENTIAL_SECRET.to_string()),
            namespace: Some(constants::GITEA_NAMESPACE.to_string()),
            ..Default::default()
        },
        string_data: Some(BTreeMap::from([
            ("username".to_string(), "gitea_admin".to_string()),
            ("password".to_string(), password),
        ])),
        ..Default::default()
    };

    match secrets.create(&PostParams::default(), &secret).await {
        Ok(_) => {
            info!("created git server admin credential");
            Ok(())
        }
        Err(kube::Error::Api(resp)) if resp.code == 409 => Ok(()),
        Err(e) => Err(e.into()),
    }
}
