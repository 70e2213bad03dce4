//! # Credential Rotation
//!
//! Rotates the GitOps engine and git server admin passwords to the
//! canonical static development password via their HTTP APIs, then
//! patches the in-cluster credential records to match.
//!
//! Each service is all-or-nothing within a pass: if the password changed
//! but the secret patch failed, the next pass's equality check sees the
//! rotated password in the API but not the secret, re-verifies against
//! the service and re-patches.

use super::gitops::secret_string_value;
use super::Reconciler;
use crate::argocd::ArgoCdClient;
use crate::constants;
use crate::crd::Platform;
use crate::error::Result;
use crate::gitea::GiteaClient;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use serde_json::json;
use tracing::{debug, info};

/// Rotate both admin credentials to the canonical static password
pub async fn rotate(ctx: &Reconciler, platform: &Platform) -> Result<()> {
    rotate_argocd(ctx, platform).await?;
    rotate_gitea(ctx, platform).await?;
    Ok(())
}

async fn rotate_argocd(ctx: &Reconciler, platform: &Platform) -> Result<()> {
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), constants::ARGOCD_NAMESPACE);
    let secret = secrets
        .get_opt(constants::ARGOCD_ADMIN_SECRET)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "credential secret {}/{} not found",
                constants::ARGOCD_NAMESPACE,
                constants::ARGOCD_ADMIN_SECRET
            )
        })?;
    let current = secret_string_value(&secret, "password")?;

    if current == constants::STATIC_ADMIN_PASSWORD {
        debug!("argocd admin password already rotated");
        return Ok(());
    }

    let argocd = ArgoCdClient::new(
        ctx.http.clone(),
        ArgoCdClient::external_url(&platform.spec.build_customization),
    );
    let token = argocd.login(&current).await?;
    argocd
        .change_admin_password(&token, &current, constants::STATIC_ADMIN_PASSWORD)
        .await?;
    // Verify before recording: a password the service does not accept
    // must never land in the secret
    argocd.login(constants::STATIC_ADMIN_PASSWORD).await?;

    patch_password(&secrets, constants::ARGOCD_ADMIN_SECRET).await?;
    info!("rotated argocd admin credential");
    Ok(())
}

async fn rotate_gitea(ctx: &Reconciler, platform: &Platform) -> Result<()> {
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), constants::GITEA_NAMESPACE);
    let secret = secrets
        .get_opt(constants::GITEA_CREDENTIAL_SECRET)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "credential secret {}/{} not found",
                constants::GITEA_NAMESPACE,
                constants::GITEA_CREDENTIAL_SECRET
            )
        })?;
    let username = secret_string_value(&secret, "username")?;
    let current = secret_string_value(&secret, "password")?;

    if current == constants::STATIC_ADMIN_PASSWORD {
        debug!("gitea admin password already rotated");
        return Ok(());
    }

    let gitea = GiteaClient::new(
        ctx.http.clone(),
        GiteaClient::external_url(&platform.spec.build_customization),
        username,
        current.clone(),
    );
    gitea.verify_password(&current).await?;
    gitea
        .change_admin_password(&current, constants::STATIC_ADMIN_PASSWORD)
        .await?;
    gitea
        .verify_password(constants::STATIC_ADMIN_PASSWORD)
        .await?;

    patch_password(&secrets, constants::GITEA_CREDENTIAL_SECRET).await?;
    info!("rotated gitea admin credential");
    Ok(())
}

async fn patch_password(secrets: &Api<Secret>, name: &str) -> Result<()> {
    secrets
        .patch(
            name,
            &PatchParams::default(),
            &Patch::Merge(json!({
                "stringData": { "password": constants::STATIC_ADMIN_PASSWORD }
            })),
        )
        .await?;
    Ok(())
}
