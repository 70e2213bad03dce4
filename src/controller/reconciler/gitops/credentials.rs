//! # Engine Credential Registration
//!
//! Gives the GitOps engine everything it needs to clone the seed
//! repositories: a repository-credential record referencing the git
//! server admin credentials, a stable in-cluster endpoint so clones
//! resolve by DNS even when the server's pod IPs change, and the
//! platform-wide application-set that expands into one application per
//! path of the packages repository.

use super::Reconciler;
use crate::constants;
use crate::controller::applier;
use crate::crd::Platform;
use crate::error::Result;
use crate::gitea::GiteaClient;
use crate::packages::assets;
use tera::Tera;
use tracing::info;

/// Apply the repository-credential and stable-endpoint bundle into the
/// engine's namespace
pub async fn register(ctx: &Reconciler, platform: &Platform, gitea: &GiteaClient) -> Result<()> {
    let mut context = tera::Context::new();
    context.insert(
        "repo_url_prefix",
        &format!("{}/{}", constants::GITEA_INTERNAL_URL, gitea.username()),
    );
    context.insert("gitea_username", gitea.username());
    context.insert("gitea_password", gitea.password());

    let yaml = Tera::one_off(assets::GITOPS_REPO_CREDENTIALS, &context, false)?;
    applier::apply_manifests(&ctx.client, &ctx.discovery, platform, &yaml).await?;

    info!("registered repository credentials with the gitops engine");
    Ok(())
}

/// Apply the platform application-set. From here on the engine owns
/// per-package installs.
pub async fn apply_application_set(
    ctx: &Reconciler,
    platform: &Platform,
    gitea: &GiteaClient,
) -> Result<()> {
    let mut context = tera::Context::new();
    context.insert(
        "packages_repo_url",
        &gitea.internal_clone_url("platform-packages"),
    );

    let yaml = Tera::one_off(assets::GITOPS_APPSET, &context, false)?;
    applier::apply_manifests(&ctx.client, &ctx.discovery, platform, &yaml).await?;

    info!("applied platform application-set");
    Ok(())
}
