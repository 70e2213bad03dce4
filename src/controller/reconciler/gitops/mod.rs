//! # GitOps Bootstrap
//!
//! Brings the in-cluster git server to a state where the seed
//! repositories exist with a known snapshot of platform content and the
//! GitOps engine holds the credentials to clone them. The required
//! ordering (git server ready, repositories created, repositories
//! populated, engine credential registered, application-set applied) is
//! enforced inside this one phase; splitting it across passes would force
//! the engine to tolerate pointing at an empty repository.
//!
//! The whole phase is latched behind the status `gitRepositoriesCreated`
//! flag. A failure after repository creation but before population leaves
//! the latch unset, so the next pass re-populates over the possibly-empty
//! repository; population replaces content wholesale and is idempotent.

mod credentials;
mod populate;
mod readiness;

use super::Reconciler;
use crate::constants;
use crate::crd::Platform;
use crate::error::{Error, Result};
use crate::gitea::GiteaClient;
use crate::packages;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use tracing::info;

/// Run the full bootstrap sequence once
pub async fn bootstrap(ctx: &Reconciler, platform: &Platform) -> Result<()> {
    readiness::wait_for_git_server(ctx).await?;

    let (username, password) = read_admin_credentials(ctx).await?;
    let gitea = GiteaClient::new(
        ctx.http.clone(),
        GiteaClient::external_url(&platform.spec.build_customization),
        username,
        password,
    );

    for repository in &packages::SEED_REPOSITORIES {
        gitea.ensure_repository(repository.name).await?;
    }
    for repository in &packages::SEED_REPOSITORIES {
        populate::populate(ctx, &gitea, repository).await?;
    }

    credentials::register(ctx, platform, &gitea).await?;
    credentials::apply_application_set(ctx, platform, &gitea).await?;

    info!("gitops bootstrap complete");
    Ok(())
}

/// Read the git server admin credentials from the cluster
async fn read_admin_credentials(ctx: &Reconciler) -> Result<(String, String)> {
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
    let password = secret_string_value(&secret, "password")?;
    Ok((username, password))
}

/// Decode one key of a Secret as UTF-8
pub(crate) fn secret_string_value(secret: &Secret, key: &'static str) -> Result<String> {
    let name = secret.metadata.name.clone().unwrap_or_default();
    let value = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .ok_or(Error::MissingCredentialKey {
            secret: name.clone(),
            key,
        })?;
    String::from_utf8(value.0.clone())
        .map_err(|_| Error::MissingCredentialKey { secret: name, key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret_with(key: &str, value: &[u8]) -> Secret {
        Secret {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some("gitea-credential".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                key.to_string(),
                ByteString(value.to_vec()),
            )])),
            ..Default::default()
        }
    }

    #[test]
    fn secret_value_decodes_utf8() {
        let secret = secret_with("password", b"hunter2");
        assert_eq!(secret_string_value(&secret, "password").unwrap(), "hunter2");
    }

    #[test]
    fn missing_key_is_an_integrity_error() {
        let secret = secret_with("username", b"gitea_admin");
        let err = secret_string_value(&secret, "password").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingCredentialKey { key: "password", .. }
        ));
    }

    #[test]
    fn non_utf8_value_is_an_integrity_error() {
        let secret = secret_with("password", &[0xff, 0xfe]);
        assert!(secret_string_value(&secret, "password").is_err());
    }
}
