//! # Gateway Resource Installation
//!
//! Applies the GatewayClass/Gateway/HTTPRoute bundle, waits for the data
//! plane's generated Service, and ensures the SDS secret alias.
//!
//! The data plane's secret discovery looks certificates up under a
//! namespace-prefixed key that does not match the original secret name;
//! without the alias every HTTPS handshake resets.

use super::Reconciler;
use crate::constants;
use crate::controller::applier;
use crate::crd::{Platform, PlatformStatus};
use crate::error::Result;
use crate::packages;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::{debug, info};

/// Apply gateway resources; requeue while the data plane service is
/// still being generated
pub async fn install(
    ctx: &Reconciler,
    platform: &Platform,
    status: &mut PlatformStatus,
) -> Result<Option<Action>> {
    status.gateway_available = false;
    let streams = packages::render(packages::GATEWAY_PACKAGE, &platform.spec.build_customization)?;
    for stream in &streams {
        applier::apply_manifests(&ctx.client, &ctx.discovery, platform, stream).await?;
    }
    status.gateway_available = true;

    let namespace = platform.namespace().unwrap_or_default();
    let service_name = dataplane_service_name();
    let services: Api<Service> = Api::namespaced(ctx.client.clone(), &namespace);
    if services.get_opt(&service_name).await?.is_none() {
        info!("data plane service {service_name} not generated yet, requeueing");
        return Ok(Some(Action::requeue(constants::ERR_REQUEUE)));
    }

    ensure_tls_alias(ctx, &namespace).await?;
    Ok(None)
}

/// Name of the Service the data plane generates for the platform Gateway
pub fn dataplane_service_name() -> String {
    format!(
        "{}-{}",
        constants::DATAPLANE_SERVICE_PREFIX,
        constants::GATEWAY_NAME
    )
}

/// Name of the alias the data plane's SDS lookup expects
pub fn tls_alias_name(namespace: &str, source: &str) -> String {
    format!("{namespace}-{source}")
}

/// Create the SDS alias when absent: same type, byte-identical data, no
/// owner reference so it outlives owner churn. Once created the alias is
/// never updated, even if the source secret mutates.
async fn ensure_tls_alias(ctx: &Reconciler, namespace: &str) -> Result<()> {
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), namespace);
    let alias_name = tls_alias_name(namespace, constants::TLS_SECRET_NAME);

    if secrets.get_opt(&alias_name).await?.is_some() {
        debug!("tls alias {alias_name} already exists");
        return Ok(());
    }

    let source = secrets
        .get_opt(constants::TLS_SECRET_NAME)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "tls secret {}/{} not found, cannot create sds alias",
                namespace,
                constants::TLS_SECRET_NAME
            )
        })?;

    let alias = Secret {
        metadata: ObjectMeta {
            name: Some(alias_name.clone()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: source.type_.clone(),
        data: source.data.clone(),
        ..Default::default()
    };

    match secrets.create(&PostParams::default(), &alias).await {
        Ok(_) => {
            info!("created tls alias {alias_name}");
            Ok(())
        }
        Err(kube::Error::Api(resp)) if resp.code == 409 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataplane_service_name_follows_prefix_rule() {
        assert_eq!(dataplane_service_name(), "cilium-gateway-platform-gateway");
    }

    #[test]
    fn alias_name_is_namespace_prefixed() {
        assert_eq!(
            tls_alias_name("demo-system", "platform-cert"),
            "demo-system-platform-cert"
        );
    }

    #[test]
    fn gateway_bundle_ships_the_source_tls_secret() {
        let build = crate::crd::BuildCustomization::default();
        let streams = packages::render(packages::GATEWAY_PACKAGE, &build).unwrap();
        let objects = applier::decode_documents(&streams[0]).unwrap();
        assert!(objects
            .iter()
            .any(|o| o.metadata.name.as_deref() == Some(constants::TLS_SECRET_NAME)));
    }
}
