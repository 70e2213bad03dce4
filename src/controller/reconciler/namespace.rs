//! # Project Namespace
//!
//! Ensures the platform's working namespace exists before any other phase
//! runs. Server-side apply makes this create-or-update in one call.

use super::Reconciler;
use crate::constants;
use crate::crd::Platform;
use crate::error::Result;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams};
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Create or update the working namespace derived from the Platform.
/// Succeeds when the namespace already exists.
pub async fn ensure(ctx: &Reconciler, platform: &Platform) -> Result<()> {
    let name = platform.namespace().unwrap_or_default();

    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            labels: Some(BTreeMap::from([(
                "app.kubernetes.io/managed-by".to_string(),
                constants::FIELD_MANAGER.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    };

    let namespaces: Api<Namespace> = Api::all(ctx.client.clone());
    let params = PatchParams::apply(constants::FIELD_MANAGER).force();
    namespaces
        .patch(&name, &params, &Patch::Apply(&namespace))
        .await?;

    debug!("namespace {name} ensured");
    Ok(())
}
