//! # Manifest Applier
//!
//! Server-side applies raw multi-document YAML streams on behalf of an
//! owning Platform. Shared by every phase.
//!
//! Scope resolution goes through cached API discovery; when discovery
//! cannot resolve a kind (typical right after new CRDs land) a hard-coded
//! allow-list of known cluster-scoped kinds decides instead. Owner
//! references are only ever set on namespaced objects living in the
//! owner's namespace; Kubernetes rejects or silently orphans everything
//! else.

use crate::constants;
use crate::crd::Platform;
use crate::error::{Error, Result};
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::discovery::{Discovery, Scope};
use kube::{Client, Resource, ResourceExt};
use serde::Deserialize;
use tracing::{debug, warn};

/// Kinds treated as cluster-scoped when discovery cannot answer. Includes
/// the data plane's own CRs, whose CRDs register after the bundle applies.
const CLUSTER_SCOPED_KINDS: [&str; 12] = [
    "Namespace",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
    "IngressClass",
    "PriorityClass",
    "StorageClass",
    "GatewayClass",
    "CiliumLoadBalancerIPPool",
    "CiliumL2AnnouncementPolicy",
];

/// Cached API discovery shared across phases.
///
/// Invalidated after the Gateway API CRDs establish so downstream applies
/// see the new kinds.
#[derive(Default)]
pub struct DiscoveryCache {
    inner: tokio::sync::RwLock<Option<Discovery>>,
}

impl std::fmt::Debug for DiscoveryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DiscoveryCache")
    }
}

impl DiscoveryCache {
    /// Resolve `gvk` to its API resource and scope, running discovery on
    /// first use. Returns `None` when the API surface does not know the
    /// kind (callers fall back to the allow-list).
    pub async fn resolve(
        &self,
        client: &Client,
        gvk: &GroupVersionKind,
    ) -> Option<(ApiResource, Scope)> {
        {
            let guard = self.inner.read().await;
            if let Some(discovery) = guard.as_ref() {
                return discovery
                    .resolve_gvk(gvk)
                    .map(|(ar, caps)| (ar, caps.scope));
            }
        }

        let discovery = match Discovery::new(client.clone()).run().await {
            Ok(discovery) => discovery,
            Err(e) => {
                warn!("api discovery failed, falling back to static scope mapping: {e}");
                return None;
            }
        };

        let mut guard = self.inner.write().await;
        let resolved = discovery
            .resolve_gvk(gvk)
            .map(|(ar, caps)| (ar, caps.scope));
        *guard = Some(discovery);
        resolved
    }

    /// Drop the cached discovery; the next resolve re-runs it. Called
    /// after CRD installation changes the API surface.
    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }
}

/// Apply every document in `yaml` with force-ownership server-side apply.
/// All documents are attempted; failures are aggregated into one error.
pub async fn apply_manifests(
    client: &Client,
    discovery: &DiscoveryCache,
    owner: &Platform,
    yaml: &str,
) -> Result<()> {
    let documents = decode_documents(yaml)?;
    let total = documents.len();
    let mut failures = Vec::new();

    for object in documents {
        let label = format!(
            "{}/{}",
            object.types.as_ref().map_or("?", |t| t.kind.as_str()),
            object.name_any()
        );
        if let Err(e) = apply_object(client, discovery, owner, object).await {
            warn!("failed to apply {label}: {e}");
            failures.push(format!("{label}: {e}"));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::ApplyAggregate {
            failed: failures.len(),
            total,
            details: failures.join("; "),
        })
    }
}

/// Decode a multi-document stream into dynamic objects, skipping empty
/// documents
pub fn decode_documents(yaml: &str) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(yaml) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        let object: DynamicObject = serde_json::from_value(serde_json::to_value(value)?)?;
        objects.push(object);
    }
    Ok(objects)
}

async fn apply_object(
    client: &Client,
    discovery: &DiscoveryCache,
    owner: &Platform,
    mut object: DynamicObject,
) -> Result<()> {
    let gvk = object_gvk(&object)?;
    let (api_resource, cluster_scoped) = match discovery.resolve(client, &gvk).await {
        Some((ar, scope)) => (ar, matches!(scope, Scope::Cluster)),
        None => (
            ApiResource::from_gvk(&gvk),
            fallback_is_cluster_scoped(&gvk.kind),
        ),
    };

    let owner_namespace = owner.namespace().unwrap_or_default();
    if !cluster_scoped && object.metadata.namespace.is_none() {
        // Documents with no namespace inherit the owner's
        object.metadata.namespace = Some(owner_namespace.clone());
    }

    let eligible = ownership_eligible(
        cluster_scoped,
        object.metadata.namespace.as_deref(),
        &owner_namespace,
        owner.meta().deletion_timestamp.is_some(),
    );
    if eligible {
        if let Some(owner_ref) = owner.controller_owner_ref(&()) {
            let refs = object.metadata.owner_references.get_or_insert_with(Vec::new);
            if !refs.iter().any(|r| r.uid == owner_ref.uid) {
                refs.push(owner_ref);
            }
        }
    }

    let name = object.name_any();
    let api: Api<DynamicObject> = if cluster_scoped {
        Api::all_with(client.clone(), &api_resource)
    } else {
        let namespace = object
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| owner_namespace.clone());
        Api::namespaced_with(client.clone(), &namespace, &api_resource)
    };

    let params = PatchParams::apply(constants::FIELD_MANAGER).force();
    api.patch(&name, &params, &Patch::Apply(&object)).await?;
    debug!("applied {} {name}", gvk.kind);
    Ok(())
}

/// GroupVersionKind from a decoded document's type metadata
pub fn object_gvk(object: &DynamicObject) -> Result<GroupVersionKind> {
    let types = object
        .types
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("document has no apiVersion/kind"))?;
    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", types.api_version.as_str()),
    };
    Ok(GroupVersionKind::gvk(group, version, &types.kind))
}

/// Static scope decision used when discovery has no answer
pub fn fallback_is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.contains(&kind)
}

/// Owner-reference eligibility: namespaced, in the owner's namespace, and
/// the owner is not being deleted
pub fn ownership_eligible(
    cluster_scoped: bool,
    object_namespace: Option<&str>,
    owner_namespace: &str,
    owner_deleting: bool,
) -> bool {
    !cluster_scoped && object_namespace == Some(owner_namespace) && !owner_deleting
}
