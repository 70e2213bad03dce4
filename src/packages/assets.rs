//! # Embedded Assets
//!
//! Manifest bundles and seed repository content compiled into the binary.
//! The controller never reads manifests from disk at runtime; everything a
//! bootstrap needs ships inside the image.

/// Data plane install bundle
pub const CILIUM_INSTALL: &str = include_str!("../../manifests/cilium/install.yaml");

/// Data plane post-install bundle (load balancer pool, L2 policy)
pub const CILIUM_POST_INSTALL: &str = include_str!("../../manifests/cilium/post-install.yaml");

/// Git server install bundle
pub const GITEA_INSTALL: &str = include_str!("../../manifests/gitea/install.yaml");

/// GitOps engine install bundle
pub const ARGOCD_INSTALL: &str = include_str!("../../manifests/argocd/install.yaml");

/// Gateway resources (GatewayClass, Gateway, HTTPRoutes)
pub const GATEWAY_INSTALL: &str = include_str!("../../manifests/gateway/install.yaml");

/// Gateway API CRD bundle
pub const GATEWAY_API_CRDS: &str = include_str!("../../manifests/gateway-api/crds.yaml");

/// Repository credential + stable endpoint bundle for the GitOps engine
pub const GITOPS_REPO_CREDENTIALS: &str =
    include_str!("../../manifests/gitops/repo-credentials.yaml");

/// Platform-wide ApplicationSet
pub const GITOPS_APPSET: &str = include_str!("../../manifests/gitops/appset.yaml");

/// Seed content for the packages repository. Paths carry the embedded
/// layout; the leading component is stripped at population time so the
/// ApplicationSet's path references align.
pub const PACKAGES_REPO_FILES: &[(&str, &str)] = &[
    (
        "packages/monitoring/kustomization.yaml",
        include_str!("../../platform/stack/platform-packages/packages/monitoring/kustomization.yaml"),
    ),
    (
        "packages/monitoring/metrics-server.yaml",
        include_str!("../../platform/stack/platform-packages/packages/monitoring/metrics-server.yaml"),
    ),
    (
        "packages/cert-manager/kustomization.yaml",
        include_str!("../../platform/stack/platform-packages/packages/cert-manager/kustomization.yaml"),
    ),
    (
        "packages/cert-manager/issuer.yaml",
        include_str!("../../platform/stack/platform-packages/packages/cert-manager/issuer.yaml"),
    ),
];

/// Seed content for the environments repository, copied as-is
pub const ENVIRONMENTS_REPO_FILES: &[(&str, &str)] = &[
    (
        "README.md",
        include_str!("../../platform/stack/platform-environments/README.md"),
    ),
    (
        "environments/dev/cluster.yaml",
        include_str!("../../platform/stack/platform-environments/environments/dev/cluster.yaml"),
    ),
    (
        "environments/staging/cluster.yaml",
        include_str!("../../platform/stack/platform-environments/environments/staging/cluster.yaml"),
    ),
];
