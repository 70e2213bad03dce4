//! # Package Registry
//!
//! Read-only map from package symbolic name to its rendered manifest
//! streams, plus the descriptors driving install order, convergence
//! checks and seed repository population.
//!
//! Templating inputs are confined to the Platform's `BuildCustomization`;
//! no package reads global process state.

pub mod assets;

use crate::crd::BuildCustomization;
use crate::error::{Error, Result};
use tera::Tera;

/// Workload kinds checked by the convergence gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

/// One workload a package is expected to run once installed
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub namespace: &'static str,
    pub name: &'static str,
}

/// Descriptor for one core package
#[derive(Debug, Clone, Copy)]
pub struct PackageDescriptor {
    pub name: &'static str,
    install: &'static str,
    post_install: Option<&'static str>,
    /// Workloads that must report ready replicas before the platform
    /// counts as converged
    pub workloads: &'static [Workload],
}

/// Core packages in install order: data plane first, then the git server,
/// then the GitOps engine
pub const CORE_PACKAGES: [&str; 3] = ["cilium", "gitea", "argocd"];

/// Gateway resources, applied separately after the Gateway API CRDs are
/// established
pub const GATEWAY_PACKAGE: &str = "gateway";

static DESCRIPTORS: &[PackageDescriptor] = &[
    PackageDescriptor {
        name: "cilium",
        install: assets::CILIUM_INSTALL,
        post_install: Some(assets::CILIUM_POST_INSTALL),
        workloads: &[Workload {
            kind: WorkloadKind::Deployment,
            namespace: "kube-system",
            name: "cilium-operator",
        }],
    },
    PackageDescriptor {
        name: "gitea",
        install: assets::GITEA_INSTALL,
        post_install: None,
        workloads: &[
            Workload {
                kind: WorkloadKind::Deployment,
                namespace: "gitea",
                name: "gitea",
            },
            Workload {
                kind: WorkloadKind::Deployment,
                namespace: "gitea",
                name: "gitea-postgres",
            },
            Workload {
                kind: WorkloadKind::Deployment,
                namespace: "gitea",
                name: "gitea-redis",
            },
        ],
    },
    PackageDescriptor {
        name: "argocd",
        install: assets::ARGOCD_INSTALL,
        post_install: None,
        workloads: &[
            Workload {
                kind: WorkloadKind::Deployment,
                namespace: "argocd",
                name: "argocd-server",
            },
            Workload {
                kind: WorkloadKind::Deployment,
                namespace: "argocd",
                name: "argocd-repo-server",
            },
            Workload {
                kind: WorkloadKind::Deployment,
                namespace: "argocd",
                name: "argocd-redis",
            },
            Workload {
                kind: WorkloadKind::StatefulSet,
                namespace: "argocd",
                name: "argocd-application-controller",
            },
        ],
    },
    PackageDescriptor {
        name: "gateway",
        install: assets::GATEWAY_INSTALL,
        post_install: None,
        workloads: &[],
    },
];

/// Seed repository descriptor: embedded source and its copy rule
#[derive(Debug, Clone, Copy)]
pub struct RepositoryDescriptor {
    pub name: &'static str,
    pub files: &'static [(&'static str, &'static str)],
    /// Strip one leading path component when copying into the working
    /// tree so ApplicationSet path references align
    pub strip_first_component: bool,
}

/// Seed repositories created on the git server at bootstrap
pub const SEED_REPOSITORIES: [RepositoryDescriptor; 2] = [
    RepositoryDescriptor {
        name: "platform-packages",
        files: assets::PACKAGES_REPO_FILES,
        strip_first_component: true,
    },
    RepositoryDescriptor {
        name: "platform-environments",
        files: assets::ENVIRONMENTS_REPO_FILES,
        strip_first_component: false,
    },
];

/// Look up a package descriptor by symbolic name
pub fn descriptor(name: &str) -> Result<&'static PackageDescriptor> {
    DESCRIPTORS
        .iter()
        .find(|d| d.name == name)
        .ok_or_else(|| Error::UnknownPackage(name.to_string()))
}

/// Render the package's manifest bundles (install, then post-install)
/// against the platform's build customization
pub fn render(name: &str, build: &BuildCustomization) -> Result<Vec<String>> {
    let descriptor = descriptor(name)?;
    let mut streams = vec![render_template(descriptor.install, build)?];
    if let Some(post) = descriptor.post_install {
        streams.push(render_template(post, build)?);
    }
    Ok(streams)
}

/// Render one template against the customization-derived context
pub fn render_template(source: &str, build: &BuildCustomization) -> Result<String> {
    let context = template_context(build);
    Ok(Tera::one_off(source, &context, false)?)
}

fn template_context(build: &BuildCustomization) -> tera::Context {
    let mut context = tera::Context::new();
    context.insert("domain", build.domain());
    context.insert("protocol", &build.protocol);
    context.insert("port", &build.port);
    context.insert("use_path_routing", &build.use_path_routing);
    context.insert("gitea_host", &build.service_host("gitea"));
    context.insert("argocd_host", &build.service_host("argocd"));
    context.insert("gitea_url", &build.service_url("gitea"));
    context.insert("argocd_url", &build.service_url("argocd"));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn registry_knows_every_core_package() {
        for name in CORE_PACKAGES {
            descriptor(name).unwrap();
        }
        descriptor(GATEWAY_PACKAGE).unwrap();
    }

    #[test]
    fn unknown_package_is_a_config_error() {
        let err = descriptor("flux").unwrap_err();
        assert!(matches!(err, Error::UnknownPackage(name) if name == "flux"));
    }

    #[test]
    fn rendered_bundles_are_valid_multi_doc_yaml() {
        let build = BuildCustomization::default();
        for name in CORE_PACKAGES.iter().chain([&GATEWAY_PACKAGE]) {
            for stream in render(name, &build).unwrap() {
                for document in serde_yaml::Deserializer::from_str(&stream) {
                    serde_yaml::Value::deserialize(document)
                        .unwrap_or_else(|e| panic!("package {name}: {e}"));
                }
            }
        }
    }

    #[test]
    fn gitea_bundle_renders_external_url() {
        let build = BuildCustomization::default();
        let streams = render("gitea", &build).unwrap();
        assert!(streams[0].contains("https://gitea.localtest.me:443"));
        assert!(streams[0].contains("gitea.localtest.me"));
    }

    #[test]
    fn gateway_bundle_switches_on_routing_style() {
        let subdomain = render("gateway", &BuildCustomization::default()).unwrap();
        assert!(subdomain[0].contains("value: /\n"));

        let path = render(
            "gateway",
            &BuildCustomization {
                use_path_routing: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(path[0].contains("value: /gitea"));
        assert!(path[0].contains("value: /argocd"));
    }

    #[test]
    fn cilium_ships_a_post_install_bundle() {
        let streams = render("cilium", &BuildCustomization::default()).unwrap();
        assert_eq!(streams.len(), 2);
        assert!(streams[1].contains("CiliumLoadBalancerIPPool"));
    }
}
