//! # Manifest Unit Tests
//!
//! Tests the embedded bundles decode cleanly, the applier's scope and
//! ownership rules hold for mixed bundles, and the seed descriptors cover
//! the expected repositories.

use platform_bootstrap_controller::controller::applier::{
    decode_documents, fallback_is_cluster_scoped, object_gvk, ownership_eligible,
};
use platform_bootstrap_controller::crd::BuildCustomization;
use platform_bootstrap_controller::packages::{self, assets};

#[test]
fn every_embedded_bundle_decodes() {
    let build = BuildCustomization::default();
    for name in packages::CORE_PACKAGES
        .iter()
        .chain([&packages::GATEWAY_PACKAGE])
    {
        for stream in packages::render(name, &build).unwrap() {
            let objects = decode_documents(&stream)
                .unwrap_or_else(|e| panic!("bundle {name} failed to decode: {e}"));
            assert!(!objects.is_empty(), "bundle {name} is empty");
            for object in &objects {
                object_gvk(object).unwrap();
            }
        }
    }
    // CRD bundle is applied outside the registry
    assert_eq!(decode_documents(assets::GATEWAY_API_CRDS).unwrap().len(), 5);
}

#[test]
fn mixed_bundle_ownership_rules() {
    // A bundle with one ClusterRole, one Namespace, and one Deployment:
    // only the Deployment in the owner's namespace may carry an owner
    // reference.
    let yaml = r#"
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRole
metadata:
  name: demo-role
---
apiVersion: v1
kind: Namespace
metadata:
  name: demo-system
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: demo-app
  namespace: demo-system
"#;
    let objects = decode_documents(yaml).unwrap();
    let verdicts: Vec<bool> = objects
        .iter()
        .map(|o| {
            let kind = &o.types.as_ref().unwrap().kind;
            ownership_eligible(
                fallback_is_cluster_scoped(kind),
                o.metadata.namespace.as_deref(),
                "demo-system",
                false,
            )
        })
        .collect();
    assert_eq!(verdicts, vec![false, false, true]);
}

#[test]
fn cross_namespace_objects_are_never_owned() {
    assert!(!ownership_eligible(
        false,
        Some("argocd"),
        "demo-system",
        false
    ));
}

#[test]
fn gitea_bundle_keeps_workloads_in_sync_with_descriptor() {
    let build = BuildCustomization::default();
    let stream = &packages::render("gitea", &build).unwrap()[0];
    let objects = decode_documents(stream).unwrap();
    let descriptor = packages::descriptor("gitea").unwrap();

    for workload in descriptor.workloads {
        assert!(
            objects.iter().any(|o| {
                o.types.as_ref().unwrap().kind == "Deployment"
                    && o.metadata.name.as_deref() == Some(workload.name)
            }),
            "descriptor workload {} missing from bundle",
            workload.name
        );
    }
}

#[test]
fn argocd_bundle_ships_engine_crds() {
    let build = BuildCustomization::default();
    let stream = &packages::render("argocd", &build).unwrap()[0];
    let objects = decode_documents(stream).unwrap();
    for crd in [
        "applications.argoproj.io",
        "applicationsets.argoproj.io",
        "appprojects.argoproj.io",
    ] {
        assert!(
            objects.iter().any(|o| o.metadata.name.as_deref() == Some(crd)),
            "missing {crd}"
        );
    }
}

#[test]
fn seed_descriptors_cover_both_repositories() {
    let names: Vec<_> = packages::SEED_REPOSITORIES.iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["platform-packages", "platform-environments"]);

    let packages_repo = &packages::SEED_REPOSITORIES[0];
    assert!(packages_repo.strip_first_component);
    assert!(!packages_repo.files.is_empty());

    let environments_repo = &packages::SEED_REPOSITORIES[1];
    assert!(!environments_repo.strip_first_component);
}
