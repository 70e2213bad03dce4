//! # Platform Specification
//!
//! The `Platform` custom resource declares the desired state of one
//! bootstrapped cluster. It is created by the CLI and reconciled by this
//! controller until every core package is installed and the GitOps engine
//! owns ongoing delivery.

use super::customization::BuildCustomization;
use super::status::PlatformStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Platform Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: platform-bootstrap.microscaler.io/v1alpha1
/// kind: Platform
/// metadata:
///   name: demo
///   namespace: demo-system
/// spec:
///   buildCustomization:
///     host: localtest.me
///     protocol: https
///     port: "443"
///     usePathRouting: false
///   staticPasswordEnabled: true
///   exitOnSync: true
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Platform",
    group = "platform-bootstrap.microscaler.io",
    version = "v1alpha1",
    namespaced,
    status = "PlatformStatus",
    printcolumn = r#"{"name":"Repositories", "type":"boolean", "jsonPath":".status.gitRepositoriesCreated"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    /// Host, protocol and routing style used when rendering package
    /// manifests and deriving admin API URLs
    #[serde(default)]
    pub build_customization: BuildCustomization,
    /// Rotate the GitOps engine and git server admin passwords to the
    /// canonical static development password after install
    #[serde(default)]
    pub static_password_enabled: bool,
    /// Terminate the controller process once the platform has fully
    /// converged (all packages available, repositories seeded)
    #[serde(default)]
    pub exit_on_sync: bool,
}

pub fn default_host() -> String {
    "localtest.me".to_string()
}

pub fn default_protocol() -> String {
    "https".to_string()
}

pub fn default_port() -> String {
    "443".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: PlatformSpec = serde_yaml::from_str("{}").unwrap();
        assert!(!spec.static_password_enabled);
        assert!(!spec.exit_on_sync);
        assert_eq!(spec.build_customization.host, "localtest.me");
        assert_eq!(spec.build_customization.protocol, "https");
    }

    #[test]
    fn spec_round_trips_camel_case() {
        let yaml = r#"
buildCustomization:
  host: example.com
  protocol: http
  port: "8443"
  usePathRouting: true
staticPasswordEnabled: true
exitOnSync: true
"#;
        let spec: PlatformSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.static_password_enabled);
        assert!(spec.exit_on_sync);
        assert!(spec.build_customization.use_path_routing);
        assert_eq!(spec.build_customization.port, "8443");

        let out = serde_json::to_value(&spec).unwrap();
        assert_eq!(out["buildCustomization"]["usePathRouting"], true);
        assert_eq!(out["exitOnSync"], true);
    }
}
