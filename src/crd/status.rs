//! # Platform Status
//!
//! Observed state written back at the end of every reconcile pass.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of the Platform resource
///
/// Availability flags may flap if the cluster is damaged between passes;
/// `gitRepositoriesCreated` transitions false to true exactly once per
/// platform lifetime and is never reset.
#[derive(Debug, Clone, Deserialize, Serialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    /// Data plane package applied without error
    #[serde(default)]
    pub cilium_available: bool,
    /// Gateway resources applied without error
    #[serde(default)]
    pub gateway_available: bool,
    /// Git server package applied without error
    #[serde(default)]
    pub gitea_available: bool,
    /// GitOps engine package applied without error
    #[serde(default)]
    pub argocd_available: bool,
    /// Seed repositories created and populated; write-once latch that
    /// prevents re-bootstrap
    #[serde(default)]
    pub git_repositories_created: bool,
    /// Generation of the spec most recently acted upon
    #[serde(default)]
    pub observed_generation: Option<i64>,
}
