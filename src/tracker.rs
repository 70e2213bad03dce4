//! # Cluster Resource Tracker
//!
//! Per-cluster record of cloud resources created by provisioning
//! collaborators, persisted as JSON under the user's state directory.
//!
//! The tracker records a resource before the corresponding cloud create
//! call is issued, so a crash between the two leaves at worst a stale
//! entry rather than an untracked resource. Deletion is best-effort and
//! idempotent. The state file is only touched at cluster-provision
//! boundaries, never concurrently with a reconcile.

use crate::constants;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Kinds of cloud resources a provisioner creates for a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Network,
    Subnet,
    FirewallRule,
    Instance,
    Address,
    LoadBalancer,
}

/// One provisioned cloud resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedResource {
    pub kind: ResourceKind,
    /// Provider-assigned identifier
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Resource tracker for one provider, backed by a JSON state file
#[derive(Debug)]
pub struct ResourceTracker {
    path: PathBuf,
    clusters: HashMap<String, Vec<TrackedResource>>,
}

impl ResourceTracker {
    /// Load the tracker for `provider`, starting empty when no state file
    /// exists yet
    pub fn load(provider: &str) -> Result<Self> {
        let path = state_path(provider);
        Self::load_from(path)
    }

    /// Load from an explicit path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let clusters = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, clusters })
    }

    /// Record a resource for `cluster`. Idempotent on (kind, id).
    pub fn insert(&mut self, cluster: &str, resource: TrackedResource) {
        let resources = self.clusters.entry(cluster.to_string()).or_default();
        if !resources
            .iter()
            .any(|r| r.kind == resource.kind && r.id == resource.id)
        {
            resources.push(resource);
        }
    }

    /// Forget a resource. Idempotent: removing an absent entry is a no-op.
    pub fn remove(&mut self, cluster: &str, kind: ResourceKind, id: &str) {
        if let Some(resources) = self.clusters.get_mut(cluster) {
            resources.retain(|r| !(r.kind == kind && r.id == id));
            if resources.is_empty() {
                self.clusters.remove(cluster);
            }
        }
    }

    /// Drop every record for a cluster after teardown
    pub fn remove_cluster(&mut self, cluster: &str) {
        self.clusters.remove(cluster);
    }

    /// Resources recorded for `cluster`, newest last
    pub fn resources(&self, cluster: &str) -> &[TrackedResource] {
        self.clusters.get(cluster).map_or(&[], Vec::as_slice)
    }

    /// Persist the tracker to its state file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.clusters)?)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn state_path(provider: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::STATE_DIR)
        .join("state")
        .join(provider)
        .join("clusters.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(kind: ResourceKind, id: &str) -> TrackedResource {
        TrackedResource {
            kind,
            id: id.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_is_idempotent_on_kind_and_id() {
        let mut tracker = ResourceTracker::load_from(PathBuf::from("/nonexistent")).unwrap();
        tracker.insert("demo", resource(ResourceKind::Network, "net-1"));
        tracker.insert("demo", resource(ResourceKind::Network, "net-1"));
        tracker.insert("demo", resource(ResourceKind::Instance, "vm-1"));
        assert_eq!(tracker.resources("demo").len(), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut tracker = ResourceTracker::load_from(PathBuf::from("/nonexistent")).unwrap();
        tracker.insert("demo", resource(ResourceKind::Address, "ip-1"));
        tracker.remove("demo", ResourceKind::Address, "ip-1");
        tracker.remove("demo", ResourceKind::Address, "ip-1");
        assert!(tracker.resources("demo").is_empty());
    }

    #[test]
    fn state_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/docker/clusters.json");

        let mut tracker = ResourceTracker::load_from(path.clone()).unwrap();
        tracker.insert("demo", resource(ResourceKind::LoadBalancer, "lb-1"));
        tracker.insert("other", resource(ResourceKind::Subnet, "sub-1"));
        tracker.save().unwrap();

        let reloaded = ResourceTracker::load_from(path).unwrap();
        assert_eq!(reloaded.resources("demo").len(), 1);
        assert_eq!(reloaded.resources("demo")[0].id, "lb-1");
        assert_eq!(reloaded.resources("other").len(), 1);
    }

    #[test]
    fn unknown_cluster_has_no_resources() {
        let tracker = ResourceTracker::load_from(PathBuf::from("/nonexistent")).unwrap();
        assert!(tracker.resources("ghost").is_empty());
    }
}
