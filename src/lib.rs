//! Platform Bootstrap Controller Library
//!
//! Core functionality for the platform bootstrap controller: the Platform
//! CRD, the multi-phase reconciler, the manifest applier, the package
//! registry, and the admin API clients. Tests are included in the module
//! files.

pub mod argocd;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod git;
pub mod gitea;
pub mod observability;
pub mod packages;
pub mod server;
pub mod tracker;

pub use crd::{Platform, PlatformSpec, PlatformStatus};
pub use error::{Error, Result};
