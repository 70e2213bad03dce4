//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from Rust type
//! definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/platform.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use platform_bootstrap_controller::crd::Platform;

fn main() {
    let crd = Platform::crd();
    print!(
        "{}",
        serde_yaml::to_string(&crd).expect("Failed to serialize Platform CRD to YAML")
    );
}
