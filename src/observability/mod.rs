//! # Observability
//!
//! Prometheus metrics for the controller. Logs are the primary surface;
//! metrics cover the reconcile loop's health at a glance.

pub mod metrics;
