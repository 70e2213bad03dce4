//! # Controller
//!
//! Core controller modules for the Platform Bootstrap Controller.
//!
//! - `applier`: server-side apply of raw manifest streams with owner
//!   reference handling
//! - `reconciler`: the phased reconciliation loop

pub mod applier;
pub mod reconciler;
