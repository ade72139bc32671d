//! Application layer module
//!
//! Orchestrates the domain: one reconciliation pass over a source and a
//! target store.

pub mod reconciler;

pub use reconciler::{ReconcileError, Reconciler};
