//! Poster Sync - product catalogue reconciliation
//!
//! Converges a relational product store to the catalogue held in a
//! document store: source records are normalized into canonical products,
//! compared with what the target already holds, and written back as
//! creates or field-level updates. Nothing is ever deleted.

// Module declarations
pub mod application;
pub mod commands;
pub mod domain;
pub mod infrastructure;

pub use application::{ReconcileError, Reconciler};
pub use domain::{CanonicalProduct, Normalizer, ReconciliationReport};
