//! Domain module - canonical product model and reconciliation contracts
//!
//! Holds the product types shared by normalization and reconciliation,
//! the pure record normalizer, the run report, and the store/source traits.

pub mod normalizer;
pub mod product;
pub mod report;
pub mod repositories;

// Re-export commonly used items
pub use normalizer::{normalize, MissingCategoryPolicy, NormalizationError, Normalizer};
pub use product::{
    diff_fields, CanonicalProduct, Category, FieldChange, ProductField, StoredProduct,
    DEFAULT_CATEGORY,
};
pub use report::{Outcome, ReconciliationReport, RecordOutcome, SkipReason};
pub use repositories::{
    ProductSource, SourceError, SourceRecord, SourceResult, StoreError, StoreResult, TargetStore,
};
