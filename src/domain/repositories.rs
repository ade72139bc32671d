//! Repository interfaces for product reconciliation
//!
//! Contains the two narrow data-access seams the reconciler depends on:
//! the target product store and the source document enumeration.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::product::{CanonicalProduct, FieldChange, StoredProduct};

/// Failure of a target store operation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("product '{identifier}' not found")]
    NotFound { identifier: String },

    #[error("product '{identifier}' already exists")]
    Duplicate { identifier: String },

    #[error("failed to encode stored attributes: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("write rejected for '{identifier}': {message}")]
    Rejected { identifier: String, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure to enumerate the source documents
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read source export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse source export: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("source request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid source export: {0}")]
    InvalidExport(String),

    #[error("invalid source configuration: {0}")]
    Configuration(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// One document from the source system: its identifier plus the untyped body
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub identifier: String,
    pub raw: Value,
}

impl SourceRecord {
    pub fn new(identifier: impl Into<String>, raw: Value) -> Self {
        Self {
            identifier: identifier.into(),
            raw,
        }
    }
}

/// Persistent product store the reconciliation converges
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Every stored product, including legacy rows without an identifier
    async fn list_all(&self) -> StoreResult<Vec<StoredProduct>>;

    /// Inserts a new, fully validated product
    async fn create(&self, product: &CanonicalProduct) -> StoreResult<()>;

    /// Overwrites exactly the given fields of an existing product
    async fn update_fields(&self, identifier: &str, changes: &[FieldChange]) -> StoreResult<()>;
}

/// Origin system the catalogue is read from
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn list_all(&self) -> SourceResult<Vec<SourceRecord>>;
}
