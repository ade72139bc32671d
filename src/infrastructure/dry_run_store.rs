//! Read-through store wrapper that records writes instead of issuing them

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

use crate::domain::product::{CanonicalProduct, FieldChange, StoredProduct};
use crate::domain::repositories::{StoreResult, TargetStore};

/// A write a dry run would have issued
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntendedWrite {
    Create { product: CanonicalProduct },
    Update { identifier: String, changes: Vec<FieldChange> },
}

#[derive(Debug)]
pub struct DryRunStore<S> {
    inner: S,
    intended: Mutex<Vec<IntendedWrite>>,
}

impl<S: TargetStore> DryRunStore<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            intended: Mutex::new(Vec::new()),
        }
    }

    fn intended(&self) -> MutexGuard<'_, Vec<IntendedWrite>> {
        self.intended.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes swallowed so far, in issue order
    #[must_use]
    pub fn intended_writes(&self) -> Vec<IntendedWrite> {
        self.intended().clone()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: TargetStore> TargetStore for DryRunStore<S> {
    async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
        self.inner.list_all().await
    }

    async fn create(&self, product: &CanonicalProduct) -> StoreResult<()> {
        info!(identifier = %product.identifier, "dry run: would create");
        self.intended().push(IntendedWrite::Create {
            product: product.clone(),
        });
        Ok(())
    }

    async fn update_fields(&self, identifier: &str, changes: &[FieldChange]) -> StoreResult<()> {
        info!(identifier, fields = changes.len(), "dry run: would update");
        self.intended().push(IntendedWrite::Update {
            identifier: identifier.to_string(),
            changes: changes.to_vec(),
        });
        Ok(())
    }
}
