//! In-memory store and source implementations
//!
//! Used by tests and benchmarks, and handy for wiring a reconciliation run
//! without a database. The store can be told to fail writes for specific
//! identifiers or to refuse listing altogether.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::product::{CanonicalProduct, FieldChange, StoredProduct};
use crate::domain::repositories::{
    ProductSource, SourceError, SourceRecord, SourceResult, StoreError, StoreResult, TargetStore,
};

#[derive(Debug, Default)]
struct StoreState {
    rows: Vec<StoredProduct>,
    failing: HashMap<String, String>,
    unavailable: bool,
    creates: Vec<String>,
    updates: Vec<(String, Vec<FieldChange>)>,
}

#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    state: Mutex<StoreState>,
}

impl InMemoryProductStore {
    #[must_use]
    pub fn with_rows(rows: Vec<StoredProduct>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                rows,
                ..StoreState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every create/update for `identifier` fail with `message`
    pub fn fail_writes_for(&self, identifier: &str, message: &str) {
        self.state()
            .failing
            .insert(identifier.to_string(), message.to_string());
    }

    /// Makes `list_all` fail, simulating a lost connection
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    #[must_use]
    pub fn rows(&self) -> Vec<StoredProduct> {
        self.state().rows.clone()
    }

    /// Last row carrying `identifier`
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<StoredProduct> {
        self.state()
            .rows
            .iter()
            .rev()
            .find(|r| r.identifier.as_deref() == Some(identifier))
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifiers of successful creates, in order
    #[must_use]
    pub fn creates(&self) -> Vec<String> {
        self.state().creates.clone()
    }

    /// Successful field updates, in order
    #[must_use]
    pub fn updates(&self) -> Vec<(String, Vec<FieldChange>)> {
        self.state().updates.clone()
    }

    /// Number of successful writes of either kind
    #[must_use]
    pub fn write_count(&self) -> usize {
        let state = self.state();
        state.creates.len() + state.updates.len()
    }
}

fn rejected(identifier: &str, message: &str) -> StoreError {
    StoreError::Rejected {
        identifier: identifier.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl TargetStore for InMemoryProductStore {
    async fn list_all(&self) -> StoreResult<Vec<StoredProduct>> {
        let state = self.state();
        if state.unavailable {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(state.rows.clone())
    }

    async fn create(&self, product: &CanonicalProduct) -> StoreResult<()> {
        let mut state = self.state();
        if let Some(message) = state.failing.get(&product.identifier) {
            return Err(rejected(&product.identifier, message));
        }
        let exists = state
            .rows
            .iter()
            .any(|r| r.identifier.as_deref() == Some(product.identifier.as_str()));
        if exists {
            return Err(StoreError::Duplicate {
                identifier: product.identifier.clone(),
            });
        }

        state.rows.push(StoredProduct::from_canonical(product, Utc::now()));
        state.creates.push(product.identifier.clone());
        Ok(())
    }

    async fn update_fields(&self, identifier: &str, changes: &[FieldChange]) -> StoreResult<()> {
        let mut state = self.state();
        if let Some(message) = state.failing.get(identifier) {
            return Err(rejected(identifier, message));
        }

        let row = state
            .rows
            .iter_mut()
            .rev()
            .find(|r| r.identifier.as_deref() == Some(identifier))
            .ok_or_else(|| StoreError::NotFound {
                identifier: identifier.to_string(),
            })?;
        row.apply(changes, Utc::now());

        state
            .updates
            .push((identifier.to_string(), changes.to_vec()));
        Ok(())
    }
}

/// Fixed list of source records
#[derive(Debug, Default)]
pub struct InMemorySource {
    records: Vec<SourceRecord>,
    failure: Option<String>,
    list_calls: AtomicUsize,
}

impl InMemorySource {
    #[must_use]
    pub const fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            records,
            failure: None,
            list_calls: AtomicUsize::new(0),
        }
    }

    /// A source whose enumeration always fails
    #[must_use]
    pub fn unavailable(message: &str) -> Self {
        Self {
            records: Vec::new(),
            failure: Some(message.to_string()),
            list_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProductSource for InMemorySource {
    async fn list_all(&self) -> SourceResult<Vec<SourceRecord>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        match &self.failure {
            Some(message) => Err(SourceError::InvalidExport(message.clone())),
            None => Ok(self.records.clone()),
        }
    }
}
