//! # Reconciler
//!
//! Converges the target product store to the source catalogue in one
//! sequential pass:
//!
//! 1. index the target rows by identifier (rows without one are ignored,
//!    a repeated identifier keeps the later row)
//! 2. normalize each source record in enumeration order
//! 3. unchanged records issue no write, changed records get a field-level
//!    update, unknown identifiers get a create
//! 4. every per-record failure becomes a skip with its reason
//!
//! Only a failure to read the whole target or source aborts the run, and
//! both reads happen before the first write.

use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::normalizer::Normalizer;
use crate::domain::product::{diff_fields, FieldChange, ProductField, StoredProduct};
use crate::domain::report::{ReconciliationReport, SkipReason};
use crate::domain::repositories::{
    ProductSource, SourceError, SourceRecord, StoreError, TargetStore,
};

/// Whole-run failures; no writes have been issued when one is returned
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("SourceUnavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    #[error("TargetUnavailable: {0}")]
    TargetUnavailable(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    normalizer: Normalizer,
    dry_run: bool,
}

impl Reconciler {
    #[must_use]
    pub const fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            dry_run: false,
        }
    }

    /// Marks reports produced by this reconciler as dry runs.
    ///
    /// The caller is responsible for handing in a store that swallows writes.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reads both sides and runs one reconciliation pass
    pub async fn run(
        &self,
        source: &dyn ProductSource,
        target: &dyn TargetStore,
    ) -> Result<ReconciliationReport, ReconcileError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", %run_id, dry_run = self.dry_run);

        async {
            let existing = target.list_all().await.map_err(|e| {
                error!("target store unavailable: {e}");
                ReconcileError::TargetUnavailable(e)
            })?;
            let records = source.list_all().await.map_err(|e| {
                error!("source unavailable: {e}");
                ReconcileError::SourceUnavailable(e)
            })?;

            info!(
                target_records = existing.len(),
                source_records = records.len(),
                missing_category = ?self.normalizer.missing_category_policy(),
                "starting reconciliation"
            );

            Ok(self.reconcile_with_id(run_id, existing, records, target).await)
        }
        .instrument(span)
        .await
    }

    /// Reconciles already-fetched target rows against source records,
    /// issuing writes through `target`
    pub async fn reconcile(
        &self,
        existing: Vec<StoredProduct>,
        records: Vec<SourceRecord>,
        target: &dyn TargetStore,
    ) -> ReconciliationReport {
        self.reconcile_with_id(Uuid::new_v4(), existing, records, target)
            .await
    }

    async fn reconcile_with_id(
        &self,
        run_id: Uuid,
        existing: Vec<StoredProduct>,
        records: Vec<SourceRecord>,
        target: &dyn TargetStore,
    ) -> ReconciliationReport {
        let mut report = ReconciliationReport::new(run_id, self.dry_run);
        let mut index = build_index(existing);

        for record in records {
            let product = match self.normalizer.normalize(&record.raw, &record.identifier) {
                Ok(product) => product,
                Err(e) => {
                    warn!(identifier = %record.identifier, "skipping record: {e}");
                    report.skipped(&record.identifier, SkipReason::Normalization(e));
                    continue;
                }
            };

            if let Some(current) = index.get_mut(&product.identifier) {
                let changes = diff_fields(current, &product);
                if changes.is_empty() {
                    debug!(identifier = %product.identifier, "unchanged");
                    report.unchanged(&product.identifier);
                    continue;
                }

                match target.update_fields(&product.identifier, &changes).await {
                    Ok(()) => {
                        current.apply(&changes, Utc::now());
                        let fields: Vec<ProductField> =
                            changes.iter().map(FieldChange::field).collect();
                        debug!(identifier = %product.identifier, ?fields, "updated");
                        report.updated(&product.identifier, fields);
                    }
                    Err(e) => {
                        warn!(identifier = %product.identifier, "update failed: {e}");
                        report.skipped(&product.identifier, SkipReason::Persistence(e.to_string()));
                    }
                }
                continue;
            }

            match target.create(&product).await {
                Ok(()) => {
                    debug!(identifier = %product.identifier, "added");
                    index.insert(
                        product.identifier.clone(),
                        StoredProduct::from_canonical(&product, Utc::now()),
                    );
                    report.added(&product.identifier);
                }
                Err(e) => {
                    warn!(identifier = %product.identifier, "create failed: {e}");
                    report.skipped(&product.identifier, SkipReason::Persistence(e.to_string()));
                }
            }
        }

        report.finish();
        info!(
            total = report.total,
            added = report.added,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "reconciliation finished"
        );
        report
    }
}

/// Identifier index over the target rows; the later row wins on collision
fn build_index(existing: Vec<StoredProduct>) -> HashMap<String, StoredProduct> {
    let mut index = HashMap::with_capacity(existing.len());
    let mut unreachable = 0usize;

    for row in existing {
        match row.identifier.clone() {
            Some(identifier) => {
                if index.insert(identifier.clone(), row).is_some() {
                    debug!(%identifier, "duplicate identifier in target store, keeping later row");
                }
            }
            None => unreachable += 1,
        }
    }

    if unreachable > 0 {
        debug!(unreachable, "target rows without identifier are left untouched");
    }
    index
}
