//! Operator-facing sync command
//!
//! Wires configuration into concrete stores and sources, runs one
//! reconciliation pass and releases the database pool afterwards.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::application::{ReconcileError, Reconciler};
use crate::domain::repositories::ProductSource;
use crate::domain::ReconciliationReport;
use crate::infrastructure::config::{AppConfig, SourceConfig, SourceKind};
use crate::infrastructure::{
    DatabaseConnection, DryRunStore, FirestoreSource, JsonExportSource, SqliteProductStore,
};

/// Builds the configured source
pub fn build_source(config: &SourceConfig) -> Result<Box<dyn ProductSource>> {
    match config.kind {
        SourceKind::File => {
            let path = config
                .path
                .as_ref()
                .context("source.path is required for file sources")?;
            let source = JsonExportSource::new(path).with_id_field(config.id_field.clone());
            info!(path = %source.path().display(), "using export file source");
            Ok(Box::new(source))
        }
        SourceKind::Firestore => {
            let source = FirestoreSource::new(&config.firestore)
                .context("failed to set up firestore source")?;
            info!(collection = %source.collection_url(), "using firestore source");
            Ok(Box::new(source))
        }
    }
}

/// Runs one reconciliation pass against the configured database
///
/// Returns an error only when the configuration is unusable or when the
/// source or target cannot be read at all; per-record failures are part of
/// the returned report.
pub async fn run_sync(config: &AppConfig) -> Result<ReconciliationReport> {
    config.validate().context("invalid configuration")?;
    let source = build_source(&config.source)?;

    let db = DatabaseConnection::with_max_connections(
        &config.database.url,
        config.database.max_connections,
    )
    .await
    .map_err(ReconcileError::TargetUnavailable)?;

    let result = reconcile_with(config, source.as_ref(), &db).await;
    db.close().await;
    result
}

async fn reconcile_with(
    config: &AppConfig,
    source: &dyn ProductSource,
    db: &DatabaseConnection,
) -> Result<ReconciliationReport> {
    db.migrate().await.map_err(ReconcileError::TargetUnavailable)?;

    let store = SqliteProductStore::new(db.pool().clone());
    let dry_run = config.reconcile.dry_run;
    let reconciler = Reconciler::new(config.reconcile.normalizer()).with_dry_run(dry_run);

    let report = if dry_run {
        let store = DryRunStore::new(store);
        let report = reconciler.run(source, &store).await?;
        info!(
            intended_writes = store.intended_writes().len(),
            "dry run finished, no writes issued"
        );
        report
    } else {
        reconciler.run(source, &store).await?
    };

    if report.skipped > 0 {
        warn!(skipped = report.skipped, "some records were skipped");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Outcome;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup(export: &serde_json::Value) -> (TempDir, AppConfig) {
        let dir = tempfile::tempdir().unwrap();
        let export_path = dir.path().join("export.json");
        std::fs::write(&export_path, export.to_string()).unwrap();

        let mut config = AppConfig::default();
        config.database.url = format!("sqlite:{}", dir.path().join("db").join("products.db").display());
        config.source.path = Some(export_path);
        (dir, config)
    }

    fn export() -> serde_json::Value {
        json!({
            "A1": {"name": "New Title", "description": "d", "price": 12.5, "imageUrl": "x.jpg", "category": "movies"},
            "B2": {"name": "Jazz Night", "description": "d2", "price": 15, "image": "j.jpg", "category": "Music"},
            "C3": {"name": "Broken", "description": "d3", "price": "abc", "imageUrl": "c.jpg"}
        })
    }

    #[tokio::test]
    async fn sync_twice_converges() {
        let (_dir, config) = setup(&export());

        let first = run_sync(&config).await.unwrap();
        assert_eq!((first.added, first.skipped), (2, 1));

        let second = run_sync(&config).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(second.skipped, 1);
    }

    #[tokio::test]
    async fn dry_run_leaves_database_untouched() {
        let (_dir, mut config) = setup(&export());
        config.reconcile.dry_run = true;

        let report = run_sync(&config).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.added, 2);
        assert_eq!(report.outcome_of("A1").map(|o| o.outcome), Some(Outcome::Added));

        config.reconcile.dry_run = false;
        let real = run_sync(&config).await.unwrap();
        assert_eq!(real.added, 2);
    }

    #[tokio::test]
    async fn missing_export_is_fatal() {
        let (dir, mut config) = setup(&export());
        config.source.path = Some(dir.path().join("missing.json"));

        let err = run_sync(&config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReconcileError>(),
            Some(ReconcileError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_connecting() {
        let (_dir, mut config) = setup(&export());
        config.source.path = None;

        assert!(run_sync(&config).await.is_err());
    }
}
