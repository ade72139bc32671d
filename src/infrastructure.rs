//! Infrastructure layer for storage, sources, configuration and logging
//!
//! Concrete implementations of the domain's `TargetStore` and
//! `ProductSource` traits live here, next to the process-wide concerns
//! the binary wires up before a run.

pub mod config;
pub mod database_connection;
pub mod dry_run_store;
pub mod firestore_source;
pub mod json_source;
pub mod logging;
pub mod memory_store;
pub mod product_repository;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, SourceKind};
pub use database_connection::DatabaseConnection;
pub use dry_run_store::{DryRunStore, IntendedWrite};
pub use firestore_source::FirestoreSource;
pub use json_source::JsonExportSource;
pub use memory_store::{InMemoryProductStore, InMemorySource};
pub use product_repository::SqliteProductStore;
