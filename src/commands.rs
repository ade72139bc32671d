//! Commands exposed to the operator binary

pub mod sync_commands;

pub use sync_commands::{build_source, run_sync};
