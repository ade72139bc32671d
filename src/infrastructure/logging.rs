//! Logging system configuration and initialization
//!
//! Console output goes to stderr so stdout stays reserved for the run
//! report. File output is optional and written through a non-blocking
//! appender whose guard lives for the rest of the process.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use std::sync::Mutex;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "poster-sync.log";

// Keeps the file writer alive until exit
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging with custom configuration
///
/// `RUST_LOG` overrides `config.level` entirely:
/// ```bash
/// RUST_LOG="debug,sqlx::query=debug" poster-sync --source-file export.json
/// ```
/// Without it, `sqlx` and `reqwest` chatter is suppressed unless the
/// configured level asks for `trace`.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.level)?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.console_output {
        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(ChronoUtc::rfc_3339())
            .with_target(false);
        layers.push(if config.json_format {
            console.json().boxed()
        } else {
            console.boxed()
        });
    }

    if config.file_output {
        std::fs::create_dir_all(&config.directory).map_err(|e| {
            anyhow!(
                "Failed to create log directory {}: {e}",
                config.directory.display()
            )
        })?;
        let (writer, guard) = non_blocking(rolling::never(&config.directory, LOG_FILE_NAME));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("log guard registry poisoned"))?
            .push(guard);

        let file = fmt::layer()
            .with_writer(writer)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false);
        layers.push(if config.json_format {
            file.json().boxed()
        } else {
            file.with_target(false).boxed()
        });
    }

    Registry::default()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    debug!(
        level = %config.level,
        json = config.json_format,
        file = config.file_output,
        "logging initialized"
    );
    Ok(())
}

/// Filter for `level`, quieting dependency internals unless tracing
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(level)
        .map_err(|e| anyhow!("Invalid log level '{level}': {e}"))?;

    if !level.to_lowercase().contains("trace") {
        for directive in [
            "sqlx::query=warn",
            "sqlx::sqlite=warn",
            "reqwest=info",
            "hyper=warn",
            "hyper_util=warn",
            "rustls=warn",
        ] {
            filter = filter.add_directive(directive.parse()?);
        }
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_quiets_dependencies() -> Result<()> {
        let filter = build_filter("debug")?;
        let rendered = filter.to_string();
        assert!(rendered.contains("sqlx::query=warn"));
        assert!(rendered.contains("reqwest=info"));
        Ok(())
    }

    #[test]
    fn test_trace_level_keeps_dependencies() -> Result<()> {
        let filter = build_filter("trace")?;
        assert!(!filter.to_string().contains("sqlx::query"));
        Ok(())
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        assert!(build_filter("poster_sync=loud").is_err());
    }
}
