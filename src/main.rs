//! poster-sync: reconcile the storefront product store with the source catalogue
//!
//! Prints the run report to stdout; logs go to stderr. Exits non-zero only
//! when configuration is invalid or the source or target cannot be read.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use poster_sync::commands::run_sync;
use poster_sync::infrastructure::config::{AppConfig, SourceKind};
use poster_sync::infrastructure::logging::init_logging_with_config;
use poster_sync::ReconciliationReport;

#[derive(Parser, Debug)]
#[command(name = "poster-sync", version)]
#[command(about = "Converge the product store to the source catalogue")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "POSTER_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Target database URL (overrides config)
    #[arg(long)]
    database_url: Option<String>,

    /// Read the source catalogue from this export file (overrides config)
    #[arg(long)]
    source_file: Option<PathBuf>,

    /// Classify every record but issue no writes
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long, conflicts_with = "verbose")]
    json: bool,

    /// List changed fields of updated records
    #[arg(short, long)]
    verbose: bool,

    /// Log level or filter directives (overrides config; RUST_LOG wins)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref()).context("failed to load configuration")?;

        if let Some(url) = &self.database_url {
            config.database.url.clone_from(url);
        }
        if let Some(path) = &self.source_file {
            config.source.kind = SourceKind::File;
            config.source.path = Some(path.clone());
        }
        if self.dry_run {
            config.reconcile.dry_run = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn render(&self, report: &ReconciliationReport) -> Result<String> {
        if self.json {
            return serde_json::to_string_pretty(report).context("failed to encode report");
        }
        Ok(if self.verbose {
            report.verbose().to_string()
        } else {
            report.to_string()
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("poster-sync: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging_with_config(&config.logging) {
        eprintln!("poster-sync: {e:#}");
        return ExitCode::FAILURE;
    }

    match run_sync(&config).await.and_then(|report| cli.render(&report)) {
        Ok(output) => {
            println!("{}", output.trim_end());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("reconciliation aborted: {e:#}");
            eprintln!("poster-sync: {e:#}");
            ExitCode::FAILURE
        }
    }
}
