//! Configuration loading and tracing setup.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use sppmon_core::InstallerConfig;
use tracing_subscriber::EnvFilter;

use super::Args;

pub(super) fn load_config(args: &Args, root: &Path) -> Result<InstallerConfig> {
    match args.config.as_ref() {
        Some(path) => InstallerConfig::load_from_path(path).context("read config from path"),
        None => InstallerConfig::load_for_root(root).context("read default config"),
    }
}

/// Route tracing output to the install log; the console stays for the operator.
pub(super) fn init_tracing(config: &InstallerConfig, log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("open install log {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            config
                .general
                .log_level
                .clone()
                .unwrap_or_else(|| "info".to_string()),
        )
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
