//! CLI argument definitions for the analyst REPL.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Interactive client for the System Impact Analyst service.
#[derive(Parser, Debug)]
#[command(name = "analyst", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory holding the session database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Analysis service endpoint URL.
    #[arg(short = 'e', long = "endpoint")]
    pub endpoint: Option<String>,

    /// Keep sessions in memory only; nothing is written to disk.
    #[arg(long = "ephemeral")]
    pub ephemeral: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ANALYST_CONFIG env var > ~/.analyst/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ANALYST_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the endpoint URL.
    ///
    /// Priority: --endpoint flag > ANALYST_ENDPOINT env var > config file value.
    pub fn resolve_endpoint(&self, config_endpoint: &str) -> String {
        if let Some(ref url) = self.endpoint {
            return url.clone();
        }
        match std::env::var("ANALYST_ENDPOINT") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => config_endpoint.to_string(),
        }
    }

    /// Returns `None` when the config file value should be used.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Resolve the tracing filter.
    ///
    /// Priority: --log-level flag > RUST_LOG env var > config file value.
    pub fn resolve_log_filter(&self, config_level: &str) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        match std::env::var("RUST_LOG") {
            Ok(filter) if !filter.trim().is_empty() => filter,
            _ => config_level.to_string(),
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".analyst").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".analyst").join("config.toml");
    }
    PathBuf::from("config.toml")
}
