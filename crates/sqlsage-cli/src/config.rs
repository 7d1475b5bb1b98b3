//! Locating and loading the analyzer configuration file

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use sqlsage_core::AnalyzerConfig;
use tracing::debug;

/// `<config dir>/sqlsage/config.toml`, when the platform has a config dir
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sqlsage").join("config.toml"))
}

/// Loads the configuration.
///
/// An explicit path must exist. Without one the default location is tried,
/// and a missing default file means built-in defaults.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<AnalyzerConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path().filter(|p| p.is_file()) {
            Some(path) => path,
            None => {
                debug!("no configuration file found, using defaults");
                return Ok(AnalyzerConfig::default());
            }
        },
    };
    load_file(&path)
}

pub fn load_file(path: &Path) -> anyhow::Result<AnalyzerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = AnalyzerConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    debug!(path = %path.display(), "configuration file read");
    Ok(config)
}
