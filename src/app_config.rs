//! Application configuration loading for process-level settings.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use http_download_file::download::{
    ClientCacheConfig, ClientFactory, DEFAULT_SLIDING_EXPIRATION, DEFAULT_SWEEP_INTERVAL,
};

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Idle seconds before a cached client is evicted.
    pub sliding_expiration_secs: Option<u64>,
    /// Seconds between background cache sweeps.
    pub sweep_interval_secs: Option<u64>,
    /// Directory searched for thumbprint-selected client certificates.
    pub certificate_store_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against supported ranges.
    pub fn validate(&self) -> Result<()> {
        validate_range("sliding_expiration_secs", self.sliding_expiration_secs, 1, 86_400)?;
        validate_range("sweep_interval_secs", self.sweep_interval_secs, 1, 3_600)?;
        if let Some(dir) = &self.certificate_store_dir
            && dir.as_os_str().is_empty()
        {
            bail!("Invalid config value for `certificate_store_dir`: path must not be empty");
        }
        Ok(())
    }

    /// Cache timing settings, falling back to defaults.
    #[must_use]
    pub fn cache_config(&self) -> ClientCacheConfig {
        ClientCacheConfig {
            sliding_expiration: self
                .sliding_expiration_secs
                .map_or(DEFAULT_SLIDING_EXPIRATION, Duration::from_secs),
            sweep_interval: self
                .sweep_interval_secs
                .map_or(DEFAULT_SWEEP_INTERVAL, Duration::from_secs),
        }
    }

    /// Client factory configured with the certificate store, if any.
    #[must_use]
    pub fn client_factory(&self) -> ClientFactory {
        match &self.certificate_store_dir {
            Some(dir) => ClientFactory::new().with_certificate_store(dir),
            None => ClientFactory::new(),
        }
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/http-download-file/config.toml`
/// 2. `$HOME/.config/http-download-file/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("http-download-file")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("http-download-file")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from an explicit path, or from the default path when present.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return load_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
