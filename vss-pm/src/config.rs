//! Configuration resolution for vss-pm
//!
//! Two-tier resolution per key: environment (`VSS_PM_*`) overrides the
//! TOML config file, which overrides compiled defaults. The TOML file
//! path itself comes from `VSS_PM_CONFIG` (default `vss-pm.toml`); a
//! missing file just means TOML contributes nothing.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;
use vss_common::{Error, Result};

/// Optional settings read from the TOML config file
///
/// Every field is optional; anything absent falls through to the
/// compiled default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Interface the HTTP server binds to
    pub bind_address: Option<String>,

    /// HTTP server port
    pub port: Option<u16>,

    /// Path to the SQLite database file
    pub database_path: Option<PathBuf>,

    /// Base URL of the search shim service
    pub shim_base_url: Option<String>,

    /// Broadcast capacity of the event bus
    pub event_bus_capacity: Option<usize>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct PmConfig {
    /// Interface the HTTP server binds to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Base URL of the search shim service
    pub shim_base_url: String,

    /// Broadcast capacity of the event bus
    pub event_bus_capacity: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3020
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/vss.db")
}

fn default_shim_base_url() -> String {
    "http://localhost:3990".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}

impl PmConfig {
    /// Load configuration from environment and TOML file.
    ///
    /// TOML file path: `VSS_PM_CONFIG` env var, falling back to
    /// `vss-pm.toml` in the working directory.
    pub fn load() -> Result<Self> {
        let toml_path = std::env::var("VSS_PM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("vss-pm.toml"));

        let toml_config = match vss_common::config::load_toml_file::<TomlConfig>(&toml_path)? {
            Some(config) => {
                info!("Loaded TOML configuration from {}", toml_path.display());
                config
            }
            None => TomlConfig::default(),
        };

        Ok(Self {
            bind_address: env_value("VSS_PM_BIND_ADDRESS")
                .or(toml_config.bind_address)
                .unwrap_or_else(default_bind_address),
            port: resolve_port(env_value("VSS_PM_PORT").as_deref(), toml_config.port)?,
            database_path: env_value("VSS_PM_DATABASE_PATH")
                .map(PathBuf::from)
                .or(toml_config.database_path)
                .unwrap_or_else(default_database_path),
            shim_base_url: env_value("VSS_PM_SHIM_BASE_URL")
                .or(toml_config.shim_base_url)
                .unwrap_or_else(default_shim_base_url),
            event_bus_capacity: resolve_capacity(
                env_value("VSS_PM_EVENT_BUS_CAPACITY").as_deref(),
                toml_config.event_bus_capacity,
            )?,
        })
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Read an environment variable, treating empty values as unset
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the HTTP port from env string → TOML value → default
fn resolve_port(env: Option<&str>, toml: Option<u16>) -> Result<u16> {
    match env {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|e| Error::Config(format!("Invalid VSS_PM_PORT '{}': {}", raw, e))),
        None => Ok(toml.unwrap_or_else(default_port)),
    }
}

/// Resolve the event bus capacity from env string → TOML value → default
///
/// A zero capacity is rejected: tokio's broadcast channel requires at
/// least one slot.
fn resolve_capacity(env: Option<&str>, toml: Option<usize>) -> Result<usize> {
    let capacity = match env {
        Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
            Error::Config(format!("Invalid VSS_PM_EVENT_BUS_CAPACITY '{}': {}", raw, e))
        })?,
        None => toml.unwrap_or_else(default_event_bus_capacity),
    };

    if capacity == 0 {
        return Err(Error::Config(
            "event_bus_capacity must be at least 1".to_string(),
        ));
    }

    Ok(capacity)
}
