//! Configuration file loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a TOML configuration file into a typed config struct
///
/// A missing file is not an error (services fall back to environment
/// variables and compiled defaults); a file that exists but fails to parse
/// is.
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(Error::Config(format!(
                "Failed to read config file {:?}: {}",
                path, e
            )))
        }
    };

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", path, e)))?;

    Ok(Some(config))
}
