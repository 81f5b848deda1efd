//! Loading layer configurations from TOML or JSON.
//!
//! The format is picked from the file extension: `.json` goes through
//! `serde_json`, `.toml` (or no extension) through `toml`. Parse failures,
//! including a non-integer dimension, surface as
//! [`LayerError::Configuration`]. Structural validation stays with the
//! caller (`NormConfig::validate`, `LinearConfig::validate`, ...).

use std::{fs, path::Path};

use serde::de::DeserializeOwned;

use crate::{LayerError, Result};

/// Reads and deserialises a configuration file.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => from_json_str(&contents),
        Some("toml") | Some("tml") | None => from_toml_str(&contents),
        Some(other) => Err(LayerError::configuration(format!(
            "unsupported configuration extension '{other}'"
        ))),
    }?;
    log::debug!("loaded layer configuration from {}", path.display());
    Ok(config)
}

/// Deserialises a configuration from a TOML document.
pub fn from_toml_str<T: DeserializeOwned>(contents: &str) -> Result<T> {
    toml::from_str(contents).map_err(|err| LayerError::configuration(err.to_string()))
}

/// Deserialises a configuration from a JSON document.
pub fn from_json_str<T: DeserializeOwned>(contents: &str) -> Result<T> {
    serde_json::from_str(contents).map_err(|err| LayerError::configuration(err.to_string()))
}
