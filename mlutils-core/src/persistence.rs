//! File persistence helpers: atomic writes and structured-text load/save.
//!
//! Documents are written to a `.tmp` sibling and renamed into place, so a
//! reader never observes a half-written split file or checkpoint.

use crate::error::MlError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::Path;

/// Structured-text formats understood by [`save_document`] and [`load_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from the file extension. Anything other than `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Atomically write raw bytes to `path`, creating parent directories.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Atomically write `data` as pretty-printed JSON.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), MlError> {
    let json = serde_json::to_string_pretty(data)?;
    atomic_write(path, json.as_bytes())?;
    Ok(())
}

/// Serialize `data` in the format implied by the extension of `path` and write it atomically.
pub fn save_document<T: Serialize>(path: &Path, data: &T) -> Result<(), MlError> {
    match DocumentFormat::from_path(path) {
        DocumentFormat::Json => atomic_write_json(path, data),
        DocumentFormat::Yaml => {
            let yaml = serde_yaml::to_string(data)?;
            atomic_write(path, yaml.as_bytes())?;
            Ok(())
        }
    }
}

/// Read and deserialize a document written by [`save_document`].
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, MlError> {
    let content = std::fs::read_to_string(path)?;
    let value = match DocumentFormat::from_path(path) {
        DocumentFormat::Json => serde_json::from_str(&content)?,
        DocumentFormat::Yaml => serde_yaml::from_str(&content)?,
    };
    Ok(value)
}
