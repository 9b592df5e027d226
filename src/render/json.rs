//! JSON rendering of outline and extraction artifacts.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::storage::write_atomic;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a value (usually an [`crate::OutlineDocument`]) to JSON.
pub fn to_json<T: Serialize>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Json(format!("serialization error: {}", e)))
}

/// Write a value as JSON, replacing the file atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T, format: JsonFormat) -> Result<()> {
    let json = to_json(value, format)?;
    write_atomic(path, json.as_bytes())
}

/// Read a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path)?;
    serde_json::from_slice(&data)
        .map_err(|e| Error::Json(format!("{}: {}", path.display(), e)))
}
