//! Writing documents as JSON or YAML.

use std::path::Path;

use crate::error::SpecError;
use crate::object::SpecObject;

/// Pretty-printed JSON of `object`.
///
/// # Errors
///
/// Returns `SpecError::Write` if serialization fails.
pub fn write_to_json(object: &SpecObject) -> Result<String, SpecError> {
    serde_json::to_string_pretty(&object.get_serializable_data()).map_err(|e| SpecError::Write {
        message: e.to_string(),
    })
}

/// YAML of `object`.
///
/// # Errors
///
/// Returns `SpecError::Write` if serialization fails.
pub fn write_to_yaml(object: &SpecObject) -> Result<String, SpecError> {
    serde_yaml::to_string(&object.get_serializable_data()).map_err(|e| SpecError::Write {
        message: e.to_string(),
    })
}

/// Write `object` as JSON to `path`.
///
/// # Errors
///
/// Returns `SpecError::Io` if the file cannot be written.
pub fn write_to_json_file(object: &SpecObject, path: &Path) -> Result<(), SpecError> {
    write_file(path, &write_to_json(object)?)
}

/// Write `object` as YAML to `path`.
///
/// # Errors
///
/// Returns `SpecError::Io` if the file cannot be written.
pub fn write_to_yaml_file(object: &SpecObject, path: &Path) -> Result<(), SpecError> {
    write_file(path, &write_to_yaml(object)?)
}

fn write_file(path: &Path, content: &str) -> Result<(), SpecError> {
    std::fs::write(path, content).map_err(|e| SpecError::Io {
        uri: path.display().to_string(),
        message: e.to_string(),
    })
}
