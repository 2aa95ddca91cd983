//! Document loading from files and URLs.
//!
//! Text is turned into a generic `serde_json::Value` tree. Content starting with
//! `{` is parsed as JSON, everything else as YAML.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SpecError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Read a local file as text.
///
/// # Errors
///
/// Returns `SpecError::Io` if the file is missing or unreadable.
pub fn load_file(path: &Path) -> Result<String, SpecError> {
    std::fs::read_to_string(path).map_err(|e| SpecError::Io {
        uri: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Fetch a document over HTTP(S) as text.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `SpecError::Network` if the request fails or the server answers with
/// an error status.
#[cfg(feature = "remote")]
pub fn load_url(url: &str) -> Result<String, SpecError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| SpecError::Network {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| SpecError::Network {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before reading the body
    let response = response
        .error_for_status()
        .map_err(|source| SpecError::Network {
            url: url.to_string(),
            source,
        })?;

    response.text().map_err(|source| SpecError::Network {
        url: url.to_string(),
        source,
    })
}

/// Read the text behind an absolute URI (`file://` or `http(s)://`).
///
/// # Errors
///
/// Returns `SpecError::Io` for unreadable files and unsupported schemes.
pub fn load_uri(uri: &str) -> Result<String, SpecError> {
    debug!(uri, "reading document");
    if is_url(uri) {
        #[cfg(feature = "remote")]
        {
            return load_url(uri);
        }
        #[cfg(not(feature = "remote"))]
        {
            return Err(SpecError::Io {
                uri: uri.to_string(),
                message: "remote documents require the `remote` feature".to_string(),
            });
        }
    }

    let Some(path) = uri.strip_prefix("file://") else {
        return Err(SpecError::Io {
            uri: uri.to_string(),
            message: "unsupported URI scheme".to_string(),
        });
    };
    let path = urlencoding::decode(path).map_err(|e| SpecError::Io {
        uri: uri.to_string(),
        message: e.to_string(),
    })?;
    // file:///C:/x -> C:/x
    let path = match path.as_bytes() {
        [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => &path[1..],
        _ => &path[..],
    };
    std::fs::read_to_string(path).map_err(|e| SpecError::Io {
        uri: uri.to_string(),
        message: e.to_string(),
    })
}

/// Parse document text, sniffing JSON versus YAML.
///
/// # Errors
///
/// Returns `SpecError::Parse` on syntax errors.
pub fn parse_document(text: &str, uri: &str) -> Result<Value, SpecError> {
    if text.trim_start().starts_with('{') {
        parse_json(text, uri)
    } else {
        parse_yaml(text, uri)
    }
}

/// Parse JSON text.
///
/// # Errors
///
/// Returns `SpecError::Parse` on syntax errors.
pub fn parse_json(text: &str, uri: &str) -> Result<Value, SpecError> {
    serde_json::from_str(text).map_err(|e| SpecError::Parse {
        uri: uri.to_string(),
        message: e.to_string(),
    })
}

/// Parse YAML text into a JSON tree.
///
/// # Errors
///
/// Returns `SpecError::Parse` on syntax errors or keys that cannot become strings.
pub fn parse_yaml(text: &str, uri: &str) -> Result<Value, SpecError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| SpecError::Parse {
        uri: uri.to_string(),
        message: e.to_string(),
    })?;
    yaml_to_json(yaml).map_err(|message| SpecError::Parse {
        uri: uri.to_string(),
        message,
    })
}

/// Convert a YAML value into JSON.
///
/// Scalar keys are stringified (`200:` becomes `"200"`); tags are dropped.
pub fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => yaml_number(&n),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        other => Err(format!("unsupported mapping key: {:?}", other)),
    }
}
