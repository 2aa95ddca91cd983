//! `uri#/json/pointer` references.

use std::fmt;

use serde_json::Value;

use crate::error::SpecError;
use crate::pointer::JsonPointer;
use crate::types::REF_KEY;

/// A document URI (empty for "this document") plus a pointer into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentReference {
    uri: String,
    pointer: JsonPointer,
}

impl DocumentReference {
    pub fn new(uri: impl Into<String>, pointer: JsonPointer) -> Self {
        Self {
            uri: uri.into(),
            pointer,
        }
    }

    /// Parse a `$ref` string.
    ///
    /// The string is split on the first `#`; the fragment is percent-decoded and
    /// parsed as a pointer. Without `#` the pointer is the document root.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::MalformedPointer` if the fragment is not a valid pointer.
    pub fn parse(reference: &str) -> Result<Self, SpecError> {
        let Some((uri, fragment)) = reference.split_once('#') else {
            return Ok(Self::new(reference, JsonPointer::root()));
        };
        let decoded =
            urlencoding::decode(fragment).map_err(|e| SpecError::MalformedPointer {
                pointer: fragment.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::new(uri, JsonPointer::parse(&decoded)?))
    }

    /// Parse a JSON Reference object such as `{"$ref": "a.yaml#/b"}`.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::MalformedReference` when the text is not an object with
    /// a string `$ref` member.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        let value: Value =
            serde_json::from_str(json).map_err(|_| SpecError::MalformedReference)?;
        let reference = value
            .get(REF_KEY)
            .and_then(Value::as_str)
            .ok_or(SpecError::MalformedReference)?;
        Self::parse(reference)
    }

    pub fn document_uri(&self) -> &str {
        &self.uri
    }

    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }

    /// The reference as a JSON Reference object.
    pub fn to_json(&self) -> Value {
        serde_json::json!({ REF_KEY: self.to_string() })
    }
}

impl fmt::Display for DocumentReference {
    /// Percent-encodes the pointer, keeping `/`, `?` and `~` literal as the
    /// fragment grammar allows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = urlencoding::encode(self.pointer.as_str())
            .replace("%2F", "/")
            .replace("%3F", "?")
            .replace("%7E", "~");
        write!(f, "{}#{}", self.uri, encoded)
    }
}
