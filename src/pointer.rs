//! RFC 6901 JSON Pointer.
//!
//! A pointer is kept in its escaped string form; segments are decoded on demand.
//! Evaluation works against anything implementing [`Navigate`], which covers raw
//! `serde_json::Value` trees and the typed document model alike.

use std::fmt;

use serde_json::Value;

use crate::error::SpecError;

/// Result of looking up one pointer segment in a container.
pub enum Child<T> {
    /// The segment exists.
    Found(T),
    /// The container exists but has no such member.
    Missing(Container),
    /// The current value cannot be indexed at all.
    Scalar,
}

/// Container flavor, used in "has no member" messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Array,
    Object,
}

impl Container {
    fn name(self) -> &'static str {
        match self {
            Container::Array => "Array",
            Container::Object => "Object",
        }
    }
}

/// A tree that a pointer can walk one segment at a time.
pub trait Navigate: Sized {
    fn child(&self, segment: &str) -> Child<Self>;
}

impl<'a> Navigate for &'a Value {
    fn child(&self, segment: &str) -> Child<Self> {
        match *self {
            Value::Object(map) => match map.get(segment) {
                Some(value) => Child::Found(value),
                None => Child::Missing(Container::Array),
            },
            Value::Array(items) => match array_index(segment).and_then(|i| items.get(i)) {
                Some(value) => Child::Found(value),
                None => Child::Missing(Container::Array),
            },
            _ => Child::Scalar,
        }
    }
}

/// Parses an array index segment.
///
/// Only canonical decimal indices are accepted; `-` (the append position) never
/// addresses an existing element.
pub fn array_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    segment.parse().ok()
}

/// An immutable JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPointer {
    pointer: String,
}

impl JsonPointer {
    /// Parse a pointer string.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::MalformedPointer` unless the string is empty or starts with `/`.
    pub fn parse(pointer: &str) -> Result<Self, SpecError> {
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(SpecError::MalformedPointer {
                pointer: pointer.to_string(),
                message: "pointer must be empty or start with '/'".to_string(),
            });
        }
        Ok(Self {
            pointer: pointer.to_string(),
        })
    }

    /// The pointer to the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.pointer
    }

    pub fn is_root(&self) -> bool {
        self.pointer.is_empty()
    }

    /// Decoded path segments.
    pub fn path(&self) -> Vec<String> {
        if self.pointer.is_empty() {
            return Vec::new();
        }
        self.pointer[1..].split('/').map(decode).collect()
    }

    /// Returns a new pointer with `segment` appended.
    pub fn append(&self, segment: &str) -> Self {
        Self {
            pointer: format!("{}/{}", self.pointer, encode(segment)),
        }
    }

    /// Returns the pointer to the parent node, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.pointer.is_empty() {
            return None;
        }
        let idx = self.pointer.rfind('/')?;
        Some(Self {
            pointer: self.pointer[..idx].to_string(),
        })
    }

    /// Walk `document` along this pointer.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::NonexistentPointer` when a segment is missing or a
    /// scalar is indexed.
    pub fn evaluate<T: Navigate>(&self, document: T) -> Result<T, SpecError> {
        let mut current = document;
        let mut current_path = String::new();

        for part in self.path() {
            current = match current.child(&part) {
                Child::Found(next) => next,
                Child::Missing(container) => {
                    return Err(self.nonexistent(format!(
                        "Failed to evaluate pointer '{}'. {} has no member {} at path '{}'.",
                        self.pointer,
                        container.name(),
                        part,
                        current_path
                    )))
                }
                Child::Scalar => {
                    return Err(self.nonexistent(format!(
                        "Failed to evaluate pointer '{}'. Value at path '{}' is neither an array nor an object.",
                        self.pointer, current_path
                    )))
                }
            };
            current_path.push('/');
            current_path.push_str(&part);
        }

        Ok(current)
    }

    fn nonexistent(&self, message: String) -> SpecError {
        SpecError::NonexistentPointer {
            pointer: self.pointer.clone(),
            message,
            context: None,
        }
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pointer)
    }
}

/// Escape a string for use as a pointer segment.
pub fn encode(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescape a pointer segment.
pub fn decode(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
