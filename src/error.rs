//! Error types for document loading and reference resolution.
//!
//! Fatal problems are returned as [`SpecError`]. Shape and rule violations found
//! while building or validating a document are not errors in this sense; they are
//! collected on each node and reported through `get_errors()`.

use thiserror::Error;

/// Fatal errors raised while reading, building or resolving a document.
#[derive(Debug, Error)]
pub enum SpecError {
    // IO errors (exit code 3)
    #[error("Failed to read file: '{uri}': {message}")]
    Io { uri: String, message: String },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse and shape errors (exit code 2)
    #[error("failed to parse {uri}: {message}")]
    Parse { uri: String, message: String },

    #[error("{message}")]
    TypeError { message: String },

    #[error("JSON Reference Object must contain the \"$ref\" member.")]
    MalformedReference,

    #[error("invalid JSON pointer syntax '{pointer}': {message}")]
    MalformedPointer { pointer: String, message: String },

    #[error("failed to serialize document: {message}")]
    Write { message: String },

    #[error("Getting unknown property: {kind}::{name}")]
    UnknownProperty { kind: String, name: String },

    // Resolution errors (exit code 2)
    #[error("{message}{}", at(.context))]
    NonexistentPointer {
        pointer: String,
        message: String,
        context: Option<String>,
    },

    #[error("{message}{}", at(.context))]
    Unresolvable {
        message: String,
        context: Option<String>,
    },

    #[error("Cyclic reference detected on a Reference Object.{}", at(.context))]
    CyclicReference { context: Option<String> },
}

fn at(context: &Option<String>) -> String {
    match context {
        Some(position) => format!(" (at {})", position),
        None => String::new(),
    }
}

impl SpecError {
    /// Shorthand for an [`SpecError::Unresolvable`] without position.
    pub fn unresolvable(message: impl Into<String>) -> Self {
        SpecError::Unresolvable {
            message: message.into(),
            context: None,
        }
    }

    /// Returns the document position attached to a resolution error, if any.
    pub fn context(&self) -> Option<&str> {
        match self {
            SpecError::NonexistentPointer { context, .. }
            | SpecError::Unresolvable { context, .. }
            | SpecError::CyclicReference { context } => context.as_deref(),
            _ => None,
        }
    }

    /// Attaches a document position to resolution errors that do not carry one yet.
    pub fn with_context(mut self, position: Option<String>) -> Self {
        match &mut self {
            SpecError::NonexistentPointer { context, .. }
            | SpecError::Unresolvable { context, .. }
            | SpecError::CyclicReference { context } => {
                if context.is_none() {
                    *context = position;
                }
            }
            _ => {}
        }
        self
    }

    /// The message without the position suffix.
    pub fn message(&self) -> String {
        match self {
            SpecError::NonexistentPointer { message, .. }
            | SpecError::Unresolvable { message, .. } => message.clone(),
            SpecError::CyclicReference { .. } => {
                "Cyclic reference detected on a Reference Object.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SpecError::Io { .. } => 3,
            #[cfg(feature = "remote")]
            SpecError::Network { .. } => 3,
            _ => 2,
        }
    }
}
