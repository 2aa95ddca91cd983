//! Core types shared by the document model and the resolver.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key of the reference marker inside a document node.
pub const REF_KEY: &str = "$ref";

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(3\.(0|1))\.\d+(-rc\d)?$").expect("version pattern is valid")
});

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns the `$ref` value when `value` is a reference marker.
pub fn ref_marker(value: &Value) -> Option<&Value> {
    value.as_object().and_then(|map| map.get(REF_KEY))
}

/// Major version of the document being read.
///
/// Every node inherits the version of the `OpenApi` root it was built under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpenApiVersion {
    #[serde(rename = "3.0")]
    V3_0,
    #[serde(rename = "3.1")]
    V3_1,
    #[default]
    #[serde(rename = "unsupported")]
    Unsupported,
}

impl OpenApiVersion {
    /// Detect the major version from an `openapi` field value.
    ///
    /// Returns `None` when the value does not look like a 3.0 or 3.1 version.
    pub fn detect(openapi: &str) -> Option<Self> {
        let captures = VERSION_PATTERN.captures(openapi)?;
        match captures.get(1).map(|m| m.as_str()) {
            Some("3.0") => Some(OpenApiVersion::V3_0),
            Some("3.1") => Some(OpenApiVersion::V3_1),
            _ => None,
        }
    }

    /// Returns true when `openapi` is a supported version string.
    pub fn is_supported(openapi: &str) -> bool {
        VERSION_PATTERN.is_match(openapi)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpenApiVersion::V3_0 => "3.0",
            OpenApiVersion::V3_1 => "3.1",
            OpenApiVersion::Unsupported => "unsupported",
        }
    }
}

/// Which references a resolution pass dereferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Every reference except cycles.
    #[default]
    All,
    /// Only references into other documents; same-document references stay.
    Inline,
}

impl ResolveMode {
    /// Parse a mode name (`all` or `inline`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ResolveMode::All),
            "inline" => Some(ResolveMode::Inline),
            _ => None,
        }
    }
}

/// What happens when a single reference cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailurePolicy {
    /// Return the error to the caller.
    #[default]
    Fail,
    /// Record the message on the reference node and keep it unresolved.
    Record,
}

/// Options for reading a document from a file or URL.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Resolution mode, or `None` to leave references untouched.
    pub resolve: Option<ResolveMode>,
    /// Policy applied to unresolvable references.
    pub failure_policy: FailurePolicy,
}

impl ReadOptions {
    /// Create read options that resolve every reference and fail on the first error.
    pub fn new() -> Self {
        Self {
            resolve: Some(ResolveMode::All),
            failure_policy: FailurePolicy::Fail,
        }
    }

    /// Set the resolution mode (`None` disables resolution).
    pub fn resolve(mut self, mode: Option<ResolveMode>) -> Self {
        self.resolve = mode;
        self
    }

    /// Record unresolvable references as node errors instead of failing.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.failure_policy = if lenient {
            FailurePolicy::Record
        } else {
            FailurePolicy::Fail
        };
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detect_versions() {
        assert_eq!(OpenApiVersion::detect("3.0.0"), Some(OpenApiVersion::V3_0));
        assert_eq!(OpenApiVersion::detect("3.0.3"), Some(OpenApiVersion::V3_0));
        assert_eq!(OpenApiVersion::detect("3.1.0"), Some(OpenApiVersion::V3_1));
        assert_eq!(OpenApiVersion::detect("3.1.0-rc1"), Some(OpenApiVersion::V3_1));
        assert_eq!(OpenApiVersion::detect("3.1.0-RC1"), Some(OpenApiVersion::V3_1));
        assert_eq!(OpenApiVersion::detect("2.0"), None);
        assert_eq!(OpenApiVersion::detect("3.2.0"), None);
        assert_eq!(OpenApiVersion::detect("3.0"), None);
    }

    #[test]
    fn resolve_mode_parse() {
        assert_eq!(ResolveMode::parse("all"), Some(ResolveMode::All));
        assert_eq!(ResolveMode::parse("inline"), Some(ResolveMode::Inline));
        assert_eq!(ResolveMode::parse("none"), None);
    }

    #[test]
    fn read_options_builder() {
        let opts = ReadOptions::new();
        assert_eq!(opts.resolve, Some(ResolveMode::All));
        assert_eq!(opts.failure_policy, FailurePolicy::Fail);

        let opts = ReadOptions::new()
            .resolve(Some(ResolveMode::Inline))
            .lenient(true);
        assert_eq!(opts.resolve, Some(ResolveMode::Inline));
        assert_eq!(opts.failure_policy, FailurePolicy::Record);

        let opts = ReadOptions::new().resolve(None);
        assert_eq!(opts.resolve, None);
    }

    #[test]
    fn read_options_default_matches_new() {
        let opts = ReadOptions::default();
        assert_eq!(opts.resolve, Some(ResolveMode::All));
        assert_eq!(opts.failure_policy, FailurePolicy::Fail);
    }

    #[test]
    fn ref_marker_detection() {
        assert_eq!(
            ref_marker(&json!({"$ref": "#/a"})),
            Some(&json!("#/a"))
        );
        assert_eq!(ref_marker(&json!({"type": "string"})), None);
        assert_eq!(ref_marker(&json!("$ref")), None);
    }
}
