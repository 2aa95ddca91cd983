//! URI arithmetic for locating referenced documents.
//!
//! Base URIs are always absolute (`file://`, `http(s)://`, ...). Paths keep any
//! `..` that climbs above the root, which generic URL parsers silently drop, so
//! the split into components is done here rather than through a URL crate.

use std::fmt;

use crate::error::SpecError;

/// Components of a URI as needed for joining relative references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriParts {
    pub scheme: Option<String>,
    /// Everything between `://` and the path (userinfo, host and port).
    pub authority: String,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl UriParts {
    pub fn parse(uri: &str) -> Self {
        let (rest, fragment) = match uri.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (uri, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query.to_string())),
            None => (rest, None),
        };

        if let Some(idx) = rest.find("://") {
            let scheme = &rest[..idx];
            if is_scheme(scheme) {
                let after = &rest[idx + 3..];
                let (authority, path) = match after.find('/') {
                    Some(slash) => (&after[..slash], &after[slash..]),
                    None => (after, ""),
                };
                return Self {
                    scheme: Some(scheme.to_string()),
                    authority: authority.to_string(),
                    path: path.to_string(),
                    query,
                    fragment,
                };
            }
        }

        Self {
            scheme: None,
            authority: String::new(),
            path: rest.to_string(),
            query,
            fragment,
        }
    }
}

impl fmt::Display for UriParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}://", scheme)?;
        }
        write!(f, "{}{}", self.authority, self.path)?;
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = self.fragment.as_deref().filter(|q| !q.is_empty()) {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Returns true for Windows absolute paths such as `C:\specs\api.yaml`.
pub fn is_windows_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\'
}

fn windows_to_uri_path(path: &str) -> String {
    path.replace('\\', "/").replace(' ', "%20")
}

/// Remove `.` and `..` segments from a path.
///
/// The result always starts with `/`. A `..` that has nothing left to cancel is
/// kept, so `/../a` stays as it is.
pub fn reduce_dots(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.trim_start_matches('/').split('/') {
        match segment {
            "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Turn a base location into an absolute URI.
///
/// # Errors
///
/// Returns `SpecError::Unresolvable` for relative paths.
pub fn normalize_uri(uri: &str) -> Result<String, SpecError> {
    if uri.contains("://") {
        let mut parts = UriParts::parse(uri);
        if !parts.path.is_empty() {
            parts.path = reduce_dots(&parts.path);
        }
        return Ok(parts.to_string());
    }
    if uri.starts_with('/') {
        return Ok(format!("file://{}", reduce_dots(uri)));
    }
    if is_windows_drive(uri) {
        return Ok(format!("file://{}", reduce_dots(&windows_to_uri_path(uri))));
    }
    Err(SpecError::unresolvable(
        "Can not resolve references for a specification given as a relative path.",
    ))
}

/// Directory part of a path, without the trailing slash.
fn dirname(path: &str) -> &str {
    match path.replace('\\', "/").rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Resolve `candidate` against the absolute `base` URI.
///
/// Candidates with a scheme only get their path reduced. Otherwise an absolute
/// path replaces the base path and a relative one is joined to the base's
/// directory. The candidate's query and fragment always replace the base's.
///
/// # Errors
///
/// Returns `SpecError::Unresolvable` if the candidate has no path.
pub fn resolve_relative_uri(base: &str, candidate: &str) -> Result<String, SpecError> {
    let parts = UriParts::parse(candidate);
    if parts.scheme.is_some() {
        let mut parts = parts;
        if !parts.path.is_empty() {
            parts.path = reduce_dots(&parts.path);
        }
        return Ok(parts.to_string());
    }

    if is_windows_drive(candidate) {
        let (path, fragment) = match candidate.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (candidate, None),
        };
        let mut uri = format!("file:///{}", windows_to_uri_path(path));
        if let Some(fragment) = fragment {
            uri.push('#');
            uri.push_str(fragment);
        }
        return Ok(uri);
    }

    let mut base_parts = UriParts::parse(base);
    if parts.path.starts_with('/') {
        base_parts.path = reduce_dots(&parts.path);
    } else if !parts.path.is_empty() {
        let dir = dirname(&base_parts.path).trim_end_matches('/');
        base_parts.path = reduce_dots(&format!("{}/{}", dir, parts.path));
    } else {
        return Err(SpecError::unresolvable(format!(
            "Invalid URI: '{}'",
            candidate
        )));
    }
    base_parts.query = parts.query;
    base_parts.fragment = parts.fragment;

    Ok(base_parts.to_string())
}

/// Express the absolute `path` relative to the document at `base`.
///
/// Targets below the base directory become `./sub/file`; targets on the same
/// host climb with `../`. Anything else is returned unchanged.
pub fn make_relative_path(base: &str, path: &str) -> String {
    let base_dir = format!("{}/", dirname(base));
    if let Some(rest) = path.strip_prefix(&base_dir) {
        return format!("./{}", rest);
    }

    let base_parts = UriParts::parse(base);
    let target = UriParts::parse(path);
    if base_parts.scheme.is_none()
        || base_parts.scheme != target.scheme
        || base_parts.authority != target.authority
    {
        return path.to_string();
    }

    let from: Vec<&str> = dirname(&base_parts.path)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let to: Vec<&str> = target.path.split('/').filter(|s| !s.is_empty()).collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = "../".repeat(from.len() - common);
    relative.push_str(&to[common..].join("/"));
    if let Some(query) = target.query.filter(|q| !q.is_empty()) {
        relative.push('?');
        relative.push_str(&query);
    }
    if let Some(fragment) = target.fragment {
        relative.push('#');
        relative.push_str(&fragment);
    }
    relative
}
