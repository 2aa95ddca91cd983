//! Resolution environment shared by the references of one document.

use std::rc::{Rc, Weak};

use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::cache::{CacheEntry, ContextCache, FILE_CONTENT};
use crate::document_reference::DocumentReference;
use crate::error::SpecError;
use crate::loader::{load_uri, parse_document};
use crate::object::SpecObject;
use crate::pointer::JsonPointer;
use crate::property::{ObjectRef, Property};
use crate::reference::Reference;
use crate::target::ReferenceTarget;
use crate::types::{ref_marker, FailurePolicy, OpenApiVersion, ResolveMode, REF_KEY};
use crate::uri;

/// Base document, base URI, memo cache, mode and failure policy of a
/// resolution pass.
///
/// Built once and then shared as `Rc<ReferenceContext>`; references hold it
/// weakly, so the owner (usually a [`crate::Document`]) must keep it alive.
#[derive(Debug)]
pub struct ReferenceContext {
    base_spec: Option<Weak<SpecObject>>,
    uri: String,
    cache: Rc<ContextCache>,
    mode: ResolveMode,
    failure_policy: FailurePolicy,
}

impl ReferenceContext {
    /// Create a context for the document at `uri`.
    ///
    /// `base_spec` is the already-built root of that document; without it,
    /// same-document references are resolved by reading the file again.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::Unresolvable` if `uri` is a relative path.
    pub fn new(base_spec: Option<&ObjectRef>, uri: &str) -> Result<Self, SpecError> {
        Ok(Self {
            base_spec: base_spec.map(Rc::downgrade),
            uri: uri::normalize_uri(uri)?,
            cache: Rc::new(ContextCache::new()),
            mode: ResolveMode::All,
            failure_policy: FailurePolicy::Fail,
        })
    }

    /// Share `cache` with another context.
    pub fn with_cache(mut self, cache: Rc<ContextCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn base_spec(&self) -> Option<ObjectRef> {
        self.base_spec.as_ref().and_then(Weak::upgrade)
    }

    /// Absolute URI of the base document.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn cache(&self) -> &Rc<ContextCache> {
        &self.cache
    }

    pub fn mode(&self) -> ResolveMode {
        self.mode
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Resolve `uri` against the base URI.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::Unresolvable` if `uri` has no path.
    pub fn resolve_relative_uri(&self, uri: &str) -> Result<String, SpecError> {
        uri::resolve_relative_uri(&self.uri, uri)
    }

    /// Parsed content of the document at absolute `uri`, read at most once.
    ///
    /// # Errors
    ///
    /// Returns IO or parse errors of the first read.
    pub fn fetch_referenced_file(&self, uri: &str) -> Result<Rc<Value>, SpecError> {
        if let Some(content) = self.cache.file(uri) {
            debug!(uri, "document served from cache");
            return Ok(content);
        }
        debug!(uri, "fetching referenced document");
        let text = load_uri(uri)?;
        let content = Rc::new(parse_document(&text, uri)?);
        self.cache.set_file(uri, Rc::clone(&content));
        Ok(content)
    }

    /// Evaluate `pointer` in `data` (the content of `uri`) and build the result.
    ///
    /// Results are memoized under `uri#pointer` and the target's key, so a
    /// second lookup returns the same node. Null results and reference markers
    /// are never memoized; a marker comes back as a new [`Reference`] carrying
    /// `target`.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::NonexistentPointer` if the pointer does not resolve.
    pub fn resolve_reference_data(
        &self,
        uri: &str,
        pointer: &JsonPointer,
        data: &Value,
        target: Option<&ReferenceTarget>,
        version: OpenApiVersion,
    ) -> Result<Property, SpecError> {
        let key = DocumentReference::new(uri, pointer.clone()).to_string();
        let type_key = target.map(ReferenceTarget::as_string);

        if let Some(CacheEntry::Resolved(cached)) = self.cache.get(&key, type_key.as_deref()) {
            trace!(reference = %key, "reference served from cache");
            return Ok(cached);
        }

        let found = pointer.evaluate(data)?;
        if found.is_null() {
            return Ok(Property::null());
        }
        if ref_marker(found).is_some() {
            let reference = Reference::from_value(found, version, target.cloned())?;
            return Ok(Property::Reference(reference));
        }

        let parsed = match target {
            Some(target) => target.create_instance(found)?.map(Property::Object),
            None => None,
        };
        let parsed = parsed.unwrap_or_else(|| Property::Value(found.clone()));
        self.cache.set(
            &key,
            type_key.as_deref(),
            CacheEntry::Resolved(parsed.clone()),
        );
        Ok(parsed)
    }

    /// Content of the document at `file` with its references rewritten relative
    /// to this context's base document.
    ///
    /// References into `file` itself are inlined; a reference met again while
    /// inlining is kept as an absolute reference. References to other
    /// documents and `externalValue` links are made relative to the base URI.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::NonexistentPointer` for dangling same-file references.
    pub fn adjusted_document(&self, file: &str, content: &Value) -> Result<Rc<Value>, SpecError> {
        let key = format!("{}://{}", FILE_CONTENT, file);
        if let Some(CacheEntry::File(adjusted)) = self.cache.get(&key, Some(self.uri())) {
            return Ok(adjusted);
        }
        let adjusted = Rc::new(self.adjust_relative_references(content, file, content, false)?);
        self.cache
            .set(&key, Some(self.uri()), CacheEntry::File(Rc::clone(&adjusted)));
        Ok(adjusted)
    }

    fn adjust_relative_references(
        &self,
        value: &Value,
        base_path: &str,
        file_root: &Value,
        inside_inline: bool,
    ) -> Result<Value, SpecError> {
        match value {
            Value::Object(map) => {
                let mut adjusted = Map::new();
                for (key, item) in map {
                    match (key.as_str(), item) {
                        (REF_KEY, Value::String(reference)) if reference.starts_with('#') => {
                            let pointer = DocumentReference::parse(reference)?;
                            let inlined = pointer.pointer().evaluate(file_root)?;
                            if inside_inline {
                                let absolute = format!("{}{}", base_path, reference);
                                return Ok(json!({ REF_KEY: absolute }));
                            }
                            return self.adjust_relative_references(
                                inlined,
                                base_path,
                                file_root,
                                true,
                            );
                        }
                        (REF_KEY, Value::String(reference)) => {
                            let absolute = uri::resolve_relative_uri(base_path, reference)?;
                            adjusted.insert(
                                key.clone(),
                                Value::String(self.relative_to_base(&absolute)),
                            );
                        }
                        ("externalValue", Value::String(external)) => {
                            let absolute = uri::resolve_relative_uri(base_path, external)?;
                            adjusted.insert(
                                key.clone(),
                                Value::String(uri::make_relative_path(&self.uri, &absolute)),
                            );
                        }
                        _ => {
                            let item = self.adjust_relative_references(
                                item,
                                base_path,
                                file_root,
                                inside_inline,
                            )?;
                            adjusted.insert(key.clone(), item);
                        }
                    }
                }
                Ok(Value::Object(adjusted))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    self.adjust_relative_references(item, base_path, file_root, inside_inline)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    /// `#fragment` for targets inside the base document, a relative path otherwise.
    fn relative_to_base(&self, absolute: &str) -> String {
        let (document, fragment) = match absolute.split_once('#') {
            Some((document, fragment)) => (document, Some(fragment)),
            None => (absolute, None),
        };
        if document == self.uri {
            return format!("#{}", fragment.unwrap_or(""));
        }
        uri::make_relative_path(&self.uri, absolute)
    }
}
