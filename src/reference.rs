//! Reference nodes (`{"$ref": ...}`) and their resolution.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::context::ReferenceContext;
use crate::document_reference::DocumentReference;
use crate::error::SpecError;
use crate::object::{DocumentPosition, SpecObject};
use crate::pointer::JsonPointer;
use crate::property::{ObjectRef, Property, ReferenceRef};
use crate::target::ReferenceTarget;
use crate::types::{json_type_name, FailurePolicy, OpenApiVersion, ResolveMode, REF_KEY};

/// A `$ref` found in the document, together with what it should resolve to.
pub struct Reference {
    reference: String,
    json_reference: RefCell<Option<DocumentReference>>,
    target: RefCell<Option<ReferenceTarget>>,
    context: RefCell<Option<Weak<ReferenceContext>>>,
    version: OpenApiVersion,
    summary: Option<String>,
    description: Option<String>,
    errors: RefCell<Vec<String>>,
    position: RefCell<Option<DocumentPosition>>,
}

impl Reference {
    /// Build a reference from its JSON object form.
    ///
    /// Members other than `$ref` are recorded as errors (3.1 allows `summary`
    /// and `description`). An unparsable `$ref` is recorded too and leaves the
    /// reference unresolvable.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::TypeError` if `data` is not an object with a string `$ref`.
    pub fn from_value(
        data: &Value,
        version: OpenApiVersion,
        target: Option<ReferenceTarget>,
    ) -> Result<ReferenceRef, SpecError> {
        let map = match data.as_object() {
            Some(map) if map.contains_key(REF_KEY) => map,
            _ => {
                return Err(SpecError::TypeError {
                    message: format!("Unable to instantiate Reference Object with data '{}'", data),
                })
            }
        };
        let Some(reference) = map.get(REF_KEY).and_then(Value::as_str) else {
            return Err(SpecError::TypeError {
                message: format!(
                    "Unable to instantiate Reference Object, value of $ref must be a string, {} given.",
                    map.get(REF_KEY).map_or("null", json_type_name)
                ),
            });
        };

        let mut errors = Vec::new();
        match version {
            OpenApiVersion::V3_0 if map.len() > 1 => errors.push(
                "Reference: additional properties are given. Only $ref should be set in a Reference Object."
                    .to_string(),
            ),
            OpenApiVersion::V3_1
                if map
                    .keys()
                    .any(|k| !matches!(k.as_str(), REF_KEY | "summary" | "description")) =>
            {
                errors.push(
                    "Reference: only summary and description are allowed as additional properties."
                        .to_string(),
                )
            }
            _ => {}
        }

        let (summary, description) = if version == OpenApiVersion::V3_1 {
            let text = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_string);
            (text("summary"), text("description"))
        } else {
            (None, None)
        };

        let json_reference = match DocumentReference::parse(reference) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                errors.push(format!(
                    "Reference: value of $ref is not a valid JSON pointer: {}",
                    e
                ));
                None
            }
        };

        Ok(Rc::new(Self {
            reference: reference.to_string(),
            json_reference: RefCell::new(json_reference),
            target: RefCell::new(target),
            context: RefCell::new(None),
            version,
            summary,
            description,
            errors: RefCell::new(errors),
            position: RefCell::new(None),
        }))
    }

    /// The `$ref` string as written.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Parsed form of the `$ref`, `None` if it was invalid or failed to resolve.
    pub fn json_reference(&self) -> Option<DocumentReference> {
        self.json_reference.borrow().clone()
    }

    pub fn target(&self) -> Option<ReferenceTarget> {
        self.target.borrow().clone()
    }

    pub fn set_target(&self, target: Option<ReferenceTarget>) {
        *self.target.borrow_mut() = target;
    }

    pub fn version(&self) -> OpenApiVersion {
        self.version
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The context this reference resolves in, if it is still alive.
    pub fn context(&self) -> Option<Rc<ReferenceContext>> {
        self.context.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn set_context(&self, context: &Rc<ReferenceContext>) {
        *self.context.borrow_mut() = Some(Rc::downgrade(context));
    }

    pub fn position(&self) -> Option<DocumentPosition> {
        self.position.borrow().clone()
    }

    pub fn set_document_context(&self, document: &Weak<SpecObject>, pointer: JsonPointer) {
        *self.position.borrow_mut() = Some(DocumentPosition {
            document: document.clone(),
            pointer,
        });
    }

    /// Position as `#/json/pointer`, used to locate errors.
    pub fn position_string(&self) -> Option<String> {
        self.position
            .borrow()
            .as_ref()
            .map(|p| DocumentReference::new("", p.pointer.clone()).to_string())
    }

    /// True when no errors were recorded.
    pub fn validate(&self) -> bool {
        self.errors.borrow().is_empty()
    }

    /// Recorded errors, prefixed with `[pointer]` when the position is known.
    pub fn get_errors(&self) -> Vec<String> {
        let errors = self.errors.borrow();
        match self.position.borrow().as_ref() {
            Some(position) => errors
                .iter()
                .map(|e| format!("[{}] {}", position.pointer, e))
                .collect(),
            None => errors.clone(),
        }
    }

    /// `{"$ref": ...}` plus `summary` and `description` when present.
    pub fn get_serializable_data(&self) -> Value {
        let mut data = Map::new();
        data.insert(REF_KEY.to_string(), Value::String(self.reference.clone()));
        if let Some(summary) = &self.summary {
            data.insert("summary".to_string(), Value::String(summary.clone()));
        }
        if let Some(description) = &self.description {
            data.insert("description".to_string(), Value::String(description.clone()));
        }
        Value::Object(data)
    }

    /// Resolve this reference.
    ///
    /// Uses `context`, or the context stamped on the reference when `None`.
    /// Chains of references are followed; the result is a node, raw data, or a
    /// reference when the mode or the failure policy leaves one in place.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::CyclicReference` for reference loops, and resolution
    /// errors unless the context records them instead.
    pub fn resolve(
        self: &Rc<Self>,
        context: Option<&Rc<ReferenceContext>>,
    ) -> Result<Property, SpecError> {
        self.resolve_in_chain(context, &mut Vec::new())
    }

    fn resolve_in_chain(
        self: &Rc<Self>,
        context: Option<&Rc<ReferenceContext>>,
        chain: &mut Vec<String>,
    ) -> Result<Property, SpecError> {
        let context = match context {
            Some(context) => Rc::clone(context),
            None => self
                .context()
                .ok_or_else(|| SpecError::unresolvable("No context given for resolving reference."))?,
        };

        let Some(json_reference) = self.json_reference() else {
            return match context.failure_policy() {
                FailurePolicy::Record => Ok(Property::Reference(Rc::clone(self))),
                FailurePolicy::Fail => Err(SpecError::Unresolvable {
                    message: self.errors.borrow().join("\n"),
                    context: self.position_string(),
                }),
            };
        };

        match self.dereference(&context, json_reference, chain) {
            Ok(resolved) => Ok(self.overlay(resolved)),
            Err(err) => self.handle_failure(&context, err),
        }
    }

    fn dereference(
        self: &Rc<Self>,
        context: &Rc<ReferenceContext>,
        json_reference: DocumentReference,
        chain: &mut Vec<String>,
    ) -> Result<Property, SpecError> {
        if json_reference.document_uri().is_empty() {
            if context.mode() == ResolveMode::Inline {
                return Ok(Property::Reference(Rc::clone(self)));
            }
            if let Some(base) = context.base_spec() {
                let key = format!("{}#{}", context.uri(), json_reference.pointer());
                return self.within_chain(chain, key, |chain| {
                    debug!(reference = %self.reference, "resolving same-document reference");
                    let found = json_reference.pointer().evaluate(Property::Object(base))?;
                    self.settle(found, context, chain, true)
                });
            }
            return self.dereference(
                context,
                DocumentReference::new(context.uri(), json_reference.pointer().clone()),
                chain,
            );
        }

        let file = context.resolve_relative_uri(json_reference.document_uri())?;
        let key = format!("{}#{}", file, json_reference.pointer());
        self.within_chain(chain, key, |chain| {
            debug!(reference = %self.reference, uri = %file, "resolving external reference");
            let content = context
                .fetch_referenced_file(&file)
                .and_then(|content| context.adjusted_document(&file, &content))
                .map_err(|e| self.failed(e.message()))?;
            let target = self.target();
            let found = context.resolve_reference_data(
                &file,
                json_reference.pointer(),
                &content,
                target.as_ref(),
                self.version,
            )?;
            self.stamp_position(&found);
            self.settle(found, context, chain, false)
        })
    }

    /// Push `key` onto the chain of references being followed while `f` runs.
    fn within_chain<F>(&self, chain: &mut Vec<String>, key: String, f: F) -> Result<Property, SpecError>
    where
        F: FnOnce(&mut Vec<String>) -> Result<Property, SpecError>,
    {
        if chain.contains(&key) {
            return Err(SpecError::CyclicReference { context: None });
        }
        chain.push(key);
        let result = f(chain);
        chain.pop();
        result
    }

    /// Follow a reference found at the target, or prepare a node for use.
    fn settle(
        self: &Rc<Self>,
        found: Property,
        context: &Rc<ReferenceContext>,
        chain: &mut Vec<String>,
        same_document: bool,
    ) -> Result<Property, SpecError> {
        match found {
            Property::Reference(next) => {
                let follow = same_document
                    || context.mode() != ResolveMode::Inline
                    || !next.reference().starts_with('#');
                if follow {
                    return self.resolve_transitive(&next, context, chain);
                }
                next.set_context(context);
                Ok(Property::Reference(next))
            }
            Property::Object(object) => {
                object.set_reference_context(context);
                Ok(Property::Object(object))
            }
            other => Ok(other),
        }
    }

    fn resolve_transitive(
        self: &Rc<Self>,
        next: &ReferenceRef,
        context: &Rc<ReferenceContext>,
        chain: &mut Vec<String>,
    ) -> Result<Property, SpecError> {
        if Rc::ptr_eq(next, self) {
            return Err(SpecError::CyclicReference { context: None });
        }
        if next.target.borrow().is_none() {
            next.set_target(self.target());
        }
        next.set_context(context);
        let resolved = next.resolve_in_chain(Some(context), chain)?;
        if let Property::Reference(back) = &resolved {
            if Rc::ptr_eq(back, self) {
                return Err(SpecError::CyclicReference { context: None });
            }
        }
        Ok(resolved)
    }

    /// Give a node fetched from another document this reference's position.
    fn stamp_position(&self, found: &Property) {
        let Some(position) = self.position() else {
            return;
        };
        match found {
            Property::Object(object) if object.position().is_none() => {
                object.set_document_context(&position.document, position.pointer);
            }
            Property::Reference(reference) if reference.position().is_none() => {
                reference.set_document_context(&position.document, position.pointer);
            }
            _ => {}
        }
    }

    fn target_name(&self) -> String {
        self.target
            .borrow()
            .as_ref()
            .map_or_else(|| "Any".to_string(), ReferenceTarget::to_string)
    }

    fn failed(&self, message: String) -> SpecError {
        SpecError::Unresolvable {
            message: format!(
                "Failed to resolve Reference '{}' to {} Object: {}",
                self.reference,
                self.target_name(),
                message
            ),
            context: None,
        }
    }

    fn handle_failure(
        self: &Rc<Self>,
        context: &ReferenceContext,
        err: SpecError,
    ) -> Result<Property, SpecError> {
        let err = match err {
            SpecError::NonexistentPointer { message, .. } => self.failed(message),
            other => other,
        };
        let err = err.with_context(self.position_string());
        if !matches!(err, SpecError::Unresolvable { .. }) {
            return Err(err);
        }
        match context.failure_policy() {
            FailurePolicy::Fail => Err(err),
            FailurePolicy::Record => {
                warn!(reference = %self.reference, error = %err, "keeping unresolved reference");
                self.errors.borrow_mut().push(err.message());
                *self.json_reference.borrow_mut() = None;
                Ok(Property::Reference(Rc::clone(self)))
            }
        }
    }

    /// Apply `summary` and `description` of this reference to a copy of the
    /// resolved node, where the node type has those attributes.
    fn overlay(&self, resolved: Property) -> Property {
        let Property::Object(object) = &resolved else {
            return resolved;
        };
        let Some(target) = self.target() else {
            return resolved;
        };
        let fields: Vec<(&str, &String)> = [("summary", &self.summary), ("description", &self.description)]
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
            .filter(|(name, _)| target.allows_attribute(name))
            .collect();
        if fields.is_empty() {
            return resolved;
        }
        let copy: ObjectRef = object.shallow_clone();
        for (name, value) in fields {
            copy.set(name, Value::String(value.clone()));
        }
        Property::Object(copy)
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("reference", &self.reference)
            .field("target", &self.target.borrow())
            .field("errors", &self.errors.borrow())
            .finish()
    }
}
