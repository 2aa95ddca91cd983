//! Typed document nodes.
//!
//! A [`SpecObject`] is built from raw JSON data according to its kind's
//! attribute table. Shape problems found while building are recorded on the
//! node instead of aborting; only data that cannot become a node at all is a
//! hard error.

use std::borrow::Cow;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::context::ReferenceContext;
use crate::document_reference::DocumentReference;
use crate::error::SpecError;
use crate::pointer::JsonPointer;
use crate::property::{ObjectRef, Property, ReferenceRef, Visiting};
use crate::reference::Reference;
use crate::spec::{self, defaults, rules, AttrType, Attributes, Elem, ObjectKind};
use crate::target::ReferenceTarget;
use crate::types::{json_type_name, ref_marker, OpenApiVersion, REF_KEY};

static STATUS_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:default|[1-5](?:\d\d|XX))$").expect("status code pattern is valid"));

/// Where a node sits: the root of its document and the pointer to it.
#[derive(Debug, Clone)]
pub struct DocumentPosition {
    pub document: Weak<SpecObject>,
    pub pointer: JsonPointer,
}

impl DocumentPosition {
    pub fn document(&self) -> Option<ObjectRef> {
        self.document.upgrade()
    }
}

/// One node of an OpenAPI document.
pub struct SpecObject {
    kind: ObjectKind,
    version: OpenApiVersion,
    properties: RefCell<IndexMap<String, Property>>,
    /// Defaults fixed at build time (derived from the parent's data).
    defaults: RefCell<IndexMap<String, Property>>,
    /// Build and resolution errors.
    errors: RefCell<Vec<String>>,
    /// Errors of the last `validate()` run.
    rule_errors: RefCell<Vec<String>>,
    position: RefCell<Option<DocumentPosition>>,
    /// `$ref` of a Path Item.
    path_ref: RefCell<Option<ReferenceRef>>,
}

/// Location of a child node inside its parent.
#[derive(Debug, Clone)]
enum Slot {
    Key(String),
    Index(String, usize),
    Entry(String, String),
}

impl Slot {
    fn pointer(&self, base: &JsonPointer) -> JsonPointer {
        match self {
            Slot::Key(key) => base.append(key),
            Slot::Index(key, index) => base.append(key).append(&index.to_string()),
            Slot::Entry(key, entry) => base.append(key).append(entry),
        }
    }
}

impl SpecObject {
    fn empty(kind: ObjectKind, version: OpenApiVersion) -> Self {
        Self {
            kind,
            version,
            properties: RefCell::new(IndexMap::new()),
            defaults: RefCell::new(IndexMap::new()),
            errors: RefCell::new(Vec::new()),
            rule_errors: RefCell::new(Vec::new()),
            position: RefCell::new(None),
            path_ref: RefCell::new(None),
        }
    }

    /// An empty node.
    pub fn new(kind: ObjectKind, version: OpenApiVersion) -> ObjectRef {
        Rc::new(Self::empty(kind, version))
    }

    /// Build a node (and its whole subtree) from JSON data.
    ///
    /// An `OpenApi` root detects its version from the `openapi` field; every
    /// other node uses `version`.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::TypeError` when data cannot become a node at all, for
    /// example a string where an object is required.
    pub fn from_value(
        kind: ObjectKind,
        data: &Value,
        version: OpenApiVersion,
    ) -> Result<ObjectRef, SpecError> {
        let version = match kind {
            ObjectKind::OpenApi => data
                .get("openapi")
                .and_then(Value::as_str)
                .and_then(OpenApiVersion::detect)
                .unwrap_or(version),
            _ => version,
        };
        let map = as_entries(kind, data)?;
        build(kind, version, &map, None)
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn version(&self) -> OpenApiVersion {
        self.version
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    /// Stored value of `name`, without defaults.
    pub fn property(&self, name: &str) -> Option<Property> {
        self.properties.borrow().get(name).cloned()
    }

    /// All stored values in document order.
    pub fn properties(&self) -> Ref<'_, IndexMap<String, Property>> {
        self.properties.borrow()
    }

    /// True when `name` is stored with a non-null value.
    pub fn has_property_value(&self, name: &str) -> bool {
        self.properties
            .borrow()
            .get(name)
            .map_or(false, |p| !p.is_null())
    }

    /// True when `name` is stored, even as null.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.borrow().contains_key(name)
    }

    /// Value of `name`, falling back to its default.
    ///
    /// Absent collections read as empty, absent booleans as false and other
    /// absent attributes as null.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::UnknownProperty` for names the node type does not
    /// declare and that are not stored.
    pub fn get(&self, name: &str) -> Result<Property, SpecError> {
        if self.kind == ObjectKind::OpenApi && name == "servers" {
            match self.property(name) {
                Some(servers) if !servers.is_empty() => return Ok(servers),
                _ => return Ok(defaults::attribute_default(self, name).unwrap_or_else(Property::null)),
            }
        }
        if let Some(value) = self.property(name).filter(|p| !p.is_null()) {
            return Ok(value);
        }
        if let Some(value) = defaults::attribute_default(self, name) {
            return Ok(value);
        }
        if self.kind.is_patterned() {
            return Ok(Property::null());
        }
        match self.kind.attribute(self.version, name) {
            Some(AttrType::List(_)) => Ok(Property::List(Vec::new())),
            Some(AttrType::Map(_)) => Ok(Property::Map(IndexMap::new())),
            Some(AttrType::Boolean) => Ok(Property::Value(Value::Bool(false))),
            Some(_) => Ok(Property::null()),
            None if self.has_property(name) => Ok(Property::null()),
            None => Err(SpecError::UnknownProperty {
                kind: self.kind.name().to_string(),
                name: name.to_string(),
            }),
        }
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).ok()?.as_str().map(str::to_string)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).ok()?.as_bool()
    }

    pub fn get_object(&self, name: &str) -> Option<ObjectRef> {
        self.get(name).ok()?.to_object()
    }

    pub fn get_reference(&self, name: &str) -> Option<ReferenceRef> {
        self.get(name).ok()?.as_reference().cloned()
    }

    pub fn get_list(&self, name: &str) -> Option<Vec<Property>> {
        self.get(name).ok()?.as_list().map(<[Property]>::to_vec)
    }

    pub fn get_map(&self, name: &str) -> Option<IndexMap<String, Property>> {
        self.get(name).ok()?.as_map().cloned()
    }

    pub fn set(&self, name: &str, value: impl Into<Property>) {
        self.properties
            .borrow_mut()
            .insert(name.to_string(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<Property> {
        self.properties.borrow_mut().shift_remove(name)
    }

    /// Stored `x-` attributes.
    pub fn extensions(&self) -> IndexMap<String, Property> {
        self.properties
            .borrow()
            .iter()
            .filter(|(k, _)| k.starts_with("x-"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The `$ref` of a Path Item, if it still has one.
    pub fn path_ref(&self) -> Option<ReferenceRef> {
        self.path_ref.borrow().clone()
    }

    pub(crate) fn build_default(&self, name: &str) -> Option<Property> {
        self.defaults.borrow().get(name).cloned()
    }

    /// A new node sharing this node's attribute values.
    pub fn shallow_clone(&self) -> ObjectRef {
        Rc::new(Self {
            kind: self.kind,
            version: self.version,
            properties: RefCell::new(self.properties.borrow().clone()),
            defaults: RefCell::new(self.defaults.borrow().clone()),
            errors: RefCell::new(self.errors.borrow().clone()),
            rule_errors: RefCell::new(self.rule_errors.borrow().clone()),
            position: RefCell::new(self.position.borrow().clone()),
            path_ref: RefCell::new(self.path_ref.borrow().clone()),
        })
    }

    /// Child nodes with their slots, collected under a short borrow.
    fn children(&self) -> Vec<(Slot, Property)> {
        let properties = self.properties.borrow();
        let mut children = Vec::new();
        for (key, value) in properties.iter() {
            match value {
                Property::Object(_) | Property::Reference(_) => {
                    children.push((Slot::Key(key.clone()), value.clone()));
                }
                Property::List(items) => {
                    for (index, item) in items.iter().enumerate() {
                        if matches!(item, Property::Object(_) | Property::Reference(_)) {
                            children.push((Slot::Index(key.clone(), index), item.clone()));
                        }
                    }
                }
                Property::Map(entries) => {
                    for (entry, item) in entries {
                        if matches!(item, Property::Object(_) | Property::Reference(_)) {
                            children.push((Slot::Entry(key.clone(), entry.clone()), item.clone()));
                        }
                    }
                }
                Property::Value(_) | Property::Recursive(_) => {}
            }
        }
        children
    }

    fn write_slot(&self, slot: &Slot, value: Property) {
        let mut properties = self.properties.borrow_mut();
        match slot {
            Slot::Key(key) => {
                properties.insert(key.clone(), value);
            }
            Slot::Index(key, index) => {
                if let Some(Property::List(items)) = properties.get_mut(key) {
                    if let Some(item) = items.get_mut(*index) {
                        *item = value;
                    }
                }
            }
            Slot::Entry(key, entry) => {
                if let Some(Property::Map(entries)) = properties.get_mut(key) {
                    entries.insert(entry.clone(), value);
                }
            }
        }
    }

    /// Check this node and its subtree against the OpenAPI rules.
    ///
    /// Returns false when the subtree has any build, resolution or rule errors.
    /// Rule errors from a previous run are replaced.
    pub fn validate(&self) -> bool {
        self.validate_with(&mut Visiting::default())
    }

    fn validate_with(&self, visiting: &mut Visiting) -> bool {
        if !visiting.enter(self.id()) {
            return true;
        }
        let mut valid = true;
        if let Some(reference) = self.path_ref() {
            valid &= reference.validate();
        }
        for (_, child) in self.children() {
            let child_valid = match child {
                Property::Object(object) => object.validate_with(visiting),
                Property::Reference(reference) => reference.validate(),
                _ => true,
            };
            valid &= child_valid;
        }
        visiting.leave(self.id());

        let rule_errors = rules::check(self);
        valid &= rule_errors.is_empty() && self.errors.borrow().is_empty();
        *self.rule_errors.borrow_mut() = rule_errors;
        valid
    }

    /// Errors of this node and its subtree, each prefixed with `[pointer]` when
    /// the node's position is known.
    pub fn get_errors(&self) -> Vec<String> {
        self.collect_errors(&mut Visiting::default())
    }

    fn collect_errors(&self, visiting: &mut Visiting) -> Vec<String> {
        if !visiting.enter(self.id()) {
            return Vec::new();
        }
        let prefix = self
            .position
            .borrow()
            .as_ref()
            .map(|p| format!("[{}] ", p.pointer))
            .unwrap_or_default();
        let mut errors: Vec<String> = self
            .errors
            .borrow()
            .iter()
            .chain(self.rule_errors.borrow().iter())
            .map(|e| format!("{}{}", prefix, e))
            .collect();
        if let Some(reference) = self.path_ref() {
            errors.extend(reference.get_errors());
        }
        for (_, child) in self.children() {
            match child {
                Property::Object(object) => errors.extend(object.collect_errors(visiting)),
                Property::Reference(reference) => errors.extend(reference.get_errors()),
                _ => {}
            }
        }
        visiting.leave(self.id());
        errors
    }

    pub(crate) fn add_error(&self, message: String) {
        self.errors.borrow_mut().push(message);
    }

    /// Plain JSON form of this node.
    ///
    /// A node met again inside itself is written as a `$ref` to its position.
    /// Defaults are not written.
    pub fn get_serializable_data(&self) -> Value {
        self.serialize(&mut Visiting::default())
    }

    pub(crate) fn serialize(&self, visiting: &mut Visiting) -> Value {
        if !visiting.enter(self.id()) {
            let pointer = self
                .position
                .borrow()
                .as_ref()
                .map(|p| p.pointer.clone())
                .unwrap_or_default();
            return DocumentReference::new("", pointer).to_json();
        }
        let properties = self.properties.borrow().clone();
        let mut data: Map<String, Value> = properties
            .iter()
            .map(|(k, p)| (k.clone(), p.serialize(visiting)))
            .collect();
        visiting.leave(self.id());

        if self.kind == ObjectKind::PathItem {
            if let Some(reference) = self.path_ref() {
                data.insert(REF_KEY.to_string(), Value::String(reference.reference().to_string()));
            }
            for name in ["servers", "parameters"] {
                if data.get(name).map_or(false, |v| v.as_array().map_or(false, Vec::is_empty)) {
                    data.remove(name);
                }
            }
        }
        Value::Object(data)
    }

    pub fn position(&self) -> Option<DocumentPosition> {
        self.position.borrow().clone()
    }

    /// Record `document` and `pointer` on this node and derived positions on
    /// its subtree.
    pub fn set_document_context(&self, document: &Weak<SpecObject>, pointer: JsonPointer) {
        self.set_document_context_with(document, pointer, &mut Visiting::default());
    }

    /// Stamp positions on a root node and its subtree.
    pub fn set_document_root(self: &Rc<Self>) {
        self.set_document_context(&Rc::downgrade(self), JsonPointer::root());
    }

    fn set_document_context_with(
        &self,
        document: &Weak<SpecObject>,
        pointer: JsonPointer,
        visiting: &mut Visiting,
    ) {
        if !visiting.enter(self.id()) {
            return;
        }
        if let Some(reference) = self.path_ref() {
            reference.set_document_context(document, pointer.append(REF_KEY));
        }
        for (slot, child) in self.children() {
            let child_pointer = slot.pointer(&pointer);
            match child {
                Property::Object(object) => {
                    object.set_document_context_with(document, child_pointer, visiting)
                }
                Property::Reference(reference) => {
                    reference.set_document_context(document, child_pointer)
                }
                _ => {}
            }
        }
        *self.position.borrow_mut() = Some(DocumentPosition {
            document: document.clone(),
            pointer,
        });
        visiting.leave(self.id());
    }

    /// Hand `context` to every reference in the subtree.
    pub fn set_reference_context(&self, context: &Rc<ReferenceContext>) {
        self.set_reference_context_with(context, &mut Visiting::default());
    }

    fn set_reference_context_with(&self, context: &Rc<ReferenceContext>, visiting: &mut Visiting) {
        if !visiting.enter(self.id()) {
            return;
        }
        if let Some(reference) = self.path_ref() {
            reference.set_context(context);
        }
        for (_, child) in self.children() {
            match child {
                Property::Object(object) => object.set_reference_context_with(context, visiting),
                Property::Reference(reference) => reference.set_context(context),
                _ => {}
            }
        }
        visiting.leave(self.id());
    }

    /// Replace every reference in the subtree by what it resolves to.
    ///
    /// With `context` given, references resolve in it; otherwise each uses the
    /// context stamped on it. Nodes brought in by resolution are walked too,
    /// with their own stamped contexts.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error that the failure policy does not
    /// record on the reference.
    pub fn resolve_references(
        &self,
        context: Option<&Rc<ReferenceContext>>,
    ) -> Result<(), SpecError> {
        self.resolve_references_with(context, &mut Visiting::default())
    }

    fn resolve_references_with(
        &self,
        context: Option<&Rc<ReferenceContext>>,
        visiting: &mut Visiting,
    ) -> Result<(), SpecError> {
        if !visiting.enter(self.id()) {
            return Ok(());
        }
        let result = self.resolve_children(context, visiting);
        visiting.leave(self.id());
        result
    }

    fn resolve_children(
        &self,
        context: Option<&Rc<ReferenceContext>>,
        visiting: &mut Visiting,
    ) -> Result<(), SpecError> {
        if self.kind == ObjectKind::PathItem {
            self.resolve_path_ref(context)?;
        }
        for (slot, child) in self.children() {
            match child {
                Property::Reference(reference) => match reference.resolve(context)? {
                    // the walk is inside the target, so this slot closes a cycle
                    Property::Object(object) if visiting.is_active(object.id()) => {
                        self.write_slot(&slot, Property::Recursive(Rc::downgrade(&object)));
                    }
                    Property::Object(object) => {
                        self.write_slot(&slot, Property::Object(Rc::clone(&object)));
                        object.resolve_references_with(None, visiting)?;
                    }
                    resolved => self.write_slot(&slot, resolved),
                },
                Property::Object(object) => object.resolve_references_with(context, visiting)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Merge the Path Item a `$ref` points to into this one.
    fn resolve_path_ref(&self, context: Option<&Rc<ReferenceContext>>) -> Result<(), SpecError> {
        let Some(reference) = self.path_ref() else {
            return Ok(());
        };
        let item = match reference.resolve(context)? {
            Property::Object(item)
                if item.kind == ObjectKind::PathItem && !std::ptr::eq(Rc::as_ptr(&item), self) =>
            {
                item
            }
            _ => return Ok(()),
        };
        *self.path_ref.borrow_mut() = None;
        for (name, _) in spec::PATH_ITEM {
            let Some(value) = item.property(name).filter(|p| !p.is_null()) else {
                continue;
            };
            if self.has_property_value(name) {
                self.add_error(format!(
                    "Conflicting properties, property '{}' exists in local PathItem and also in the referenced one.",
                    name
                ));
            }
            self.set(name, value);
        }
        for (name, value) in item.extensions() {
            self.set(&name, value);
        }
        Ok(())
    }
}

impl fmt::Debug for SpecObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecObject")
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("properties", &self.properties.borrow().keys().collect::<Vec<_>>())
            .field("errors", &self.errors.borrow())
            .finish()
    }
}

/// Object data as a map; arrays are keyed by index.
fn as_entries(kind: ObjectKind, data: &Value) -> Result<Cow<'_, Map<String, Value>>, SpecError> {
    match data {
        Value::Object(map) => Ok(Cow::Borrowed(map)),
        Value::Array(items) => Ok(Cow::Owned(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
        )),
        other => Err(SpecError::TypeError {
            message: format!("Unable to instantiate {} Object with data '{}'", kind, other),
        }),
    }
}

fn build(
    kind: ObjectKind,
    version: OpenApiVersion,
    data: &Map<String, Value>,
    schema_hint: Option<&ObjectRef>,
) -> Result<ObjectRef, SpecError> {
    let object = SpecObject::empty(kind, version);
    let mut properties = IndexMap::new();
    let mut errors = Vec::new();

    match kind.attributes(version) {
        Attributes::Fixed(table) => {
            if kind == ObjectKind::PathItem {
                if let Some(raw) = data.get(REF_KEY) {
                    let target = ReferenceTarget::new(ObjectKind::PathItem, version, None);
                    let reference = Reference::from_value(&json!({ REF_KEY: raw }), version, Some(target))?;
                    *object.path_ref.borrow_mut() = Some(reference);
                }
            }
            for (name, declared) in table {
                match data.get(*name) {
                    Some(raw) if !raw.is_null() => {
                        let value = coerce(kind, version, name, *declared, raw, &properties, &mut errors)?;
                        properties.insert(name.to_string(), value);
                    }
                    _ => {}
                }
            }
            for (key, raw) in data {
                let declared = table.iter().any(|(n, _)| *n == key.as_str());
                if (declared && !raw.is_null()) || (kind == ObjectKind::PathItem && key == REF_KEY) {
                    continue;
                }
                properties.insert(key.clone(), Property::Value(raw.clone()));
            }
        }
        Attributes::Patterned(element) => {
            if kind == ObjectKind::Callback && data.len() != 1 {
                errors.push("Callback object must have exactly one URL.".to_string());
            } else {
                for (key, raw) in data {
                    if raw.is_null() || (key.starts_with("x-") && kind != ObjectKind::SecurityRequirement) {
                        properties.insert(key.clone(), Property::Value(raw.clone()));
                        continue;
                    }
                    if kind == ObjectKind::Responses && !STATUS_CODE.is_match(key) {
                        errors.push(format!("Responses: {} is not a valid HTTP status code.", key));
                        continue;
                    }
                    let value = coerce(kind, version, key, element, raw, &properties, &mut errors)?;
                    properties.insert(key.clone(), value);
                }
            }
        }
    }

    if kind == ObjectKind::Encoding {
        if let Some(content_type) = schema_hint.and_then(|s| defaults::encoding_content_type(s)) {
            object
                .defaults
                .borrow_mut()
                .insert("contentType".to_string(), Property::Value(Value::String(content_type.to_string())));
        }
    }
    *object.properties.borrow_mut() = properties;
    *object.errors.borrow_mut() = errors;
    Ok(Rc::new(object))
}

fn scalar_matches(declared: AttrType, raw: &Value) -> bool {
    match declared {
        AttrType::String => raw.is_string(),
        AttrType::Boolean => raw.is_boolean(),
        AttrType::Integer => raw.is_i64() || raw.is_u64(),
        AttrType::Number => raw.is_number(),
        _ => true,
    }
}

/// Turn raw attribute data into a property of the declared type.
fn coerce(
    owner: ObjectKind,
    version: OpenApiVersion,
    name: &str,
    declared: AttrType,
    raw: &Value,
    siblings: &IndexMap<String, Property>,
    errors: &mut Vec<String>,
) -> Result<Property, SpecError> {
    match declared {
        AttrType::String | AttrType::Boolean | AttrType::Integer | AttrType::Number => {
            if !scalar_matches(declared, raw) {
                errors.push(format!(
                    "property '{}' must be {}, but {} given.",
                    name,
                    declared.scalar_name().unwrap_or("scalar"),
                    json_type_name(raw)
                ));
            }
            Ok(Property::Value(raw.clone()))
        }
        AttrType::Any => untyped(raw, version),
        AttrType::Object(kind) => instantiate(owner, version, name, kind, raw, None),
        AttrType::SchemaOrBool => match raw {
            Value::Bool(_) => Ok(Property::Value(raw.clone())),
            Value::Object(_) => instantiate(owner, version, name, ObjectKind::Schema, raw, None),
            other => Err(SpecError::TypeError {
                message: format!(
                    "Schema::$additionalProperties MUST be either boolean or a Schema/Reference object, \"{}\" given",
                    json_type_name(other)
                ),
            }),
        },
        AttrType::List(element) => {
            if ref_marker(raw).is_some() {
                return untyped(raw, version);
            }
            let Some(items) = raw.as_array() else {
                errors.push(format!(
                    "property '{}' must be array, but {} given.",
                    name,
                    json_type_name(raw)
                ));
                return Ok(Property::Value(raw.clone()));
            };
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                let value = match element {
                    Elem::String => {
                        if !item.is_string() {
                            errors.push(format!(
                                "property '{}' must be array of strings, but array has {} element.",
                                name,
                                json_type_name(item)
                            ));
                        }
                        Property::Value(item.clone())
                    }
                    Elem::Any => untyped(item, version)?,
                    Elem::Object(kind) => instantiate(owner, version, name, kind, item, None)?,
                };
                list.push(value);
            }
            Ok(Property::List(list))
        }
        AttrType::Map(element) => {
            if ref_marker(raw).is_some() {
                return untyped(raw, version);
            }
            let entries: Vec<(String, &Value)> = match raw {
                Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
                Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
                other => {
                    errors.push(format!(
                        "property '{}' must be array, but {} given.",
                        name,
                        json_type_name(other)
                    ));
                    return Ok(Property::Value(raw.clone()));
                }
            };
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                let value = match element {
                    Elem::String => {
                        if !item.is_string() {
                            errors.push(format!(
                                "property '{}' must be map<string, string>, but entry '{}' is of type {}.",
                                name,
                                key,
                                json_type_name(item)
                            ));
                        }
                        Property::Value(item.clone())
                    }
                    Elem::Any => untyped(item, version)?,
                    Elem::Object(kind) => {
                        let hint = if owner == ObjectKind::MediaType && name == "encoding" {
                            encoding_schema(siblings, &key)
                        } else {
                            None
                        };
                        instantiate(owner, version, name, kind, item, hint.as_ref())?
                    }
                };
                map.insert(key, value);
            }
            Ok(Property::Map(map))
        }
    }
}

/// Untyped data; a reference marker becomes a reference without target.
fn untyped(raw: &Value, version: OpenApiVersion) -> Result<Property, SpecError> {
    match ref_marker(raw) {
        Some(_) => Ok(Property::Reference(Reference::from_value(raw, version, None)?)),
        None => Ok(Property::Value(raw.clone())),
    }
}

fn instantiate(
    owner: ObjectKind,
    version: OpenApiVersion,
    name: &str,
    kind: ObjectKind,
    raw: &Value,
    schema_hint: Option<&ObjectRef>,
) -> Result<Property, SpecError> {
    // a Path Item keeps its own $ref
    if kind != ObjectKind::PathItem && ref_marker(raw).is_some() {
        let target = ReferenceTarget::new(owner, version, Some(name));
        return Ok(Property::Reference(Reference::from_value(raw, version, Some(target))?));
    }
    let map = as_entries(kind, raw)?;
    build(kind, version, &map, schema_hint).map(Property::Object)
}

/// Schema of the property an encoding entry describes.
fn encoding_schema(siblings: &IndexMap<String, Property>, name: &str) -> Option<ObjectRef> {
    let schema = siblings.get("schema")?.as_object()?.clone();
    let properties = schema.property("properties")?;
    properties.entry(name)?.as_object().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn openapi(data: Value) -> ObjectRef {
        SpecObject::from_value(ObjectKind::OpenApi, &data, OpenApiVersion::Unsupported).unwrap()
    }

    fn schema(data: Value) -> ObjectRef {
        SpecObject::from_value(ObjectKind::Schema, &data, OpenApiVersion::V3_0).unwrap()
    }

    mod build {
        use super::*;

        #[test]
        fn detects_version_and_passes_it_down() {
            let root = openapi(json!({"openapi": "3.1.0", "info": {"title": "T", "version": "1"}}));
            assert_eq!(root.version(), OpenApiVersion::V3_1);
            assert_eq!(root.get_object("info").unwrap().version(), OpenApiVersion::V3_1);

            let root = openapi(json!({"openapi": "2.0"}));
            assert_eq!(root.version(), OpenApiVersion::Unsupported);
        }

        #[test]
        fn declared_attributes_come_first() {
            let s = schema(json!({"x-internal": true, "type": "object", "title": "Pet"}));
            let keys: Vec<String> = s.properties().keys().cloned().collect();
            assert_eq!(keys, vec!["title", "type", "x-internal"]);
        }

        #[test]
        fn scalar_type_mismatch_is_recorded() {
            let s = schema(json!({"title": 5, "minLength": "x"}));
            assert_eq!(
                s.get_errors(),
                vec![
                    "property 'title' must be string, but number given.",
                    "property 'minLength' must be integer, but string given.",
                ]
            );
            assert_eq!(s.property("title").unwrap().as_value(), Some(&json!(5)));
        }

        #[test]
        fn list_and_map_shape_errors() {
            let s = schema(json!({"required": ["a", 1]}));
            assert_eq!(
                s.get_errors(),
                vec!["property 'required' must be array of strings, but array has number element."]
            );

            let s = schema(json!({"required": "a"}));
            assert_eq!(s.get_errors(), vec!["property 'required' must be array, but string given."]);

            let d = SpecObject::from_value(
                ObjectKind::Discriminator,
                &json!({"propertyName": "t", "mapping": {"a": "#/x", "b": 2}}),
                OpenApiVersion::V3_0,
            )
            .unwrap();
            assert_eq!(
                d.get_errors(),
                vec!["property 'mapping' must be map<string, string>, but entry 'b' is of type number."]
            );
        }

        #[test]
        fn markers_become_references_with_target() {
            let s = schema(json!({"items": {"$ref": "#/components/schemas/Pet"}}));
            let reference = s.get_reference("items").unwrap();
            let target = reference.target().unwrap();
            assert_eq!(target.as_string(), "Schemaitems");
            assert_eq!(target.target_kind(), Some(ObjectKind::Schema));
        }

        #[test]
        fn untyped_markers_have_no_target() {
            let s = schema(json!({"example": {"$ref": "#/x"}}));
            assert!(s.get_reference("example").unwrap().target().is_none());
        }

        #[test]
        fn non_object_data_is_a_type_error() {
            let err = SpecObject::from_value(
                ObjectKind::OpenApi,
                &json!({"openapi": "3.0.0", "info": "text"}),
                OpenApiVersion::Unsupported,
            )
            .unwrap_err();
            assert_eq!(err.to_string(), "Unable to instantiate Info Object with data '\"text\"'");
        }

        #[test]
        fn additional_properties_accepts_bool_or_schema() {
            let s = schema(json!({"additionalProperties": false}));
            assert_eq!(s.get_bool("additionalProperties"), Some(false));

            let s = schema(json!({"additionalProperties": {"type": "string"}}));
            assert_eq!(
                s.get_object("additionalProperties").unwrap().kind(),
                ObjectKind::Schema
            );

            assert!(SpecObject::from_value(
                ObjectKind::Schema,
                &json!({"additionalProperties": 1}),
                OpenApiVersion::V3_0
            )
            .is_err());
        }

        #[test]
        fn responses_filter_status_codes() {
            let r = SpecObject::from_value(
                ObjectKind::Responses,
                &json!({"200": {"description": "ok"}, "2XX": {"description": "ok"}, "600": {}, "x-a": 1}),
                OpenApiVersion::V3_0,
            )
            .unwrap();
            assert!(r.has_property("200"));
            assert!(r.has_property("2XX"));
            assert!(!r.has_property("600"));
            assert!(r.has_property("x-a"));
            assert_eq!(r.get_errors(), vec!["Responses: 600 is not a valid HTTP status code."]);
        }

        #[test]
        fn callback_needs_one_url() {
            let c = SpecObject::from_value(
                ObjectKind::Callback,
                &json!({"{$request.body#/url}": {}, "other": {}}),
                OpenApiVersion::V3_0,
            )
            .unwrap();
            assert_eq!(c.get_errors(), vec!["Callback object must have exactly one URL."]);
            assert!(c.properties().is_empty());
        }

        #[test]
        fn path_item_keeps_its_ref() {
            let paths = SpecObject::from_value(
                ObjectKind::Paths,
                &json!({"/pets": {"$ref": "defs.yaml#/PetPath", "summary": "s"}}),
                OpenApiVersion::V3_0,
            )
            .unwrap();
            let item = paths.get_object("/pets").unwrap();
            assert_eq!(item.kind(), ObjectKind::PathItem);
            assert_eq!(item.path_ref().unwrap().reference(), "defs.yaml#/PetPath");
            assert_eq!(
                item.get_serializable_data(),
                json!({"summary": "s", "$ref": "defs.yaml#/PetPath"})
            );
        }

        #[test]
        fn lists_given_as_objects_keep_raw_data() {
            let op = SpecObject::from_value(
                ObjectKind::Operation,
                &json!({"tags": {"a": "b"}, "responses": {}}),
                OpenApiVersion::V3_0,
            )
            .unwrap();
            assert_eq!(op.property("tags").unwrap().as_value(), Some(&json!({"a": "b"})));
        }
    }

    mod access {
        use super::*;

        #[test]
        fn get_falls_back_by_declared_type() {
            let s = schema(json!({}));
            assert!(s.get("title").unwrap().is_null());
            assert!(s.get("properties").unwrap().as_map().unwrap().is_empty());
            assert_eq!(s.get_bool("readOnly"), Some(false));
            assert!(matches!(s.get("allOf").unwrap(), Property::Value(Value::Null)));
        }

        #[test]
        fn get_unknown_property_fails() {
            let s = schema(json!({"x-a": 1}));
            assert_eq!(s.get("x-a").unwrap().as_value(), Some(&json!(1)));
            let err = s.get("bogus").unwrap_err();
            assert_eq!(err.to_string(), "Getting unknown property: Schema::bogus");
        }

        #[test]
        fn set_and_remove() {
            let s = schema(json!({"title": "a"}));
            s.set("title", Value::String("b".into()));
            assert_eq!(s.get_str("title").as_deref(), Some("b"));
            assert!(s.remove("title").is_some());
            assert!(!s.has_property_value("title"));
        }

        #[test]
        fn typed_collections() {
            let s = schema(json!({"required": ["a", "b"], "properties": {"a": {"type": "string"}}}));
            let required = s.get_list("required").unwrap();
            assert_eq!(required.len(), 2);
            assert_eq!(required[1].as_str(), Some("b"));

            let properties = s.get_map("properties").unwrap();
            assert_eq!(properties["a"].as_object().unwrap().kind(), ObjectKind::Schema);
            assert!(s.get_list("title").is_none());
        }

        #[test]
        fn extensions_are_listed() {
            let s = schema(json!({"type": "string", "x-a": 1, "x-b": 2}));
            let keys: Vec<String> = s.extensions().keys().cloned().collect();
            assert_eq!(keys, vec!["x-a", "x-b"]);
        }

        #[test]
        fn shallow_clone_shares_children() {
            let s = schema(json!({"items": {"type": "string"}}));
            let copy = s.shallow_clone();
            copy.set("title", Value::String("t".into()));
            assert!(!s.has_property("title"));
            assert!(Rc::ptr_eq(
                &s.get_object("items").unwrap(),
                &copy.get_object("items").unwrap()
            ));
        }
    }

    mod walk {
        use super::*;

        #[test]
        fn positions_follow_the_tree() {
            let root = openapi(json!({
                "openapi": "3.0.0",
                "paths": {"/pets": {"get": {"parameters": [{"name": "a", "in": "query"}]}}},
            }));
            root.set_document_root();
            let paths = root.get_object("paths").unwrap();
            let op = paths.get_object("/pets").unwrap().get_object("get").unwrap();
            assert_eq!(op.position().unwrap().pointer.as_str(), "/paths/~1pets/get");
            let param = op.get("parameters").unwrap();
            let param = param.entry("0").unwrap().as_object().unwrap();
            assert_eq!(param.position().unwrap().pointer.as_str(), "/paths/~1pets/get/parameters/0");
            assert!(Rc::ptr_eq(&param.position().unwrap().document().unwrap(), &root));
        }

        #[test]
        fn cyclic_graph_serializes_with_ref() {
            let node = schema(json!({"type": "object", "properties": {}}));
            node.set_document_context(&Weak::new(), JsonPointer::parse("/components/schemas/Node").unwrap());
            let mut properties = IndexMap::new();
            properties.insert("next".to_string(), Property::Object(Rc::clone(&node)));
            node.set("properties", Property::Map(properties));

            assert_eq!(
                node.get_serializable_data(),
                json!({
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}},
                })
            );
            // walkers terminate on the cycle
            assert!(node.validate());
            assert!(node.get_errors().is_empty());
            node.set_document_root();
        }
    }
}
