//! Expected node type of a reference's result.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::SpecError;
use crate::object::SpecObject;
use crate::property::ObjectRef;
use crate::spec::{Attributes, ObjectKind};
use crate::types::OpenApiVersion;

/// Where a reference sits: the kind of node that owns it and the attribute it
/// fills. The attribute's declared type decides what the referenced data turns into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceTarget {
    owner: ObjectKind,
    version: OpenApiVersion,
    property: Option<String>,
}

impl ReferenceTarget {
    pub fn new(owner: ObjectKind, version: OpenApiVersion, property: Option<&str>) -> Self {
        Self {
            owner,
            version,
            property: property.map(str::to_string),
        }
    }

    pub fn owner(&self) -> ObjectKind {
        self.owner
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    pub fn version(&self) -> OpenApiVersion {
        self.version
    }

    /// Cache key for this target: owner name followed by the attribute name.
    pub fn as_string(&self) -> String {
        format!("{}{}", self.owner.name(), self.property.as_deref().unwrap_or(""))
    }

    /// Node type the referenced data is built into, or `None` when the attribute
    /// holds plain data.
    pub fn target_kind(&self) -> Option<ObjectKind> {
        match (self.owner.attributes(self.version), self.property.as_deref()) {
            (Attributes::Patterned(elem), Some(_)) => elem.object_kind(),
            (Attributes::Fixed(_), Some(property)) => {
                match self.owner.attribute(self.version, property) {
                    Some(declared) => declared.object_kind(),
                    None => Some(self.owner),
                }
            }
            (_, None) => Some(self.owner),
        }
    }

    /// Builds a typed node from referenced data.
    ///
    /// Non-object data yields an empty node. Returns `Ok(None)` when the target
    /// is not a node type.
    ///
    /// # Errors
    ///
    /// Propagates construction errors of nested attributes.
    pub fn create_instance(&self, data: &Value) -> Result<Option<ObjectRef>, SpecError> {
        let kind = match self.target_kind() {
            Some(ObjectKind::Reference) | None => return Ok(None),
            Some(kind) => kind,
        };
        let empty = Value::Object(Map::new());
        let data = if data.is_object() { data } else { &empty };
        SpecObject::from_value(kind, data, self.version).map(Some)
    }

    /// True when a node of the target type can hold `name`.
    pub fn allows_attribute(&self, name: &str) -> bool {
        let Some(kind) = self.target_kind() else {
            return false;
        };
        match kind.attributes(self.version) {
            Attributes::Patterned(_) => true,
            Attributes::Fixed(table) => table.iter().any(|(n, _)| *n == name),
        }
    }
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_kind() {
            Some(kind) => f.write_str(kind.name()),
            None => f.write_str(&self.as_string()),
        }
    }
}
