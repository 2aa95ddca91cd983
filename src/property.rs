//! Attribute values of typed nodes.

use std::collections::HashSet;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::object::SpecObject;
use crate::pointer::{array_index, Child, Container, Navigate};
use crate::reference::Reference;

/// Shared handle to a typed node.
pub type ObjectRef = Rc<SpecObject>;

/// Shared handle to a reference node.
pub type ReferenceRef = Rc<Reference>;

/// Value held by a node attribute.
///
/// Nodes are shared by handle, so after resolution the same node can sit in
/// several places of a tree. A node that ends up inside itself is held there
/// weakly, as [`Property::Recursive`], so dropping the tree frees it.
#[derive(Debug, Clone)]
pub enum Property {
    /// Scalar or untyped JSON data.
    Value(Value),
    Object(ObjectRef),
    /// Back-edge to an enclosing node.
    Recursive(Weak<SpecObject>),
    Reference(ReferenceRef),
    List(Vec<Property>),
    Map(IndexMap<String, Property>),
}

impl Property {
    pub fn null() -> Self {
        Property::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Property::Value(Value::Null))
    }

    /// True for null, false, zero, empty strings and empty collections.
    pub fn is_empty(&self) -> bool {
        match self {
            Property::Value(Value::Null) => true,
            Property::Value(Value::Bool(b)) => !b,
            Property::Value(Value::Number(n)) => n.as_f64() == Some(0.0),
            Property::Value(Value::String(s)) => s.is_empty() || s == "0",
            Property::Value(Value::Array(items)) => items.is_empty(),
            Property::Value(Value::Object(map)) => map.is_empty(),
            Property::List(items) => items.is_empty(),
            Property::Map(entries) => entries.is_empty(),
            Property::Object(_) | Property::Recursive(_) | Property::Reference(_) => false,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Property::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Property::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Node handle, following a back-edge while its target is alive.
    pub fn to_object(&self) -> Option<ObjectRef> {
        match self {
            Property::Object(object) => Some(Rc::clone(object)),
            Property::Recursive(node) => node.upgrade(),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceRef> {
        match self {
            Property::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Property]> {
        match self {
            Property::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Property>> {
        match self {
            Property::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Element of a list or map.
    pub fn entry(&self, key: &str) -> Option<&Property> {
        match self {
            Property::List(items) => array_index(key).and_then(|i| items.get(i)),
            Property::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Plain JSON form of this value.
    pub fn to_value(&self) -> Value {
        self.serialize(&mut Visiting::default())
    }

    pub(crate) fn serialize(&self, visiting: &mut Visiting) -> Value {
        match self {
            Property::Value(value) => value.clone(),
            Property::Object(object) => object.serialize(visiting),
            Property::Recursive(node) => node
                .upgrade()
                .map_or(Value::Null, |object| object.serialize(visiting)),
            Property::Reference(reference) => reference.get_serializable_data(),
            Property::List(items) => {
                Value::Array(items.iter().map(|p| p.serialize(visiting)).collect())
            }
            Property::Map(entries) => {
                let dense = entries
                    .keys()
                    .enumerate()
                    .all(|(i, key)| key == &i.to_string());
                if dense && !entries.is_empty() {
                    Value::Array(entries.values().map(|p| p.serialize(visiting)).collect())
                } else {
                    Value::Object(
                        entries
                            .iter()
                            .map(|(k, p)| (k.clone(), p.serialize(visiting)))
                            .collect::<Map<_, _>>(),
                    )
                }
            }
        }
    }

    /// Back-edges become strong handles; a dead one becomes null.
    fn into_strong(self) -> Property {
        match self {
            Property::Recursive(node) => {
                node.upgrade().map_or_else(Property::null, Property::Object)
            }
            other => other,
        }
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

impl From<ObjectRef> for Property {
    fn from(object: ObjectRef) -> Self {
        Property::Object(object)
    }
}

impl From<ReferenceRef> for Property {
    fn from(reference: ReferenceRef) -> Self {
        Property::Reference(reference)
    }
}

impl Navigate for Property {
    fn child(&self, segment: &str) -> Child<Self> {
        match self {
            Property::Object(object) => match object.property(segment) {
                Some(found) if !found.is_null() => Child::Found(found.into_strong()),
                _ => Child::Missing(Container::Object),
            },
            Property::Recursive(node) => match node.upgrade() {
                Some(object) => Property::Object(object).child(segment),
                None => Child::Missing(Container::Object),
            },
            Property::List(_) | Property::Map(_) => match self.entry(segment) {
                Some(found) => Child::Found(found.clone().into_strong()),
                None => Child::Missing(Container::Array),
            },
            Property::Value(value) => match value.child(segment) {
                Child::Found(found) => Child::Found(Property::Value(found.clone())),
                Child::Missing(container) => Child::Missing(container),
                Child::Scalar => Child::Scalar,
            },
            // members of an unresolved reference are unknown until it resolves
            Property::Reference(_) => Child::Missing(Container::Object),
        }
    }
}

/// Set of nodes a recursive walk is currently inside.
///
/// Every walker owns one per top-level call, which keeps walks over shared and
/// cyclic graphs finite.
#[derive(Debug, Default)]
pub(crate) struct Visiting {
    active: HashSet<usize>,
}

impl Visiting {
    /// Marks `id` as entered; false when the walk is already inside it.
    pub(crate) fn enter(&mut self, id: usize) -> bool {
        self.active.insert(id)
    }

    pub(crate) fn leave(&mut self, id: usize) {
        self.active.remove(&id);
    }

    pub(crate) fn is_active(&self, id: usize) -> bool {
        self.active.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::JsonPointer;
    use serde_json::json;

    #[test]
    fn emptiness_follows_loose_truthiness() {
        assert!(Property::null().is_empty());
        assert!(Property::Value(json!(false)).is_empty());
        assert!(Property::Value(json!(0)).is_empty());
        assert!(Property::Value(json!("")).is_empty());
        assert!(Property::Value(json!("0")).is_empty());
        assert!(Property::List(vec![]).is_empty());
        assert!(Property::Map(IndexMap::new()).is_empty());
        assert!(!Property::Value(json!("x")).is_empty());
        assert!(!Property::Value(json!(true)).is_empty());
        assert!(!Property::List(vec![Property::null()]).is_empty());
    }

    #[test]
    fn dense_maps_serialize_as_arrays() {
        let mut entries = IndexMap::new();
        entries.insert("0".to_string(), Property::Value(json!("a")));
        entries.insert("1".to_string(), Property::Value(json!("b")));
        assert_eq!(Property::Map(entries).to_value(), json!(["a", "b"]));

        let mut entries = IndexMap::new();
        entries.insert("1".to_string(), Property::Value(json!("b")));
        assert_eq!(Property::Map(entries).to_value(), json!({"1": "b"}));

        assert_eq!(Property::Map(IndexMap::new()).to_value(), json!({}));
        assert_eq!(Property::List(vec![]).to_value(), json!([]));
    }

    #[test]
    fn pointer_walks_raw_values() {
        let doc = Property::Value(json!({"a": [{"b": 1}]}));
        let found = JsonPointer::parse("/a/0/b").unwrap().evaluate(doc.clone()).unwrap();
        assert_eq!(found.as_value(), Some(&json!(1)));

        let err = JsonPointer::parse("/a/0/b/c").unwrap().evaluate(doc).unwrap_err();
        assert!(err.to_string().contains("is neither an array nor an object"));
    }

    #[test]
    fn pointer_walks_collections() {
        let mut entries = IndexMap::new();
        entries.insert("Pet".to_string(), Property::Value(json!({"type": "object"})));
        let doc = Property::List(vec![Property::Map(entries)]);

        let found = JsonPointer::parse("/0/Pet/type").unwrap().evaluate(doc.clone()).unwrap();
        assert_eq!(found.as_str(), Some("object"));

        let err = JsonPointer::parse("/0/Dog").unwrap().evaluate(doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to evaluate pointer '/0/Dog'. Array has no member Dog at path '/0'."
        );
    }

    #[test]
    fn visiting_tracks_active_nodes() {
        let mut visiting = Visiting::default();
        assert!(visiting.enter(1));
        assert!(!visiting.enter(1));
        assert!(visiting.is_active(1));
        visiting.leave(1);
        assert!(!visiting.is_active(1));
        assert!(visiting.enter(1));
    }

    #[test]
    fn pointer_stops_at_unresolved_references() {
        let reference = Reference::from_value(
            &json!({"$ref": "#/components/schemas/B"}),
            crate::types::OpenApiVersion::V3_0,
            None,
        )
        .unwrap();
        let mut schemas = IndexMap::new();
        schemas.insert("A".to_string(), Property::Reference(reference));
        let doc = Property::Map(schemas);

        let err = JsonPointer::parse("/A/type").unwrap().evaluate(doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to evaluate pointer '/A/type'. Object has no member type at path '/A'."
        );
    }

    #[test]
    fn back_edges_follow_their_target() {
        let node = SpecObject::from_value(
            crate::spec::ObjectKind::Schema,
            &json!({"type": "object"}),
            crate::types::OpenApiVersion::V3_0,
        )
        .unwrap();
        let edge = Property::Recursive(Rc::downgrade(&node));
        assert!(!edge.is_empty());
        assert!(Rc::ptr_eq(&edge.to_object().unwrap(), &node));

        let found = JsonPointer::parse("/type").unwrap().evaluate(edge.clone()).unwrap();
        assert_eq!(found.as_str(), Some("object"));

        drop(node);
        assert!(edge.to_object().is_none());
        assert_eq!(edge.to_value(), Value::Null);
    }
}
