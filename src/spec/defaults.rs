//! Implicit attribute values defined by the OpenAPI specification.

use serde_json::{json, Value};

use crate::object::SpecObject;
use crate::property::Property;
use crate::spec::ObjectKind;

fn flag(value: bool) -> Option<Property> {
    Some(Property::Value(Value::Bool(value)))
}

fn text(value: &str) -> Option<Property> {
    Some(Property::Value(Value::String(value.to_string())))
}

fn stored_str(object: &SpecObject, name: &str) -> Option<String> {
    object
        .property(name)
        .and_then(|p| p.as_str().map(str::to_string))
}

/// Default for `name` on `object`, given what is stored on it now.
pub(crate) fn attribute_default(object: &SpecObject, name: &str) -> Option<Property> {
    if let Some(value) = object.build_default(name) {
        return Some(value);
    }
    match (object.kind(), name) {
        (ObjectKind::Schema, "additionalProperties") => flag(true),
        (ObjectKind::Schema, "nullable") if object.has_property_value("type") => flag(false),
        (ObjectKind::Schema, "exclusiveMinimum") if object.has_property_value("minimum") => {
            flag(false)
        }
        (ObjectKind::Schema, "exclusiveMaximum") if object.has_property_value("maximum") => {
            flag(false)
        }
        (ObjectKind::Schema, "required" | "enum" | "allOf" | "oneOf" | "anyOf") => {
            Some(Property::null())
        }

        (ObjectKind::Parameter, "style") => match stored_str(object, "in").as_deref() {
            Some("query" | "cookie") => text("form"),
            Some("path" | "header") => text("simple"),
            _ => None,
        },
        (ObjectKind::Parameter, "explode") => match stored_str(object, "style") {
            Some(style) => flag(style == "form"),
            None => match stored_str(object, "in").as_deref() {
                Some("query" | "cookie") => flag(true),
                Some("path" | "header") => flag(false),
                _ => None,
            },
        },

        (ObjectKind::Header, "style") => text("simple"),
        (ObjectKind::Header | ObjectKind::Encoding, "explode") => {
            flag(stored_str(object, "style").as_deref() == Some("form"))
        }

        (ObjectKind::OpenApi, "servers") => {
            let server =
                SpecObject::from_value(ObjectKind::Server, &json!({"url": "/"}), object.version())
                    .ok()?;
            Some(Property::List(vec![Property::Object(server)]))
        }
        _ => None,
    }
}

/// Default `contentType` of an encoding entry whose property has `schema`.
pub(crate) fn encoding_content_type(schema: &SpecObject) -> Option<&'static str> {
    let schema_type = stored_str(schema, "type")?;
    let (schema_type, format) = if schema_type == "array" {
        let items = schema.property("items")?.to_object()?;
        (stored_str(&items, "type")?, stored_str(&items, "format"))
    } else {
        (schema_type, stored_str(schema, "format"))
    };
    match schema_type.as_str() {
        "string" if format.as_deref() == Some("binary") => Some("application/octet-stream"),
        "string" | "boolean" | "integer" | "number" => Some("text/plain"),
        "object" => Some("application/json"),
        _ => None,
    }
}
