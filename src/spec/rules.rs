//! Per-type validation rules.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::object::SpecObject;
use crate::property::Property;
use crate::spec::{ObjectKind, COMPONENTS};
use crate::types::OpenApiVersion;

static COMPONENT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.\-_]+$").expect("component key pattern is valid"));

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

/// Rule violations of `object` itself (not its children).
pub(crate) fn check(object: &SpecObject) -> Vec<String> {
    let mut errors = Vec::new();
    let mut rules = Rules {
        object,
        errors: &mut errors,
    };
    match object.kind() {
        ObjectKind::OpenApi => rules.openapi(),
        ObjectKind::Info => rules.require(&["title", "version"]),
        ObjectKind::Contact => {
            rules.email("email");
            rules.url("url");
        }
        ObjectKind::License => {
            rules.require(&["name"]);
            rules.url("url");
        }
        ObjectKind::Server => rules.require(&["url"]),
        ObjectKind::ServerVariable => rules.require(&["default"]),
        ObjectKind::Components => rules.components(),
        ObjectKind::Paths => rules.paths(),
        ObjectKind::Operation => rules.require(&["responses"]),
        ObjectKind::ExternalDocumentation => {
            rules.require(&["url"]);
            rules.url("url");
        }
        ObjectKind::Parameter => rules.parameter(),
        ObjectKind::Header => rules.header(),
        ObjectKind::RequestBody => rules.require(&["content"]),
        ObjectKind::Response => rules.require(&["description"]),
        ObjectKind::Link => {
            if object.has_property_value("operationId") && object.has_property_value("operationRef") {
                rules.error("Link: operationId and operationRef are mutually exclusive.".to_string());
            }
        }
        ObjectKind::Tag => rules.require(&["name"]),
        ObjectKind::Discriminator => rules.require(&["propertyName"]),
        ObjectKind::SecurityScheme => rules.security_scheme(),
        ObjectKind::OAuthFlow => rules.require(&["scopes"]),
        _ => {}
    }
    errors
}

struct Rules<'a> {
    object: &'a SpecObject,
    errors: &'a mut Vec<String>,
}

impl Rules<'_> {
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn text(&self, name: &str) -> Option<String> {
        self.object.get_str(name)
    }

    fn require(&mut self, names: &[&str]) {
        for name in names {
            if !self.object.has_property_value(name) {
                let message = format!("{} is missing required property: {}", self.object.kind(), name);
                self.error(message);
            }
        }
    }

    fn require_one_of(&mut self, names: &[&str]) {
        if !names.iter().any(|name| self.object.has_property(name)) {
            let message = format!(
                "{} is missing at least one of the following required properties: {}",
                self.object.kind(),
                names.join(", ")
            );
            self.error(message);
        }
    }

    fn email(&mut self, name: &str) {
        if let Some(value) = self.text(name) {
            if !EMAIL.is_match(&value) {
                let message = format!(
                    "{}::${} does not seem to be a valid email address: {}",
                    self.object.kind(),
                    name,
                    value
                );
                self.error(message);
            }
        }
    }

    fn url(&mut self, name: &str) {
        if let Some(value) = self.text(name) {
            if !value.contains("//") {
                let message = format!(
                    "{}::${} does not seem to be a valid URL: {}",
                    self.object.kind(),
                    name,
                    value
                );
                self.error(message);
            }
        }
    }

    fn openapi(&mut self) {
        if self.object.version() == OpenApiVersion::V3_0 {
            self.require(&["openapi", "info", "paths"]);
        } else {
            self.require(&["openapi", "info"]);
            self.require_one_of(&["paths", "webhooks", "components"]);
        }
        if let Some(version) = self.text("openapi") {
            if !OpenApiVersion::is_supported(&version) {
                self.error(format!("Unsupported openapi version: {}", version));
            }
        }
    }

    fn components(&mut self) {
        for (attribute, _) in COMPONENTS {
            let Some(Property::Map(entries)) = self.object.property(attribute) else {
                continue;
            };
            for key in entries.keys() {
                if !COMPONENT_KEY.is_match(key) {
                    self.error(format!(
                        "Invalid key '{}' used in Components Object for attribute '{}', does not match ^[a-zA-Z0-9\\.\\-_]+$.",
                        key, attribute
                    ));
                }
            }
        }
    }

    fn paths(&mut self) {
        let keys: Vec<String> = self.object.properties().keys().cloned().collect();
        for key in keys {
            if !key.starts_with('/') && !key.starts_with("x-") {
                self.error(format!("Path must begin with /: {}", key));
            }
        }
    }

    fn parameter(&mut self) {
        self.require(&["name", "in"]);
        let location = self.text("in");
        if location.as_deref() == Some("path") && self.object.get_bool("required") != Some(true) {
            self.error("Parameter 'required' must be true for 'in': 'path'.".to_string());
        }
        self.schema_or_content("A Parameter Object MUST contain either a schema property, or a content property, but not both.");
        if let Some(Property::Map(content)) = self.object.property("content") {
            if content.len() > 1 {
                self.error("A Parameter Object with Content property MUST have A SINGLE content type.".to_string());
            }
        }

        let allowed: &[&str] = match location.as_deref() {
            Some("path") => &["simple", "label", "matrix"],
            Some("query") => &["form", "spaceDelimited", "pipeDelimited", "deepObject"],
            Some("header") => &["simple"],
            Some("cookie") => &["form"],
            _ => return,
        };
        if let Some(style) = self.text("style") {
            if !allowed.contains(&style.as_str()) {
                self.error("A Parameter Object DOES NOT support this serialization style.".to_string());
            }
        }
    }

    fn header(&mut self) {
        for name in ["name", "in"] {
            if self.object.has_property_value(name) {
                self.error(format!("'{}' must not be specified in Header Object.", name));
            }
        }
        self.schema_or_content(
            "A Header Object MUST contain either a schema property, or a content property, but not both. ",
        );
    }

    fn schema_or_content(&mut self, message: &str) {
        if self.object.has_property_value("schema") && self.object.has_property_value("content") {
            self.error(message.to_string());
        }
    }

    fn security_scheme(&mut self) {
        self.require(&["type"]);
        let Some(scheme_type) = self.text("type") else {
            return;
        };
        match scheme_type.as_str() {
            "apiKey" => {
                self.require(&["name", "in"]);
                if let Some(location) = self.text("in") {
                    if !matches!(location.as_str(), "query" | "header" | "cookie") {
                        self.error(format!("Invalid value for Security Scheme property 'in': {}", location));
                    }
                }
            }
            "http" => self.require(&["scheme"]),
            "oauth2" => self.require(&["flows"]),
            "openIdConnect" => self.require(&["openIdConnectUrl"]),
            "mutualTLS" => {}
            other => self.error(format!("Unknown Security Scheme type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::rc::Rc;

    fn node(kind: ObjectKind, data: Value) -> Rc<SpecObject> {
        SpecObject::from_value(kind, &data, OpenApiVersion::V3_0).unwrap()
    }

    fn errors(kind: ObjectKind, data: Value) -> Vec<String> {
        let object = node(kind, data);
        object.validate();
        object.get_errors()
    }

    #[test]
    fn openapi_3_0_requires_paths() {
        let errs = errors(ObjectKind::OpenApi, json!({"openapi": "3.0.2", "info": {"title": "T", "version": "1"}}));
        assert_eq!(errs, vec!["OpenApi is missing required property: paths"]);
    }

    #[test]
    fn openapi_3_1_requires_one_of() {
        let errs = errors(ObjectKind::OpenApi, json!({"openapi": "3.1.0", "info": {"title": "T", "version": "1"}}));
        assert_eq!(
            errs,
            vec!["OpenApi is missing at least one of the following required properties: paths, webhooks, components"]
        );
        let errs = errors(
            ObjectKind::OpenApi,
            json!({"openapi": "3.1.0", "info": {"title": "T", "version": "1"}, "webhooks": {}}),
        );
        assert!(errs.is_empty());
    }

    #[test]
    fn unsupported_version() {
        let errs = errors(ObjectKind::OpenApi, json!({"openapi": "2.0", "info": {"title": "T", "version": "1"}, "paths": {}}));
        assert!(errs.contains(&"Unsupported openapi version: 2.0".to_string()));
    }

    #[test]
    fn contact_checks_email_and_url() {
        let errs = errors(ObjectKind::Contact, json!({"email": "nope", "url": "example.com"}));
        assert_eq!(
            errs,
            vec![
                "Contact::$email does not seem to be a valid email address: nope",
                "Contact::$url does not seem to be a valid URL: example.com",
            ]
        );
        assert!(errors(ObjectKind::Contact, json!({"email": "a@b.io", "url": "https://b.io"})).is_empty());
    }

    #[test]
    fn path_parameter_must_be_required() {
        let errs = errors(ObjectKind::Parameter, json!({"name": "id", "in": "path", "schema": {}}));
        assert_eq!(errs, vec!["Parameter 'required' must be true for 'in': 'path'."]);
    }

    #[test]
    fn parameter_schema_xor_content() {
        let errs = errors(
            ObjectKind::Parameter,
            json!({"name": "q", "in": "query", "schema": {}, "content": {"a/b": {}, "c/d": {}}}),
        );
        assert_eq!(
            errs,
            vec![
                "A Parameter Object MUST contain either a schema property, or a content property, but not both.",
                "A Parameter Object with Content property MUST have A SINGLE content type.",
            ]
        );
    }

    #[test]
    fn parameter_style_per_location() {
        let errs = errors(ObjectKind::Parameter, json!({"name": "q", "in": "header", "style": "form"}));
        assert_eq!(errs, vec!["A Parameter Object DOES NOT support this serialization style."]);
        assert!(errors(ObjectKind::Parameter, json!({"name": "q", "in": "query", "style": "deepObject"})).is_empty());
    }

    #[test]
    fn header_must_not_have_name_or_in() {
        let errs = errors(ObjectKind::Header, json!({"name": "X", "in": "header"}));
        assert_eq!(
            errs,
            vec![
                "'name' must not be specified in Header Object.",
                "'in' must not be specified in Header Object.",
            ]
        );
    }

    #[test]
    fn link_operation_id_xor_ref() {
        let errs = errors(ObjectKind::Link, json!({"operationId": "a", "operationRef": "#/b"}));
        assert_eq!(errs, vec!["Link: operationId and operationRef are mutually exclusive."]);
    }

    #[test]
    fn component_keys_are_checked() {
        let errs = errors(ObjectKind::Components, json!({"schemas": {"Pet": {}, "Pet Store": {}}}));
        assert_eq!(
            errs,
            vec!["Invalid key 'Pet Store' used in Components Object for attribute 'schemas', does not match ^[a-zA-Z0-9\\.\\-_]+$."]
        );
    }

    #[test]
    fn paths_must_start_with_slash() {
        let errs = errors(ObjectKind::Paths, json!({"pets": {}, "/pets": {}}));
        assert_eq!(errs, vec!["Path must begin with /: pets"]);
    }

    #[test]
    fn security_scheme_requirements() {
        let errs = errors(ObjectKind::SecurityScheme, json!({"type": "apiKey", "in": "body"}));
        assert_eq!(
            errs,
            vec![
                "SecurityScheme is missing required property: name",
                "Invalid value for Security Scheme property 'in': body",
            ]
        );
        let errs = errors(ObjectKind::SecurityScheme, json!({"type": "magic"}));
        assert_eq!(errs, vec!["Unknown Security Scheme type: magic"]);
        assert!(errors(ObjectKind::SecurityScheme, json!({"type": "http", "scheme": "bearer"})).is_empty());
    }

    #[test]
    fn rule_errors_are_replaced_on_revalidation() {
        let info = node(ObjectKind::Info, json!({"title": "T"}));
        assert!(!info.validate());
        info.set("version", Value::String("1".into()));
        assert!(info.validate());
        assert!(info.get_errors().is_empty());
    }
}
