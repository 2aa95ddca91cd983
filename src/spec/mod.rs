//! Node types of an OpenAPI 3.0/3.1 document and their attribute tables.
//!
//! Each [`ObjectKind`] either declares a fixed list of named attributes or a
//! single element type for free-form keys (paths, status codes, ...).

pub(crate) mod defaults;
pub(crate) mod rules;

use std::fmt;

use crate::types::OpenApiVersion;

/// Every node type of the document model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    OpenApi,
    Info,
    Contact,
    License,
    Server,
    ServerVariable,
    Components,
    Paths,
    PathItem,
    Operation,
    ExternalDocumentation,
    Parameter,
    RequestBody,
    MediaType,
    Encoding,
    Responses,
    Response,
    Callback,
    Example,
    Link,
    Header,
    Tag,
    Reference,
    Schema,
    Discriminator,
    Xml,
    SecurityScheme,
    OAuthFlows,
    OAuthFlow,
    SecurityRequirement,
}

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    String,
    Boolean,
    Integer,
    Number,
    Any,
    Object(ObjectKind),
    /// `additionalProperties`: a boolean or a Schema.
    SchemaOrBool,
    List(Elem),
    Map(Elem),
}

/// Element type of a list or map attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elem {
    String,
    Any,
    Object(ObjectKind),
}

/// Attribute layout of a node type.
#[derive(Debug, Clone, Copy)]
pub enum Attributes {
    Fixed(&'static [(&'static str, AttrType)]),
    /// Free-form keys, all holding the same type.
    Patterned(AttrType),
}

impl AttrType {
    /// Node type instantiated for this attribute, if any.
    pub fn object_kind(self) -> Option<ObjectKind> {
        match self {
            AttrType::Object(kind)
            | AttrType::List(Elem::Object(kind))
            | AttrType::Map(Elem::Object(kind)) => Some(kind),
            AttrType::SchemaOrBool => Some(ObjectKind::Schema),
            _ => None,
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, AttrType::List(_) | AttrType::Map(_))
    }

    pub(crate) fn scalar_name(self) -> Option<&'static str> {
        match self {
            AttrType::String => Some("string"),
            AttrType::Boolean => Some("boolean"),
            AttrType::Integer => Some("integer"),
            AttrType::Number => Some("number"),
            _ => None,
        }
    }
}

use self::AttrType as T;
use self::Elem as E;
use self::ObjectKind as K;

const OPENAPI: &[(&str, AttrType)] = &[
    ("openapi", T::String),
    ("info", T::Object(K::Info)),
    ("servers", T::List(E::Object(K::Server))),
    ("paths", T::Object(K::Paths)),
    ("components", T::Object(K::Components)),
    ("externalDocs", T::Object(K::ExternalDocumentation)),
    ("security", T::List(E::Object(K::SecurityRequirement))),
    ("tags", T::List(E::Object(K::Tag))),
    ("webhooks", T::Map(E::Object(K::PathItem))),
];

const INFO: &[(&str, AttrType)] = &[
    ("title", T::String),
    ("summary", T::String),
    ("description", T::String),
    ("termsOfService", T::String),
    ("contact", T::Object(K::Contact)),
    ("license", T::Object(K::License)),
    ("version", T::String),
];

const CONTACT: &[(&str, AttrType)] = &[
    ("name", T::String),
    ("url", T::String),
    ("email", T::String),
];

const LICENSE: &[(&str, AttrType)] = &[
    ("name", T::String),
    ("identifier", T::String),
    ("url", T::String),
];

const SERVER: &[(&str, AttrType)] = &[
    ("url", T::String),
    ("description", T::String),
    ("variables", T::Map(E::Object(K::ServerVariable))),
];

const SERVER_VARIABLE: &[(&str, AttrType)] = &[
    ("default", T::String),
    ("description", T::String),
    ("enum", T::List(E::String)),
];

pub(crate) const COMPONENTS: &[(&str, AttrType)] = &[
    ("callbacks", T::Map(E::Object(K::Callback))),
    ("examples", T::Map(E::Object(K::Example))),
    ("headers", T::Map(E::Object(K::Header))),
    ("links", T::Map(E::Object(K::Link))),
    ("parameters", T::Map(E::Object(K::Parameter))),
    ("requestBodies", T::Map(E::Object(K::RequestBody))),
    ("responses", T::Map(E::Object(K::Response))),
    ("schemas", T::Map(E::Object(K::Schema))),
    ("securitySchemes", T::Map(E::Object(K::SecurityScheme))),
    ("pathItems", T::Map(E::Object(K::PathItem))),
];

pub(crate) const PATH_ITEM: &[(&str, AttrType)] = &[
    ("delete", T::Object(K::Operation)),
    ("description", T::String),
    ("get", T::Object(K::Operation)),
    ("head", T::Object(K::Operation)),
    ("options", T::Object(K::Operation)),
    ("parameters", T::List(E::Object(K::Parameter))),
    ("patch", T::Object(K::Operation)),
    ("post", T::Object(K::Operation)),
    ("put", T::Object(K::Operation)),
    ("servers", T::List(E::Object(K::Server))),
    ("summary", T::String),
    ("trace", T::Object(K::Operation)),
];

const OPERATION: &[(&str, AttrType)] = &[
    ("tags", T::List(E::String)),
    ("summary", T::String),
    ("description", T::String),
    ("externalDocs", T::Object(K::ExternalDocumentation)),
    ("operationId", T::String),
    ("parameters", T::List(E::Object(K::Parameter))),
    ("requestBody", T::Object(K::RequestBody)),
    ("responses", T::Object(K::Responses)),
    ("callbacks", T::Map(E::Object(K::Callback))),
    ("deprecated", T::Boolean),
    ("security", T::List(E::Object(K::SecurityRequirement))),
    ("servers", T::List(E::Object(K::Server))),
];

const EXTERNAL_DOCUMENTATION: &[(&str, AttrType)] = &[
    ("description", T::String),
    ("url", T::String),
];

/// Parameter and Header share one layout.
const PARAMETER: &[(&str, AttrType)] = &[
    ("name", T::String),
    ("in", T::String),
    ("description", T::String),
    ("required", T::Boolean),
    ("deprecated", T::Boolean),
    ("allowEmptyValue", T::Boolean),
    ("style", T::String),
    ("explode", T::Boolean),
    ("allowReserved", T::Boolean),
    ("schema", T::Object(K::Schema)),
    ("example", T::Any),
    ("examples", T::Map(E::Object(K::Example))),
    ("content", T::Map(E::Object(K::MediaType))),
];

const REQUEST_BODY: &[(&str, AttrType)] = &[
    ("description", T::String),
    ("content", T::Map(E::Object(K::MediaType))),
    ("required", T::Boolean),
];

const MEDIA_TYPE: &[(&str, AttrType)] = &[
    ("schema", T::Object(K::Schema)),
    ("example", T::Any),
    ("examples", T::Map(E::Object(K::Example))),
    ("encoding", T::Map(E::Object(K::Encoding))),
];

const ENCODING: &[(&str, AttrType)] = &[
    ("contentType", T::String),
    ("headers", T::Map(E::Object(K::Header))),
    ("style", T::String),
    ("explode", T::Boolean),
    ("allowReserved", T::Boolean),
];

const RESPONSE: &[(&str, AttrType)] = &[
    ("description", T::String),
    ("headers", T::Map(E::Object(K::Header))),
    ("content", T::Map(E::Object(K::MediaType))),
    ("links", T::Map(E::Object(K::Link))),
];

const EXAMPLE: &[(&str, AttrType)] = &[
    ("summary", T::String),
    ("description", T::String),
    ("value", T::Any),
    ("externalValue", T::String),
];

const LINK: &[(&str, AttrType)] = &[
    ("operationRef", T::String),
    ("operationId", T::String),
    ("parameters", T::Map(E::Any)),
    ("requestBody", T::Any),
    ("description", T::String),
    ("server", T::Object(K::Server)),
];

const TAG: &[(&str, AttrType)] = &[
    ("name", T::String),
    ("description", T::String),
    ("externalDocs", T::Object(K::ExternalDocumentation)),
];

const REFERENCE_3_0: &[(&str, AttrType)] = &[("$ref", T::String)];

const REFERENCE_3_1: &[(&str, AttrType)] = &[
    ("$ref", T::String),
    ("summary", T::String),
    ("description", T::String),
];

// `type` and the exclusive bounds changed shape between 3.0 and 3.1, so they
// are not type-checked.
const SCHEMA: &[(&str, AttrType)] = &[
    ("title", T::String),
    ("multipleOf", T::Number),
    ("maximum", T::Number),
    ("exclusiveMaximum", T::Any),
    ("minimum", T::Number),
    ("exclusiveMinimum", T::Any),
    ("maxLength", T::Integer),
    ("minLength", T::Integer),
    ("pattern", T::String),
    ("maxItems", T::Integer),
    ("minItems", T::Integer),
    ("uniqueItems", T::Boolean),
    ("maxProperties", T::Integer),
    ("minProperties", T::Integer),
    ("required", T::List(E::String)),
    ("enum", T::List(E::Any)),
    ("type", T::Any),
    ("allOf", T::List(E::Object(K::Schema))),
    ("oneOf", T::List(E::Object(K::Schema))),
    ("anyOf", T::List(E::Object(K::Schema))),
    ("not", T::Object(K::Schema)),
    ("items", T::Object(K::Schema)),
    ("properties", T::Map(E::Object(K::Schema))),
    ("additionalProperties", T::SchemaOrBool),
    ("description", T::String),
    ("format", T::String),
    ("default", T::Any),
    ("nullable", T::Boolean),
    ("discriminator", T::Object(K::Discriminator)),
    ("readOnly", T::Boolean),
    ("writeOnly", T::Boolean),
    ("xml", T::Object(K::Xml)),
    ("externalDocs", T::Object(K::ExternalDocumentation)),
    ("example", T::Any),
    ("deprecated", T::Boolean),
];

const DISCRIMINATOR: &[(&str, AttrType)] = &[
    ("propertyName", T::String),
    ("mapping", T::Map(E::String)),
];

const XML: &[(&str, AttrType)] = &[
    ("name", T::String),
    ("namespace", T::String),
    ("prefix", T::String),
    ("attribute", T::Boolean),
    ("wrapped", T::Boolean),
];

const SECURITY_SCHEME: &[(&str, AttrType)] = &[
    ("type", T::String),
    ("description", T::String),
    ("name", T::String),
    ("in", T::String),
    ("scheme", T::String),
    ("bearerFormat", T::String),
    ("flows", T::Object(K::OAuthFlows)),
    ("openIdConnectUrl", T::String),
];

const OAUTH_FLOWS: &[(&str, AttrType)] = &[
    ("implicit", T::Object(K::OAuthFlow)),
    ("password", T::Object(K::OAuthFlow)),
    ("clientCredentials", T::Object(K::OAuthFlow)),
    ("authorizationCode", T::Object(K::OAuthFlow)),
];

const OAUTH_FLOW: &[(&str, AttrType)] = &[
    ("authorizationUrl", T::String),
    ("tokenUrl", T::String),
    ("refreshUrl", T::String),
    ("scopes", T::Map(E::String)),
];

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            K::OpenApi => "OpenApi",
            K::Info => "Info",
            K::Contact => "Contact",
            K::License => "License",
            K::Server => "Server",
            K::ServerVariable => "ServerVariable",
            K::Components => "Components",
            K::Paths => "Paths",
            K::PathItem => "PathItem",
            K::Operation => "Operation",
            K::ExternalDocumentation => "ExternalDocumentation",
            K::Parameter => "Parameter",
            K::RequestBody => "RequestBody",
            K::MediaType => "MediaType",
            K::Encoding => "Encoding",
            K::Responses => "Responses",
            K::Response => "Response",
            K::Callback => "Callback",
            K::Example => "Example",
            K::Link => "Link",
            K::Header => "Header",
            K::Tag => "Tag",
            K::Reference => "Reference",
            K::Schema => "Schema",
            K::Discriminator => "Discriminator",
            K::Xml => "Xml",
            K::SecurityScheme => "SecurityScheme",
            K::OAuthFlows => "OAuthFlows",
            K::OAuthFlow => "OAuthFlow",
            K::SecurityRequirement => "SecurityRequirement",
        }
    }

    /// Attribute layout for this kind under `version`.
    pub fn attributes(self, version: OpenApiVersion) -> Attributes {
        let fixed = match self {
            K::OpenApi => OPENAPI,
            K::Info => INFO,
            K::Contact => CONTACT,
            K::License => LICENSE,
            K::Server => SERVER,
            K::ServerVariable => SERVER_VARIABLE,
            K::Components => COMPONENTS,
            K::PathItem => PATH_ITEM,
            K::Operation => OPERATION,
            K::ExternalDocumentation => EXTERNAL_DOCUMENTATION,
            K::Parameter | K::Header => PARAMETER,
            K::RequestBody => REQUEST_BODY,
            K::MediaType => MEDIA_TYPE,
            K::Encoding => ENCODING,
            K::Response => RESPONSE,
            K::Example => EXAMPLE,
            K::Link => LINK,
            K::Tag => TAG,
            K::Reference if version == OpenApiVersion::V3_1 => REFERENCE_3_1,
            K::Reference => REFERENCE_3_0,
            K::Schema => SCHEMA,
            K::Discriminator => DISCRIMINATOR,
            K::Xml => XML,
            K::SecurityScheme => SECURITY_SCHEME,
            K::OAuthFlows => OAUTH_FLOWS,
            K::OAuthFlow => OAUTH_FLOW,
            K::Paths | K::Callback => return Attributes::Patterned(T::Object(K::PathItem)),
            K::Responses => return Attributes::Patterned(T::Object(K::Response)),
            K::SecurityRequirement => return Attributes::Patterned(T::List(E::String)),
        };
        Attributes::Fixed(fixed)
    }

    /// Declared type of `name`, or the element type for patterned kinds.
    pub fn attribute(self, version: OpenApiVersion, name: &str) -> Option<AttrType> {
        match self.attributes(version) {
            Attributes::Fixed(table) => table.iter().find(|(n, _)| *n == name).map(|(_, t)| *t),
            Attributes::Patterned(elem) => Some(elem),
        }
    }

    pub fn is_patterned(self) -> bool {
        matches!(self.attributes(OpenApiVersion::V3_0), Attributes::Patterned(_))
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_attributes_depend_on_version() {
        assert_eq!(
            K::Reference.attribute(OpenApiVersion::V3_0, "summary"),
            None
        );
        assert_eq!(
            K::Reference.attribute(OpenApiVersion::V3_1, "summary"),
            Some(T::String)
        );
    }

    #[test]
    fn patterned_kinds() {
        assert!(K::Paths.is_patterned());
        assert!(K::Responses.is_patterned());
        assert!(K::Callback.is_patterned());
        assert!(K::SecurityRequirement.is_patterned());
        assert!(!K::PathItem.is_patterned());
        assert_eq!(
            K::Responses.attribute(OpenApiVersion::V3_0, "200"),
            Some(T::Object(K::Response))
        );
    }

    #[test]
    fn object_kind_of_attribute() {
        let v = OpenApiVersion::V3_0;
        let kind = |k: ObjectKind, n: &str| k.attribute(v, n).and_then(AttrType::object_kind);
        assert_eq!(kind(K::Components, "schemas"), Some(K::Schema));
        assert_eq!(kind(K::Operation, "parameters"), Some(K::Parameter));
        assert_eq!(kind(K::Schema, "additionalProperties"), Some(K::Schema));
        assert_eq!(kind(K::Schema, "title"), None);
        assert_eq!(kind(K::Operation, "tags"), None);
    }

    #[test]
    fn header_shares_parameter_layout() {
        let v = OpenApiVersion::V3_1;
        assert_eq!(K::Header.attribute(v, "style"), Some(T::String));
        assert_eq!(K::Header.attribute(v, "content"), K::Parameter.attribute(v, "content"));
    }
}
