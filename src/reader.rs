//! Reading documents from text, files and URLs.

use std::ops::Deref;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use crate::context::ReferenceContext;
use crate::error::SpecError;
use crate::loader::{is_url, load_file, load_uri, parse_document, parse_json, parse_yaml};
use crate::object::SpecObject;
use crate::property::ObjectRef;
use crate::spec::ObjectKind;
use crate::types::{OpenApiVersion, ReadOptions};

/// A document read from a file or URL, together with the context its
/// references resolve in.
#[derive(Debug)]
pub struct Document {
    root: ObjectRef,
    context: Rc<ReferenceContext>,
}

impl Document {
    pub fn root(&self) -> &ObjectRef {
        &self.root
    }

    pub fn context(&self) -> &Rc<ReferenceContext> {
        &self.context
    }

    /// Resolve the references left in the document, in its own context.
    ///
    /// # Errors
    ///
    /// See [`SpecObject::resolve_references`].
    pub fn resolve_references(&self) -> Result<(), SpecError> {
        self.root.resolve_references(Some(&self.context))
    }

    pub fn into_parts(self) -> (ObjectRef, Rc<ReferenceContext>) {
        (self.root, self.context)
    }
}

impl Deref for Document {
    type Target = SpecObject;

    fn deref(&self) -> &SpecObject {
        &self.root
    }
}

/// Build a node of `kind` from JSON text.
///
/// # Errors
///
/// Returns `SpecError::Parse` on syntax errors and `SpecError::TypeError` when
/// the data cannot become a node.
pub fn read_from_json(text: &str, kind: ObjectKind) -> Result<ObjectRef, SpecError> {
    let value = parse_json(text, "<json>")?;
    SpecObject::from_value(kind, &value, OpenApiVersion::Unsupported)
}

/// Build a node of `kind` from YAML text.
///
/// # Errors
///
/// Returns `SpecError::Parse` on syntax errors and `SpecError::TypeError` when
/// the data cannot become a node.
pub fn read_from_yaml(text: &str, kind: ObjectKind) -> Result<ObjectRef, SpecError> {
    let value = parse_yaml(text, "<yaml>")?;
    SpecObject::from_value(kind, &value, OpenApiVersion::Unsupported)
}

/// Read a document from a local path or an `http(s)://`/`file://` URI.
///
/// Positions are stamped on every node. With `options.resolve` set, all
/// references are resolved before returning, using the given mode and
/// failure policy.
///
/// # Errors
///
/// Returns IO, parse and construction errors, and resolution errors not
/// recorded under the failure policy.
pub fn read_from_file(
    source: &str,
    kind: ObjectKind,
    options: &ReadOptions,
) -> Result<Document, SpecError> {
    let (uri, text) = if is_url(source) || source.contains("://") {
        (source.to_string(), load_uri(source)?)
    } else {
        let path = Path::new(source);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| SpecError::Io {
                    uri: source.to_string(),
                    message: e.to_string(),
                })?
                .join(path)
        };
        let text = load_file(&absolute)?;
        (absolute.display().to_string(), text)
    };
    info!(source, "reading document");

    let value = parse_document(&text, &uri)?;
    let root = SpecObject::from_value(kind, &value, OpenApiVersion::Unsupported)?;

    let mut context = ReferenceContext::new(Some(&root), &uri)?
        .with_failure_policy(options.failure_policy);
    if let Some(mode) = options.resolve {
        context = context.with_mode(mode);
    }
    let context = Rc::new(context);
    context.cache().set_file(context.uri(), Rc::new(value));

    root.set_reference_context(&context);
    root.set_document_root();
    if let Some(mode) = options.resolve {
        debug!(?mode, "resolving references");
        root.resolve_references(Some(&context))?;
    }
    Ok(Document { root, context })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolveMode;

    #[test]
    fn read_json_text() {
        let root = read_from_json(
            r#"{"openapi": "3.0.0", "info": {"title": "T", "version": "1"}, "paths": {}}"#,
            ObjectKind::OpenApi,
        )
        .unwrap();
        assert_eq!(root.version(), OpenApiVersion::V3_0);
        assert!(root.validate());
    }

    #[test]
    fn read_yaml_text_of_any_kind() {
        let schema = read_from_yaml("type: string\nformat: date\n", ObjectKind::Schema).unwrap();
        assert_eq!(schema.kind(), ObjectKind::Schema);
        assert_eq!(schema.get_str("format").as_deref(), Some("date"));
    }

    #[test]
    fn read_reports_syntax_errors() {
        assert!(matches!(
            read_from_json("{", ObjectKind::OpenApi),
            Err(SpecError::Parse { .. })
        ));
    }

    #[test]
    fn read_file_stamps_positions_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(
            &path,
            "openapi: 3.0.0\ninfo:\n  title: T\n  version: '1'\npaths: {}\ncomponents:\n  schemas:\n    A:\n      $ref: '#/components/schemas/B'\n    B:\n      type: string\n",
        )
        .unwrap();

        let doc = read_from_file(
            path.to_str().unwrap(),
            ObjectKind::OpenApi,
            &ReadOptions::new(),
        )
        .unwrap();
        let schemas = doc.get_object("components").unwrap().get("schemas").unwrap();
        let a = schemas.entry("A").unwrap().as_object().unwrap();
        let b = schemas.entry("B").unwrap().as_object().unwrap();
        assert!(Rc::ptr_eq(a, b));
        assert_eq!(b.position().unwrap().pointer.as_str(), "/components/schemas/B");
        assert_eq!(doc.context().mode(), ResolveMode::All);
    }

    #[test]
    fn read_file_without_resolving() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        std::fs::write(
            &path,
            r##"{"openapi": "3.0.0", "info": {"title": "T", "version": "1"}, "paths": {}, "components": {"schemas": {"A": {"$ref": "#/components/schemas/B"}, "B": {}}}}"##,
        )
        .unwrap();

        let doc = read_from_file(
            path.to_str().unwrap(),
            ObjectKind::OpenApi,
            &ReadOptions::new().resolve(None),
        )
        .unwrap();
        let schemas = doc.get_object("components").unwrap().get("schemas").unwrap();
        assert!(schemas.entry("A").unwrap().as_reference().is_some());

        doc.resolve_references().unwrap();
        let schemas = doc.get_object("components").unwrap().get("schemas").unwrap();
        assert!(schemas.entry("A").unwrap().as_object().is_some());
    }

    #[test]
    fn read_missing_file() {
        let err = read_from_file("/nonexistent/api.yaml", ObjectKind::OpenApi, &ReadOptions::new())
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
