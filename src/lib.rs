//! OpenAPI Resolver
//!
//! Typed OpenAPI 3.0/3.1 documents with JSON Reference resolution.
//!
//! Documents are read into a tree of [`SpecObject`] nodes. `$ref` markers become
//! [`Reference`] nodes that can be resolved within the same document, across
//! local files and over HTTP. Resolved nodes are shared, so a node referenced
//! from several places is one node.
//!
//! # Example
//!
//! ```
//! use openapi_resolver::{read_from_yaml, ObjectKind, ReferenceContext};
//! use std::rc::Rc;
//!
//! let root = read_from_yaml(
//!     r##"
//! openapi: 3.0.3
//! info: { title: Pets, version: "1.0" }
//! paths:
//!   /pets:
//!     get:
//!       responses:
//!         "200": { $ref: "#/components/responses/PetList" }
//! components:
//!   responses:
//!     PetList: { description: A list of pets }
//! "##,
//!     ObjectKind::OpenApi,
//! )
//! .unwrap();
//!
//! let context = Rc::new(ReferenceContext::new(Some(&root), "/specs/pets.yaml").unwrap());
//! root.resolve_references(Some(&context)).unwrap();
//!
//! let data = root.get_serializable_data();
//! assert_eq!(
//!     data["paths"]["/pets"]["get"]["responses"]["200"]["description"],
//!     "A list of pets"
//! );
//! assert!(root.validate());
//! ```
//!
//! # Resolution modes
//!
//! | Mode | Same-document `$ref` | `$ref` into other documents |
//! |------|----------------------|-----------------------------|
//! | [`ResolveMode::All`] | Replaced by the target node | Replaced by the target node |
//! | [`ResolveMode::Inline`] | Kept | Replaced; their references into the base document are kept |
//!
//! Reference loops (`A -> B -> A`) are reported as
//! [`SpecError::CyclicReference`]. Recursive schemas are fine: the resolved
//! graph then contains itself and serializes back to a `$ref`.

mod cache;
mod context;
mod document_reference;
mod error;
mod loader;
mod object;
mod pointer;
mod property;
mod reader;
mod reference;
mod spec;
mod target;
mod types;
mod uri;
mod writer;

pub use cache::{CacheEntry, ContextCache, FILE_CONTENT};
pub use context::ReferenceContext;
pub use document_reference::DocumentReference;
pub use error::SpecError;
pub use loader::{is_url, load_file, load_uri, parse_document, parse_json, parse_yaml};
pub use object::{DocumentPosition, SpecObject};
pub use pointer::{Child, Container, JsonPointer, Navigate};
pub use property::{ObjectRef, Property, ReferenceRef};
pub use reader::{read_from_file, read_from_json, read_from_yaml, Document};
pub use reference::Reference;
pub use spec::{AttrType, Attributes, Elem, ObjectKind};
pub use target::ReferenceTarget;
pub use types::{FailurePolicy, OpenApiVersion, ReadOptions, ResolveMode, REF_KEY};
pub use uri::{make_relative_path, normalize_uri, resolve_relative_uri};
pub use writer::{write_to_json, write_to_json_file, write_to_yaml, write_to_yaml_file};

#[cfg(feature = "remote")]
pub use loader::load_url;
