//! Memo store for a resolution pass.
//!
//! Entries are keyed by an absolute reference string plus an optional target
//! type. Storing a typed entry also stores it as the untyped fallback unless one
//! exists already, so the first resolution of a pointer decides what an untyped
//! lookup returns. Nothing is ever evicted.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::property::Property;

/// Type key under which parsed documents are stored.
pub const FILE_CONTENT: &str = "FILE_CONTENT";

/// A cached value.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Parsed content of a fetched document.
    File(Rc<Value>),
    /// Result of resolving a pointer.
    Resolved(Property),
}

#[derive(Debug, Default)]
pub struct ContextCache {
    entries: RefCell<HashMap<String, IndexMap<String, CacheEntry>>>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, reference: &str, type_key: Option<&str>, entry: CacheEntry) {
        let mut entries = self.entries.borrow_mut();
        let slot = entries.entry(reference.to_string()).or_default();
        slot.insert(type_key.unwrap_or("").to_string(), entry.clone());
        if type_key.is_some() && !slot.contains_key("") {
            slot.insert(String::new(), entry);
        }
    }

    pub fn get(&self, reference: &str, type_key: Option<&str>) -> Option<CacheEntry> {
        self.entries
            .borrow()
            .get(reference)
            .and_then(|slot| slot.get(type_key.unwrap_or("")))
            .cloned()
    }

    pub fn has(&self, reference: &str, type_key: Option<&str>) -> bool {
        self.entries
            .borrow()
            .get(reference)
            .map_or(false, |slot| slot.contains_key(type_key.unwrap_or("")))
    }

    /// Parsed content previously stored for `uri`.
    pub fn file(&self, uri: &str) -> Option<Rc<Value>> {
        match self.get(&file_key(uri), Some(FILE_CONTENT)) {
            Some(CacheEntry::File(content)) => Some(content),
            _ => None,
        }
    }

    pub fn set_file(&self, uri: &str, content: Rc<Value>) {
        self.set(&file_key(uri), Some(FILE_CONTENT), CacheEntry::File(content));
    }

    /// Number of distinct reference keys stored.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

fn file_key(uri: &str) -> String {
    format!("FILE_CONTENT://{}", uri)
}
