//! Language extractors: file text in, ordered entity list out.
//!
//! One full-AST extractor (Python, via tree-sitter) is the reference; six
//! pattern-matching extractors (TypeScript, JavaScript, Rust, C, C++, Java)
//! cover the rest with predictably degraded feature coverage. Every
//! extractor is total: parse failures produce an empty or partial result,
//! never a panic across the extraction boundary.

pub mod c_family;
pub mod java;
pub mod javascript;
pub mod patterns;
pub mod python;
pub mod recovery;
pub mod rust_lang;
pub mod typescript;

use carto_core::entity::{Entity, EntityKind};
use std::collections::HashMap;

/// How an extraction went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// Parsed cleanly.
    Clean,
    /// The file was transiently unparseable; entities were recovered from a
    /// reduced version and carry medium confidence.
    Recovered,
    /// Nothing could be recovered. The caller should keep whatever it had.
    Failed,
}

/// Result of one extraction run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub status: ParseStatus,
}

impl Extraction {
    pub fn clean(entities: Vec<Entity>) -> Self {
        Extraction {
            entities,
            status: ParseStatus::Clean,
        }
    }
}

/// The uniform capability set every extractor exposes.
pub trait Extractor: Send + Sync {
    /// Short language tag, e.g. `"python"`.
    fn language(&self) -> &'static str;

    /// Whether this extractor claims the file.
    fn can_handle(&self, file_path: &str) -> bool;

    /// Extract entities in source order. Must not panic on malformed input.
    fn extract(&self, source: &str, file_path: &str) -> Extraction;
}

/// Extension-indexed extractor registry. First match wins; files no
/// extractor claims never enter the graph. Built once at process start.
pub struct Registry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl Registry {
    /// The default extractor set: reference Python extractor first, then
    /// the six pattern-matching fallbacks.
    pub fn with_default_extractors() -> Self {
        Registry {
            extractors: vec![
                Box::new(python::PythonExtractor::new()),
                Box::new(typescript::TypeScriptExtractor),
                Box::new(javascript::JavaScriptExtractor),
                Box::new(rust_lang::RustExtractor),
                Box::new(c_family::CExtractor),
                Box::new(c_family::CppExtractor),
                Box::new(java::JavaExtractor),
            ],
        }
    }

    pub fn for_path(&self, file_path: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.can_handle(file_path))
            .map(Box::as_ref)
    }

    pub fn handles(&self, file_path: &str) -> bool {
        self.for_path(file_path).is_some()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_default_extractors()
    }
}

/// File extension, lowercased.
pub(crate) fn extension(file_path: &str) -> Option<String> {
    std::path::Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Enforce the within-file `(kind, name)` uniqueness invariant: when two
/// definitions collide, the later one wins and the earlier is dropped.
/// Source order of the survivors is preserved.
pub fn dedup_entities(entities: Vec<Entity>) -> Vec<Entity> {
    let mut last_index: HashMap<(EntityKind, String), usize> = HashMap::new();
    for (i, entity) in entities.iter().enumerate() {
        last_index.insert((entity.kind, entity.name.clone()), i);
    }
    entities
        .into_iter()
        .enumerate()
        .filter(|(i, e)| last_index[&(e.kind, e.name.clone())] == *i)
        .map(|(_, e)| e)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dispatch() {
        let registry = Registry::with_default_extractors();
        assert_eq!(registry.for_path("src/app.py").unwrap().language(), "python");
        assert_eq!(registry.for_path("src/app.ts").unwrap().language(), "typescript");
        assert_eq!(registry.for_path("src/app.rs").unwrap().language(), "rust");
        assert_eq!(registry.for_path("src/app.cpp").unwrap().language(), "cpp");
        assert!(registry.for_path("notes.txt").is_none());
        assert!(!registry.handles("README.md"));
    }

    #[test]
    fn test_dedup_later_definition_wins() {
        let a = Entity::new(EntityKind::Function, "foo", "a.py", 1, 2, "def foo():\n    pass");
        let b = Entity::new(EntityKind::Function, "foo", "a.py", 10, 11, "def foo():\n    return 1");
        let c = Entity::new(EntityKind::Class, "foo", "a.py", 5, 6, "class foo: pass");
        let out = dedup_entities(vec![a, c.clone(), b.clone()]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], c);
        assert_eq!(out[1], b);
    }
}
