//! Entity model and content hashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex digits kept from the full SHA-256 digest for entity hashes.
const HASH_PREFIX_LEN: usize = 12;

/// Sentinel substituted for an entity's own name when computing the
/// structure hash, so a rename-only edit leaves the hash unchanged.
const NAME_SENTINEL: &str = "___";

/// What kind of source construct an entity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Class,
    Variable,
    Import,
    ModuleCode,
}

impl EntityKind {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Variable => "variable",
            Self::Import => "import",
            Self::ModuleCode => "module_code",
        }
    }
}

/// How certain we are about an extracted fact or a resolved edge target.
///
/// Ordering is `Low < Medium < High` so promotions can be expressed as
/// `max()` and never regress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    #[default]
    High,
}

impl Confidence {
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A unit of code structure produced by an extractor.
///
/// Entities are transient inputs to the incremental bridge; the graph store
/// keeps its own persistent view of them as nodes. Within one file the pair
/// `(kind, name)` is unique — extractors drop earlier duplicates in favor of
/// later ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Scoped name: methods are rendered `Outer.inner`, free names are bare.
    pub name: String,
    /// Project-relative path with forward slashes.
    pub file_path: String,
    /// 1-indexed, inclusive.
    pub line_start: usize,
    /// 1-indexed, inclusive; always >= `line_start`.
    pub line_end: usize,
    /// Hash of the entity's canonical source text. Changes on any edit.
    pub signature_hash: String,
    /// Hash of the canonical text with the entity's own name blanked out.
    /// Survives rename-only edits.
    pub structure_hash: String,
    /// Referenced call targets, as spelled in source, builtins filtered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<String>,
    /// Base type names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,
    /// Names used in type positions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_refs: Vec<String>,
    /// Decorator names, language-standard ones filtered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    /// `(module, symbol)` pairs; `module` may be empty or `.` for local
    /// includes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<(String, String)>,
    /// Ordered parameter names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    /// True when the source carries an explicit export marker for this
    /// entity (`__all__` membership, `export`, `pub`, `public`).
    #[serde(default)]
    pub exported: bool,
    /// High for cleanly parsed entities, Medium when recovered from a
    /// transiently unparseable file.
    #[serde(default)]
    pub confidence: Confidence,
}

impl Entity {
    /// Build an entity with hashes computed from its source text and all
    /// reference lists empty. Extractors fill the lists afterwards.
    pub fn new(
        kind: EntityKind,
        name: impl Into<String>,
        file_path: impl Into<String>,
        line_start: usize,
        line_end: usize,
        source_text: &str,
    ) -> Self {
        let name = name.into();
        Entity {
            signature_hash: signature_hash(source_text),
            structure_hash: structure_hash(source_text, &name),
            kind,
            name,
            file_path: file_path.into(),
            line_start,
            line_end,
            calls: Vec::new(),
            inherits: Vec::new(),
            type_refs: Vec::new(),
            decorators: Vec::new(),
            imports: Vec::new(),
            params: Vec::new(),
            exported: false,
            confidence: Confidence::High,
        }
    }

    /// The unscoped name: `Outer.inner` -> `inner`.
    pub fn bare_name(&self) -> &str {
        bare_name(&self.name)
    }
}

/// Strip any scope prefix from a scoped name.
pub fn bare_name(scoped: &str) -> &str {
    scoped.rsplit('.').next().unwrap_or(scoped)
}

/// Compute SHA-256 of text and keep a short hex prefix.
fn short_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..HASH_PREFIX_LEN].to_string()
}

/// Canonical form used for hashing: trailing whitespace trimmed per line,
/// blank lines dropped, internal whitespace preserved. Extractors that can
/// normalize further (the full-AST path hashes a comment-free token stream)
/// do so before handing text in.
fn canonicalize(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hash of an entity's canonical source text. Detects any change.
pub fn signature_hash(source_text: &str) -> String {
    short_hash(&canonicalize(source_text))
}

/// Hash of the canonical text with every whole-word occurrence of the
/// entity's own defined name replaced by a sentinel. Rename-only edits
/// preserve it.
pub fn structure_hash(source_text: &str, own_name: &str) -> String {
    let canonical = canonicalize(source_text);
    // Methods hash against their bare name; the scope prefix is not
    // spelled inside the definition text.
    let needle = bare_name(own_name);
    short_hash(&replace_identifier(&canonical, needle, NAME_SENTINEL))
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Replace whole-identifier occurrences of `name` in `text`.
fn replace_identifier(text: &str, name: &str, replacement: &str) -> String {
    if name.is_empty() {
        return text.to_string();
    }
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while let Some(offset) = text[i..].find(name) {
        let start = i + offset;
        let end = start + name.len();
        let bounded_left = start == 0 || !is_ident_char(bytes[start - 1]);
        let bounded_right = end == bytes.len() || !is_ident_char(bytes[end]);
        if bounded_left && bounded_right {
            out.push_str(&text[i..start]);
            out.push_str(replacement);
        } else {
            out.push_str(&text[i..end]);
        }
        i = end;
    }
    out.push_str(&text[i..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_hash_length_and_stability() {
        let h = signature_hash("def foo():\n    return 1\n");
        assert_eq!(h.len(), 12);
        assert_eq!(h, signature_hash("def foo():\n    return 1\n"));
    }

    #[test]
    fn test_trailing_whitespace_is_canonicalized_away() {
        let a = signature_hash("def foo():\n    return 1");
        let b = signature_hash("def foo():   \n    return 1\t");
        assert_eq!(a, b);
    }

    #[test]
    fn test_internal_whitespace_matters() {
        let a = signature_hash("def foo():\n    return 1");
        let b = signature_hash("def foo():\n        return 1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_structure_hash_survives_rename() {
        let old = structure_hash("def foo():\n    return bar()", "foo");
        let new = structure_hash("def baz():\n    return bar()", "baz");
        assert_eq!(old, new);
    }

    #[test]
    fn test_structure_hash_changes_on_body_edit() {
        let old = structure_hash("def foo():\n    return bar()", "foo");
        let new = structure_hash("def baz():\n    return qux()", "baz");
        assert_ne!(old, new);
    }

    #[test]
    fn test_structure_hash_recursive_function() {
        // Self-references are blanked out too, so recursion renames cleanly.
        let old = structure_hash("def fib(n):\n    return fib(n - 1)", "fib");
        let new = structure_hash("def fibo(n):\n    return fibo(n - 1)", "fibo");
        assert_eq!(old, new);
    }

    #[test]
    fn test_replace_identifier_respects_word_boundaries() {
        assert_eq!(replace_identifier("foo foobar foo_", "foo", "___"), "___ foobar foo_");
        assert_eq!(replace_identifier("a.foo(foo)", "foo", "___"), "a.___(___)");
    }

    #[test]
    fn test_structure_hash_uses_bare_name_for_methods() {
        let old = structure_hash("def get(self):\n    return self.x", "Box.get");
        let new = structure_hash("def take(self):\n    return self.x", "Box.take");
        assert_eq!(old, new);
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(bare_name("Outer.inner"), "inner");
        assert_eq!(bare_name("free"), "free");
    }

    #[test]
    fn test_entity_new_fills_hashes() {
        let e = Entity::new(EntityKind::Function, "foo", "src/a.py", 1, 2, "def foo():\n    pass");
        assert_eq!(e.signature_hash.len(), 12);
        assert_eq!(e.structure_hash.len(), 12);
        assert!(e.calls.is_empty());
        assert_eq!(e.confidence, Confidence::High);
    }
}
