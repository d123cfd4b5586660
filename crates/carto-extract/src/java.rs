//! Pattern-matching extractor for Java.
//!
//! Coverage: classes/interfaces/enums/records with extends/implements,
//! methods and constructors scoped `Class.method`, imports (JDK packages
//! filtered), annotations as decorators, `public` as the export marker.

use crate::patterns::{
    block_end, collect_calls, join_lines, split_params, strip_comments,
    strip_comments_and_strings, type_identifiers,
};
use crate::{Extraction, Extractor, dedup_entities, extension};
use carto_core::entity::{Entity, EntityKind};
use regex::Regex;
use std::sync::LazyLock;

pub(crate) const JAVA_BUILTINS: &[&str] = &[
    "println", "print", "printf", "format", "valueOf", "toString", "equals", "hashCode",
    "length", "size", "add", "remove", "get", "put", "set", "contains", "containsKey",
    "isEmpty", "iterator", "stream", "forEach", "collect", "of", "asList", "emptyList",
    "currentTimeMillis", "nanoTime", "getLogger", "parseInt", "parseLong", "parseDouble",
    "append", "charAt", "substring", "indexOf", "split", "trim", "toLowerCase",
    "toUpperCase", "compareTo", "close", "read", "write", "flush", "append", "getClass",
    "requireNonNull", "copyOf", "join", "entrySet", "keySet", "values",
];

const JAVA_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "return", "catch", "throw", "new", "super", "this",
    "do", "else", "synchronized", "instanceof", "assert", "case", "try",
];

const JAVA_BUILTIN_TYPES: &[&str] = &[
    "int", "long", "short", "byte", "float", "double", "boolean", "char", "void", "var",
    "String", "Object", "Integer", "Long", "Short", "Byte", "Float", "Double", "Boolean",
    "Character", "List", "Map", "Set", "Collection", "ArrayList", "HashMap", "HashSet",
    "LinkedList", "Optional", "Stream", "Iterable", "Iterator", "Exception",
    "RuntimeException", "Throwable", "CharSequence", "StringBuilder", "Number",
    "final", "static", "public", "private", "protected", "abstract",
];

/// Standard annotations that carry no cross-entity information.
const JAVA_STD_ANNOTATIONS: &[&str] = &[
    "Override", "Deprecated", "SuppressWarnings", "FunctionalInterface", "SafeVarargs",
];

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+)\s*;").expect("static regex")
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:public\s+|protected\s+|private\s+|abstract\s+|final\s+|static\s+|sealed\s+)*)(class|interface|enum|record)\s+(\w+)(?:<[^>]*>)?(?:\s*\([^)]*\))?(?:\s+extends\s+([\w.<>,\s]+?))?(?:\s+implements\s+([\w.<>,\s]+?))?\s*\{",
    )
    .expect("static regex")
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s+((?:public\s+|protected\s+|private\s+|static\s+|final\s+|abstract\s+|synchronized\s+|native\s+|default\s+)*)(?:<[^>]*>\s*)?([\w.<>\[\],\s]+?)\s+(\w+)\s*\(([^)]*)\)[^;]*\{",
    )
    .expect("static regex")
});
static CTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+(?:public\s+|protected\s+|private\s+)?(\w+)\s*\(([^)]*)\)[^;]*\{")
        .expect("static regex")
});
static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(\w+)").expect("static regex"));

pub struct JavaExtractor;

impl Extractor for JavaExtractor {
    fn language(&self) -> &'static str {
        "java"
    }

    fn can_handle(&self, file_path: &str) -> bool {
        matches!(extension(file_path).as_deref(), Some("java"))
    }

    fn extract(&self, source: &str, file_path: &str) -> Extraction {
        Extraction::clean(extract_java(source, file_path))
    }
}

fn extract_java(source: &str, file_path: &str) -> Vec<Entity> {
    let clean = strip_comments(source);
    let lines: Vec<&str> = clean.lines().collect();
    let mut entities: Vec<Entity> = Vec::new();
    let mut pending_annotations: Vec<String> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(cap) = ANNOTATION_RE.captures(line) {
            let name = cap[1].to_string();
            if !JAVA_STD_ANNOTATIONS.contains(&name.as_str()) {
                pending_annotations.push(name);
            }
            i += 1;
            continue;
        }

        if let Some(cap) = IMPORT_RE.captures(line) {
            let path = &cap[1];
            // JDK imports are stdlib noise for cross-entity linking
            if !path.starts_with("java.") && !path.starts_with("javax.") {
                let (module, symbol) = match path.rsplit_once('.') {
                    Some((m, s)) => (m.to_string(), s.to_string()),
                    None => (String::new(), path.to_string()),
                };
                if symbol != "*" {
                    let mut entity =
                        Entity::new(EntityKind::Import, &symbol, file_path, i + 1, i + 1, line);
                    entity.imports.push((module, symbol.clone()));
                    entities.push(entity);
                }
            }
            pending_annotations.clear();
            i += 1;
            continue;
        }

        if let Some(cap) = CLASS_RE.captures(line) {
            let end = block_end(&lines, i);
            let text = join_lines(&lines, i, end);
            let name = cap[3].to_string();
            let mut entity =
                Entity::new(EntityKind::Class, &name, file_path, i + 1, end + 1, &text);
            entity.exported = cap[1].contains("public");
            entity.decorators = std::mem::take(&mut pending_annotations);
            for group in [cap.get(4), cap.get(5)].into_iter().flatten() {
                entity.inherits.extend(
                    group
                        .as_str()
                        .split(',')
                        .map(|s| {
                            let s = s.trim();
                            let s = s.split('<').next().unwrap_or(s);
                            s.rsplit('.').next().unwrap_or(s).to_string()
                        })
                        .filter(|s| !s.is_empty()),
                );
            }
            entities.push(entity);
            extract_java_methods(&lines, i, end, &name, file_path, &mut entities);
            i = end + 1;
            continue;
        }

        pending_annotations.clear();
        i += 1;
    }

    dedup_entities(entities)
}

fn extract_java_methods(
    lines: &[&str],
    start: usize,
    end: usize,
    class_name: &str,
    file_path: &str,
    entities: &mut Vec<Entity>,
) {
    let mut depth: i32 = 0;
    let mut pending_annotations: Vec<String> = Vec::new();
    let mut i = start;
    while i <= end && i < lines.len() {
        let line = lines[i];
        let depth_before = depth;
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        if depth_before == 1 {
            if let Some(cap) = ANNOTATION_RE.captures(line) {
                let name = cap[1].to_string();
                if !JAVA_STD_ANNOTATIONS.contains(&name.as_str()) {
                    pending_annotations.push(name);
                }
                i += 1;
                continue;
            }
            let matched = METHOD_RE.captures(line).map(|cap| {
                (cap[3].to_string(), cap[4].to_string(), Some(cap[2].trim().to_string()))
            });
            let matched = matched.or_else(|| {
                CTOR_RE.captures(line).and_then(|cap| {
                    (&cap[1] == class_name)
                        .then(|| (cap[1].to_string(), cap[2].to_string(), None))
                })
            });
            if let Some((name, params_text, return_type)) = matched
                && !JAVA_KEYWORDS.contains(&name.as_str())
            {
                let method_end = block_end(lines, i).min(end);
                let text = join_lines(lines, i, method_end);
                let scoped = format!("{class_name}.{name}");
                let mut entity = Entity::new(
                    EntityKind::Function,
                    scoped,
                    file_path,
                    i + 1,
                    method_end + 1,
                    &text,
                );
                entity.decorators = std::mem::take(&mut pending_annotations);
                for param in split_params(&params_text) {
                    let idents = type_identifiers(&param, &[]);
                    if let Some((pname, ptypes)) = idents.split_last() {
                        entity.params.push(pname.clone());
                        entity.type_refs.extend(
                            ptypes
                                .iter()
                                .filter(|t| !JAVA_BUILTIN_TYPES.contains(&t.as_str()))
                                .cloned(),
                        );
                    }
                }
                if let Some(ret) = return_type {
                    entity.type_refs.extend(type_identifiers(&ret, JAVA_BUILTIN_TYPES));
                }
                entity.type_refs.dedup();
                entity.calls = collect_calls(
                    &strip_comments_and_strings(&text),
                    JAVA_BUILTINS,
                    JAVA_KEYWORDS,
                    &name,
                );
                entities.push(entity);
                let mut j = i + 1;
                while j <= method_end {
                    for ch in lines[j].chars() {
                        match ch {
                            '{' => depth += 1,
                            '}' => depth -= 1,
                            _ => {}
                        }
                    }
                    j += 1;
                }
                i = method_end + 1;
                continue;
            }
        }
        i += 1;
    }
}
