//! Pattern-matching extractor for Rust sources.
//!
//! Coverage: functions, structs/enums/traits (as class entities), impl
//! methods scoped `Type.method`, trait impls as inheritance, `use` imports,
//! consts/statics, attribute macros as decorators. Macro invocations are
//! not call targets.

use crate::patterns::{
    block_end, collect_calls, join_lines, split_params, strip_comments,
    strip_comments_and_strings, type_identifiers,
};
use crate::{Extraction, Extractor, dedup_entities, extension};
use carto_core::entity::{Entity, EntityKind};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Common std method and constructor names that would otherwise dominate
/// the call lists of every function.
pub(crate) const RUST_BUILTINS: &[&str] = &[
    "Some", "None", "Ok", "Err", "Box", "Vec", "String", "Rc", "Arc", "RefCell", "Cell",
    "Mutex", "RwLock", "Default", "drop", "unwrap", "expect", "clone", "into", "from",
    "to_string", "to_owned", "as_ref", "as_mut", "as_str", "as_bytes", "iter", "iter_mut",
    "into_iter", "collect", "map", "and_then", "unwrap_or", "unwrap_or_else",
    "unwrap_or_default", "ok_or", "ok_or_else", "filter", "find", "any", "all", "fold",
    "push", "pop", "insert", "remove", "get", "get_mut", "entry", "or_default", "len",
    "is_empty", "is_some", "is_none", "is_ok", "is_err", "contains", "contains_key",
    "join", "split", "trim", "starts_with", "ends_with", "parse", "chars", "lines",
    "extend", "retain", "sort", "sort_by", "sort_by_key", "rev", "enumerate", "zip",
    "take", "skip", "min", "max", "sum", "count", "next", "peek", "new", "with_capacity",
    "to_vec", "first", "last", "clear",
];

const RUST_KEYWORDS: &[&str] = &[
    "if", "for", "while", "match", "return", "loop", "fn", "impl", "where", "move",
    "unsafe", "async", "await", "dyn", "ref", "let", "mut", "else", "in", "pub", "use",
];

const RUST_BUILTIN_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64", "bool", "char", "str", "String", "Vec", "Option", "Result",
    "Box", "Rc", "Arc", "Self", "self", "HashMap", "HashSet", "BTreeMap", "BTreeSet",
    "Cow", "PathBuf", "Path", "dyn", "impl", "mut", "const", "static",
];

/// Attributes that are language/tooling plumbing rather than semantic
/// decoration.
const RUST_STD_ATTRS: &[&str] = &[
    "derive", "cfg", "cfg_attr", "allow", "warn", "deny", "forbid", "doc", "inline",
    "must_use", "non_exhaustive", "repr", "test", "ignore", "should_panic", "macro_use",
    "macro_export", "track_caller", "no_mangle", "cold", "bench",
];

static USE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(.+);").expect("static regex")
});
static FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(\w+)"#,
    )
    .expect("static regex")
});
static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(struct|enum|trait|union)\s+(\w+)(?:<[^>]*>)?(?:\s*:\s*([\w\s+:<>,]+?))?\s*(\{|;|\()")
        .expect("static regex")
});
static TYPE_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?type\s+(\w+)").expect("static regex")
});
static IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*impl(?:<[^>]*>)?\s+(?:([\w:]+)(?:<[^>]*>)?\s+for\s+)?([\w:]+)")
        .expect("static regex")
});
static CONST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(?:const|static)\s+(?:mut\s+)?(\w+)\s*:\s*([^=;]+)")
        .expect("static regex")
});
static ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#!?\[(\w+)").expect("static regex"));
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?\w+\s*:\s*([^,{]+),?\s*$").expect("static regex")
});

pub struct RustExtractor;

impl Extractor for RustExtractor {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn can_handle(&self, file_path: &str) -> bool {
        matches!(extension(file_path).as_deref(), Some("rs"))
    }

    fn extract(&self, source: &str, file_path: &str) -> Extraction {
        Extraction::clean(extract_rust(source, file_path))
    }
}

fn extract_rust(source: &str, file_path: &str) -> Vec<Entity> {
    let clean = strip_comments(source);
    let lines: Vec<&str> = clean.lines().collect();
    let mut entities: Vec<Entity> = Vec::new();
    let mut pending_attrs: Vec<String> = Vec::new();
    // type bare name -> traits implemented for it in this file
    let mut trait_impls: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(cap) = ATTR_RE.captures(line) {
            let name = cap[1].to_string();
            if !RUST_STD_ATTRS.contains(&name.as_str()) {
                pending_attrs.push(name);
            }
            i += 1;
            continue;
        }

        if let Some(cap) = USE_RE.captures(line) {
            push_use_bindings(&cap[1], file_path, i + 1, line, &mut entities);
            pending_attrs.clear();
            i += 1;
            continue;
        }

        if let Some(cap) = IMPL_RE.captures(line) {
            let end = block_end(&lines, i);
            let type_name = bare_type(&cap[2]);
            if let Some(trait_name) = cap.get(1) {
                trait_impls
                    .entry(type_name.clone())
                    .or_default()
                    .push(bare_type(trait_name.as_str()));
            }
            extract_impl_methods(&lines, i, end, &type_name, file_path, &mut entities);
            pending_attrs.clear();
            i = end + 1;
            continue;
        }

        if let Some(cap) = TYPE_DECL_RE.captures(line) {
            let end = block_end(&lines, i);
            let text = join_lines(&lines, i, end);
            let mut entity =
                Entity::new(EntityKind::Class, &cap[3], file_path, i + 1, end + 1, &text);
            entity.exported = cap.get(1).is_some();
            entity.decorators = std::mem::take(&mut pending_attrs);
            // trait supertraits: `trait Foo: Bar + Baz`
            if &cap[2] == "trait"
                && let Some(bounds) = cap.get(4)
            {
                entity.inherits = bounds
                    .as_str()
                    .split('+')
                    .map(|s| bare_type(s.trim()))
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            // struct field types are type references
            for body_line in &lines[i..=end.min(lines.len() - 1)] {
                if let Some(field) = FIELD_RE.captures(body_line) {
                    entity.type_refs.extend(type_identifiers(&field[1], RUST_BUILTIN_TYPES));
                }
            }
            entity.type_refs.dedup();
            entities.push(entity);
            if &cap[2] == "trait" {
                extract_impl_methods(&lines, i, end, &cap[3].to_string(), file_path, &mut entities);
            }
            i = end + 1;
            continue;
        }

        if let Some(cap) = TYPE_ALIAS_RE.captures(line) {
            let mut entity =
                Entity::new(EntityKind::Class, &cap[2], file_path, i + 1, i + 1, line);
            entity.exported = cap.get(1).is_some();
            entities.push(entity);
            pending_attrs.clear();
            i += 1;
            continue;
        }

        if let Some(cap) = FN_RE.captures(line) {
            let end = block_end(&lines, i);
            let mut entity = function_entity(&lines, i, end, &cap[2], None, file_path);
            entity.exported = cap.get(1).is_some();
            entity.decorators = std::mem::take(&mut pending_attrs);
            entities.push(entity);
            i = end + 1;
            continue;
        }

        if let Some(cap) = CONST_RE.captures(line) {
            let mut entity =
                Entity::new(EntityKind::Variable, &cap[2], file_path, i + 1, i + 1, line);
            entity.exported = cap.get(1).is_some();
            entity.type_refs = type_identifiers(&cap[3], RUST_BUILTIN_TYPES);
            entities.push(entity);
            pending_attrs.clear();
            i += 1;
            continue;
        }

        pending_attrs.clear();
        i += 1;
    }

    for entity in &mut entities {
        if entity.kind == EntityKind::Class
            && let Some(traits) = trait_impls.get(&entity.name)
        {
            entity.inherits.extend(traits.iter().cloned());
            entity.inherits.dedup();
        }
    }
    dedup_entities(entities)
}

fn bare_type(path: &str) -> String {
    let stripped = path.split('<').next().unwrap_or(path);
    stripped.rsplit("::").next().unwrap_or(stripped).trim().to_string()
}

/// Methods declared at brace depth 1 inside an impl or trait block.
fn extract_impl_methods(
    lines: &[&str],
    start: usize,
    end: usize,
    type_name: &str,
    file_path: &str,
    entities: &mut Vec<Entity>,
) {
    let mut depth: i32 = 0;
    let mut pending_attrs: Vec<String> = Vec::new();
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
            if let Some(cap) = ATTR_RE.captures(line) {
                let name = cap[1].to_string();
                if !RUST_STD_ATTRS.contains(&name.as_str()) {
                    pending_attrs.push(name);
                }
                i += 1;
                continue;
            }
            if let Some(cap) = FN_RE.captures(line) {
                let method_end = block_end(lines, i).min(end);
                let mut entity =
                    function_entity(lines, i, method_end, &cap[2], Some(type_name), file_path);
                entity.decorators = std::mem::take(&mut pending_attrs);
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

fn function_entity(
    lines: &[&str],
    start: usize,
    end: usize,
    name: &str,
    scope: Option<&str>,
    file_path: &str,
) -> Entity {
    let scoped = match scope {
        Some(type_name) => format!("{type_name}.{name}"),
        None => name.to_string(),
    };
    let text = join_lines(lines, start, end);
    let mut entity =
        Entity::new(EntityKind::Function, scoped, file_path, start + 1, end + 1, &text);

    if let Some((params_text, rest)) = signature_parts(&text) {
        for param in split_params(&params_text) {
            if let Some((pname, ptype)) = param.split_once(':') {
                let pname = pname.trim().trim_start_matches("mut ").trim();
                if !pname.is_empty() && pname.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    entity.params.push(pname.to_string());
                }
                entity.type_refs.extend(type_identifiers(ptype, RUST_BUILTIN_TYPES));
            }
        }
        if let Some(arrow) = rest.find("->") {
            let ret = rest[arrow + 2..].split('{').next().unwrap_or("");
            let ret = ret.split("where").next().unwrap_or(ret);
            entity.type_refs.extend(type_identifiers(ret, RUST_BUILTIN_TYPES));
        }
    }
    entity.type_refs.dedup();
    entity.calls =
        collect_calls(&strip_comments_and_strings(&text), RUST_BUILTINS, RUST_KEYWORDS, name);
    entity
}

/// Split a function's text into its parameter list and what follows the
/// closing paren (up to the body).
fn signature_parts(text: &str) -> Option<(String, String)> {
    let open = text.find('(')?;
    let mut depth = 0i32;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + offset;
                    let rest: String =
                        text[close + 1..].chars().take_while(|&c| c != '{').collect();
                    return Some((text[open + 1..close].to_string(), rest));
                }
            }
            _ => {}
        }
    }
    None
}

/// Expand a `use` declaration into one Import entity per bound name.
fn push_use_bindings(
    clause: &str,
    file_path: &str,
    line: usize,
    text: &str,
    entities: &mut Vec<Entity>,
) {
    let clause = clause.trim();
    let mut push = |local: &str, module: &str, symbol: &str| {
        if local.is_empty() || local == "*" || local == "self" {
            return;
        }
        let mut entity = Entity::new(EntityKind::Import, local, file_path, line, line, text);
        entity.imports.push((module.to_string(), symbol.to_string()));
        entities.push(entity);
    };

    if let Some(brace_start) = clause.find('{') {
        let module = clause[..brace_start].trim_end_matches("::").trim();
        let inner = clause[brace_start + 1..].trim_end_matches('}');
        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once(" as ") {
                Some((symbol, alias)) => push(alias.trim(), module, symbol.trim()),
                None => {
                    let symbol = part.rsplit("::").next().unwrap_or(part);
                    push(symbol, module, symbol);
                }
            }
        }
        return;
    }

    match clause.split_once(" as ") {
        Some((path, alias)) => {
            let path = path.trim();
            let (module, symbol) = split_use_path(path);
            push(alias.trim(), &module, &symbol);
        }
        None => {
            let (module, symbol) = split_use_path(clause);
            let local = symbol.clone();
            push(&local, &module, &symbol);
        }
    }
}

fn split_use_path(path: &str) -> (String, String) {
    match path.rsplit_once("::") {
        Some((module, symbol)) => (module.to_string(), symbol.to_string()),
        None => (String::new(), path.to_string()),
    }
}
