//! Pattern-matching extractor for TypeScript (and the JS-like core shared
//! with the JavaScript extractor).

use crate::patterns::{
    block_end, collect_calls, join_lines, split_params, strip_comments,
    strip_comments_and_strings, type_identifiers,
};
use crate::{Extraction, Extractor, dedup_entities, extension};
use carto_core::entity::{Entity, EntityKind};
use regex::Regex;
use std::sync::LazyLock;

/// Host globals and runtime builtins that never link to project entities.
pub(crate) const JS_BUILTINS: &[&str] = &[
    "console", "require", "parseInt", "parseFloat", "isNaN", "isFinite", "setTimeout",
    "setInterval", "clearTimeout", "clearInterval", "queueMicrotask", "fetch", "alert",
    "structuredClone", "encodeURIComponent", "decodeURIComponent", "Promise", "Array",
    "Object", "String", "Number", "Boolean", "Symbol", "BigInt", "JSON", "Math", "Date",
    "RegExp", "Error", "TypeError", "RangeError", "Map", "Set", "WeakMap", "WeakSet",
    "Proxy", "Reflect",
];

const JS_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "typeof", "function", "super",
    "await", "yield", "new", "throw", "do", "else", "in", "of", "void", "delete",
];

const TS_BUILTIN_TYPES: &[&str] = &[
    "string", "number", "boolean", "any", "unknown", "never", "void", "object", "null",
    "undefined", "this", "Array", "Promise", "Record", "Partial", "Required", "Readonly",
    "Pick", "Omit", "Map", "Set", "Date", "Error", "Function", "ReturnType",
];

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(.+?)\s+from\s+['"]([^'"]+)['"]"#).expect("static regex")
});
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:const|let|var)\s+(\w+)\s*=\s*require\(\s*['"]([^'"]+)['"]"#)
        .expect("static regex")
});
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)(?:\s+extends\s+([\w.]+))?(?:\s+implements\s+([\w.,\s]+))?",
    )
    .expect("static regex")
});
static IFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?interface\s+(\w+)(?:\s+extends\s+([\w.,\s]+))?")
        .expect("static regex")
});
static TYPE_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(export\s+)?type\s+(\w+)\s*=").expect("static regex"));
static FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*\(([^)]*)\)(?:\s*:\s*([^({]+))?",
    )
    .expect("static regex")
});
static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:const|let|var)\s+(\w+)[^=]*=\s*(?:async\s+)?(?:\(([^)]*)\)|\w+)\s*(?::\s*[^=>]+)?\s*=>",
    )
    .expect("static regex")
});
static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?(?:const|let|var)\s+(\w+)").expect("static regex")
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s+(?:public\s+|private\s+|protected\s+|static\s+|readonly\s+|override\s+|async\s+)*(?:get\s+|set\s+)?(\w+)\s*(?:<[^>]*>)?\(([^)]*)\)(?:\s*:\s*([^({]+))?\s*\{",
    )
    .expect("static regex")
});
static DECORATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(\w+)").expect("static regex"));
static EXPORT_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*export\s*\{([^}]*)\}").expect("static regex"));
static EXPORT_DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*export\s+default\s+(\w+)\s*;?\s*$").expect("static regex"));

pub struct TypeScriptExtractor;

impl Extractor for TypeScriptExtractor {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn can_handle(&self, file_path: &str) -> bool {
        matches!(extension(file_path).as_deref(), Some("ts" | "tsx"))
    }

    fn extract(&self, source: &str, file_path: &str) -> Extraction {
        Extraction::clean(extract_js_like(source, file_path, true))
    }
}

/// Shared JS/TS extraction core. `typescript` enables interfaces, type
/// aliases, annotations, and decorators.
pub(crate) fn extract_js_like(source: &str, file_path: &str, typescript: bool) -> Vec<Entity> {
    let clean = strip_comments(source);
    let lines: Vec<&str> = clean.lines().collect();
    let mut entities: Vec<Entity> = Vec::new();
    let mut pending_decorators: Vec<String> = Vec::new();
    let mut export_marked: Vec<String> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if typescript && let Some(cap) = DECORATOR_RE.captures(line) {
            pending_decorators.push(cap[1].to_string());
            i += 1;
            continue;
        }

        if let Some(cap) = IMPORT_RE.captures(line) {
            push_import_bindings(&cap[1], &cap[2], file_path, i + 1, line, &mut entities);
            i += 1;
            pending_decorators.clear();
            continue;
        }

        if let Some(cap) = REQUIRE_RE.captures(line) {
            let mut entity =
                Entity::new(EntityKind::Import, &cap[1], file_path, i + 1, i + 1, line);
            entity.imports.push((cap[2].to_string(), String::new()));
            entities.push(entity);
            i += 1;
            continue;
        }

        if let Some(cap) = EXPORT_LIST_RE.captures(line) {
            for name in cap[1].split(',') {
                let name = name.trim().split_whitespace().next().unwrap_or("");
                if !name.is_empty() {
                    export_marked.push(name.to_string());
                }
            }
            i += 1;
            continue;
        }
        if let Some(cap) = EXPORT_DEFAULT_RE.captures(line) {
            export_marked.push(cap[1].to_string());
            i += 1;
            continue;
        }

        let class_cap = CLASS_RE.captures(line);
        let iface_cap = if typescript { IFACE_RE.captures(line) } else { None };
        if let Some(cap) = class_cap.as_ref().or(iface_cap.as_ref()) {
            let end = block_end(&lines, i);
            let name = cap[2].to_string();
            let text = join_lines(&lines, i, end);
            let mut entity =
                Entity::new(EntityKind::Class, &name, file_path, i + 1, end + 1, &text);
            entity.exported = cap.get(1).is_some();
            if let Some(bases) = cap.get(3) {
                entity.inherits.extend(split_names(bases.as_str()));
            }
            if let Some(implemented) = cap.get(4) {
                entity.inherits.extend(split_names(implemented.as_str()));
            }
            entity.decorators = std::mem::take(&mut pending_decorators);
            let is_class = class_cap.is_some();
            entities.push(entity);
            if is_class {
                extract_class_methods(&lines, i, end, &name, file_path, typescript, &mut entities);
            }
            i = end + 1;
            continue;
        }

        if typescript && let Some(cap) = TYPE_ALIAS_RE.captures(line) {
            let end = block_end(&lines, i);
            let text = join_lines(&lines, i, end);
            let mut entity =
                Entity::new(EntityKind::Class, &cap[2], file_path, i + 1, end + 1, &text);
            entity.exported = cap.get(1).is_some();
            entities.push(entity);
            i = end + 1;
            continue;
        }

        if let Some(cap) = FUNC_RE.captures(line) {
            let end = block_end(&lines, i);
            entities.push(function_entity(
                &lines, i, end, &cap[2],
                cap.get(3).map_or("", |m| m.as_str()),
                cap.get(4).map(|m| m.as_str()),
                cap.get(1).is_some(),
                file_path,
                typescript,
                std::mem::take(&mut pending_decorators),
                None,
            ));
            i = end + 1;
            continue;
        }

        if let Some(cap) = ARROW_RE.captures(line) {
            let end = block_end(&lines, i);
            entities.push(function_entity(
                &lines, i, end, &cap[2],
                cap.get(3).map_or("", |m| m.as_str()),
                None,
                cap.get(1).is_some(),
                file_path,
                typescript,
                std::mem::take(&mut pending_decorators),
                None,
            ));
            i = end + 1;
            continue;
        }

        if let Some(cap) = VAR_RE.captures(line) {
            let end = block_end(&lines, i);
            let text = join_lines(&lines, i, end);
            let mut entity =
                Entity::new(EntityKind::Variable, &cap[2], file_path, i + 1, end + 1, &text);
            entity.exported = cap.get(1).is_some();
            entity.calls =
                collect_calls(&strip_comments_and_strings(&text), JS_BUILTINS, JS_KEYWORDS, &cap[2]);
            entities.push(entity);
            i = end + 1;
            continue;
        }

        pending_decorators.clear();
        i += 1;
    }

    for entity in &mut entities {
        if export_marked.iter().any(|n| n == entity.bare_name()) {
            entity.exported = true;
        }
    }
    dedup_entities(entities)
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().rsplit('.').next().unwrap_or("").to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an import clause: `Default`, `{ a, b as c }`, `* as ns`, or a
/// combination. One Import entity per bound local name.
fn push_import_bindings(
    clause: &str,
    module: &str,
    file_path: &str,
    line: usize,
    text: &str,
    entities: &mut Vec<Entity>,
) {
    let mut push = |local: &str, symbol: &str| {
        if local.is_empty() {
            return;
        }
        let mut entity = Entity::new(EntityKind::Import, local, file_path, line, line, text);
        entity.imports.push((module.to_string(), symbol.to_string()));
        entities.push(entity);
    };

    let mut rest = clause.trim();
    if let Some(ns) = rest.strip_prefix("* as ") {
        push(ns.trim(), "");
        return;
    }
    if let Some(brace_start) = rest.find('{') {
        let brace_end = rest.find('}').unwrap_or(rest.len());
        for part in rest[brace_start + 1..brace_end].split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.split_once(" as ") {
                Some((symbol, local)) => push(local.trim(), symbol.trim()),
                None => push(part, part),
            }
        }
        rest = rest[..brace_start].trim_end_matches(',').trim();
    }
    if !rest.is_empty() && !rest.contains('{') {
        // default import binds the module's default symbol
        push(rest.trim_matches(','), "default");
    }
}

#[allow(clippy::too_many_arguments)]
fn function_entity(
    lines: &[&str],
    start: usize,
    end: usize,
    name: &str,
    params_text: &str,
    return_type: Option<&str>,
    exported: bool,
    file_path: &str,
    typescript: bool,
    decorators: Vec<String>,
    scope: Option<&str>,
) -> Entity {
    let scoped = match scope {
        Some(class) => format!("{class}.{name}"),
        None => name.to_string(),
    };
    let text = join_lines(lines, start, end);
    let mut entity =
        Entity::new(EntityKind::Function, scoped, file_path, start + 1, end + 1, &text);
    entity.exported = exported;
    entity.decorators = decorators;
    for param in split_params(params_text) {
        let (pname, ptype) = match param.split_once(':') {
            Some((n, t)) => (n, Some(t)),
            None => (param.as_str(), None),
        };
        let pname = pname.trim().trim_start_matches("...").trim_end_matches('?');
        if !pname.is_empty() && pname.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            entity.params.push(pname.to_string());
        }
        if typescript && let Some(ptype) = ptype {
            entity.type_refs.extend(type_identifiers(ptype, TS_BUILTIN_TYPES));
        }
    }
    if typescript && let Some(ret) = return_type {
        entity.type_refs.extend(type_identifiers(ret, TS_BUILTIN_TYPES));
    }
    entity.type_refs.dedup();
    entity.calls =
        collect_calls(&strip_comments_and_strings(&text), JS_BUILTINS, JS_KEYWORDS, name);
    entity
}

/// Methods declared at brace depth 1 inside a class body.
fn extract_class_methods(
    lines: &[&str],
    class_start: usize,
    class_end: usize,
    class_name: &str,
    file_path: &str,
    typescript: bool,
    entities: &mut Vec<Entity>,
) {
    let mut depth: i32 = 0;
    let mut pending_decorators: Vec<String> = Vec::new();
    let mut i = class_start;
    while i <= class_end && i < lines.len() {
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
            if typescript && let Some(cap) = DECORATOR_RE.captures(line) {
                pending_decorators.push(cap[1].to_string());
                i += 1;
                continue;
            }
            if let Some(cap) = METHOD_RE.captures(line) {
                let name = cap[1].to_string();
                if !JS_KEYWORDS.contains(&name.as_str()) {
                    let end = block_end(lines, i).min(class_end);
                    entities.push(function_entity(
                        lines, i, end, &name,
                        cap.get(2).map_or("", |m| m.as_str()),
                        cap.get(3).map(|m| m.as_str()),
                        false,
                        file_path,
                        typescript,
                        std::mem::take(&mut pending_decorators),
                        Some(class_name),
                    ));
                    // stay in the outer scan; depth already accounts for
                    // the method's braces only when they sit on this line,
                    // so fast-forward past the body
                    let mut j = i + 1;
                    while j <= end {
                        for ch in lines[j].chars() {
                            match ch {
                                '{' => depth += 1,
                                '}' => depth -= 1,
                                _ => {}
                            }
                        }
                        j += 1;
                    }
                    i = end + 1;
                    continue;
                }
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> Vec<Entity> {
        extract_js_like(source, "app.ts", true)
    }

    #[test]
    fn test_function_and_arrow() {
        let src = "export function go(a: Config, b: number): Report {\n  helper(a);\n}\nconst fly = (x) => lift(x);\n";
        let entities = extract(src);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name, "go");
        assert!(entities[0].exported);
        assert_eq!(entities[0].params, vec!["a", "b"]);
        assert_eq!(entities[0].type_refs, vec!["Config", "Report"]);
        assert_eq!(entities[0].calls, vec!["helper"]);
        assert_eq!(entities[1].name, "fly");
        assert_eq!(entities[1].calls, vec!["lift"]);
    }

    #[test]
    fn test_class_with_methods_and_inheritance() {
        let src = "class Engine extends Base implements Runnable {\n  start(n: number): void {\n    this.spin(n);\n  }\n}\n";
        let entities = extract(src);
        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Engine", "Engine.start"]);
        assert_eq!(entities[0].inherits, vec!["Base", "Runnable"]);
        assert_eq!(entities[1].calls, vec!["spin"]);
    }

    #[test]
    fn test_import_bindings() {
        let src = "import Default, { one, two as alias } from './util';\nimport * as ns from 'pkg';\n";
        let entities = extract(src);
        let bound: Vec<(&str, &(String, String))> =
            entities.iter().map(|e| (e.name.as_str(), &e.imports[0])).collect();
        assert_eq!(bound.len(), 4);
        assert_eq!(bound[0].0, "one");
        assert_eq!(bound[0].1, &("./util".to_string(), "one".to_string()));
        assert_eq!(bound[1], ("alias", &("./util".to_string(), "two".to_string())));
        assert_eq!(bound[2], ("Default", &("./util".to_string(), "default".to_string())));
        assert_eq!(bound[3], ("ns", &("pkg".to_string(), String::new())));
    }

    #[test]
    fn test_export_list_marks_entities() {
        let src = "function a() {}\nfunction b() {}\nexport { a };\n";
        let entities = extract(src);
        assert!(entities.iter().find(|e| e.name == "a").unwrap().exported);
        assert!(!entities.iter().find(|e| e.name == "b").unwrap().exported);
    }

    #[test]
    fn test_interface_is_class_kind() {
        let entities = extract("export interface Shape {\n  area(): number;\n}\n");
        assert_eq!(entities[0].kind, EntityKind::Class);
        assert_eq!(entities[0].name, "Shape");
        assert!(entities[0].exported);
    }

    #[test]
    fn test_decorator_attaches() {
        let entities = extract("@injectable\nclass Service {\n}\n");
        assert_eq!(entities[0].decorators, vec!["injectable"]);
    }
}
