//! Reference extractor: full-AST Python extraction via tree-sitter.
//!
//! Covers functions, classes and methods (scoped `Class.method`),
//! decorators, imports, type annotations, module-level variables,
//! `__all__` exports, and free module-level code.

use crate::{Extraction, Extractor, ParseStatus, dedup_entities, extension, recovery};
use carto_core::entity::{Entity, EntityKind};
use std::collections::BTreeSet;

/// Call targets that never link to project entities.
pub(crate) const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytearray", "bytes", "callable", "chr", "classmethod",
    "complex", "delattr", "dict", "dir", "divmod", "enumerate", "eval", "exec", "filter",
    "float", "format", "frozenset", "getattr", "globals", "hasattr", "hash", "id", "input",
    "int", "isinstance", "issubclass", "iter", "len", "list", "locals", "map", "max",
    "memoryview", "min", "next", "object", "open", "ord", "pow", "print", "property",
    "range", "repr", "reversed", "round", "set", "setattr", "slice", "sorted",
    "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip", "Exception",
    "ValueError", "TypeError", "KeyError", "IndexError", "AttributeError", "RuntimeError",
    "StopIteration", "NotImplementedError",
];

/// Standard decorators that carry no cross-entity information.
const PYTHON_STD_DECORATORS: &[&str] = &[
    "staticmethod", "classmethod", "property", "abstractmethod", "cached_property",
    "override", "overload", "wraps", "lru_cache", "singledispatch", "singledispatchmethod",
    "contextmanager", "dataclass", "total_ordering", "final",
];

/// Builtin type names excluded from `type_refs`.
const PYTHON_BUILTIN_TYPES: &[&str] = &[
    "int", "str", "float", "bool", "bytes", "list", "dict", "set", "tuple", "None",
    "object", "Any", "Optional", "Union", "List", "Dict", "Set", "Tuple", "Callable",
    "Iterable", "Iterator", "Sequence", "Mapping", "Type", "Self", "ClassVar", "Literal",
    "Final",
];

pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        PythonExtractor
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn can_handle(&self, file_path: &str) -> bool {
        matches!(extension(file_path).as_deref(), Some("py" | "pyi"))
    }

    fn extract(&self, source: &str, file_path: &str) -> Extraction {
        let Some(tree) = parse(source) else {
            return Extraction {
                entities: Vec::new(),
                status: ParseStatus::Failed,
            };
        };
        if tree.root_node().has_error() {
            return recovery::recover(source, file_path);
        }
        Extraction::clean(extract_module(&tree.root_node(), source, file_path))
    }
}

/// Parse Python source. `None` only when tree-sitter itself gives up.
pub(crate) fn parse(source: &str) -> Option<tree_sitter::Tree> {
    let lang: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&lang).ok()?;
    parser.parse(source.as_bytes(), None)
}

/// Extract all entities from a parsed module, in source order.
pub(crate) fn extract_module(
    root: &tree_sitter::Node,
    source: &str,
    file_path: &str,
) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut free_code: Vec<tree_sitter::Node> = Vec::new();
    let mut exported: Option<BTreeSet<String>> = None;

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                entities.push(function_entity(&child, &child, source, file_path, None));
            }
            "class_definition" => {
                extract_class(&child, &child, source, file_path, Vec::new(), &mut entities);
            }
            "decorated_definition" => {
                let decorators = decorator_names(&child, source);
                if let Some(def) = child.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => {
                            let mut entity =
                                function_entity(&def, &child, source, file_path, None);
                            entity.decorators = decorators;
                            entities.push(entity);
                        }
                        "class_definition" => {
                            extract_class(&def, &child, source, file_path, decorators, &mut entities);
                        }
                        _ => {}
                    }
                }
            }
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                extract_import(&child, source, file_path, &mut entities);
            }
            "expression_statement" => {
                if let Some(assignment) = assignment_child(&child) {
                    if let Some(entity) =
                        variable_entity(&assignment, &child, source, file_path, &mut exported)
                    {
                        entities.push(entity);
                    }
                } else if !is_docstring(&child) {
                    free_code.push(child);
                }
            }
            "if_statement" | "for_statement" | "while_statement" | "try_statement"
            | "with_statement" | "match_statement" => {
                free_code.push(child);
            }
            _ => {}
        }
    }

    if let Some(entity) = module_code_entity(&free_code, source, file_path) {
        entities.push(entity);
    }

    if let Some(exported) = exported {
        for entity in &mut entities {
            if exported.contains(entity.bare_name()) {
                entity.exported = true;
            }
        }
    }

    dedup_entities(entities)
}

fn node_text<'a>(node: &tree_sitter::Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Comment-free token stream of a node, used as the canonical text for
/// hashing. Reindenting or commenting an entity leaves its hashes alone.
fn token_text(node: &tree_sitter::Node, source: &str) -> String {
    let mut out = String::new();
    collect_tokens(node, source, &mut out);
    out
}

fn collect_tokens(node: &tree_sitter::Node, source: &str, out: &mut String) {
    if node.kind() == "comment" {
        return;
    }
    if node.child_count() == 0 {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(node_text(node, source));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_tokens(&child, source, out);
    }
}

fn line_start(node: &tree_sitter::Node) -> usize {
    node.start_position().row + 1
}

fn line_end(node: &tree_sitter::Node) -> usize {
    node.end_position().row + 1
}

/// Build a function or method entity. `outer` is the decorated_definition
/// wrapper when present, so hashes and line ranges cover the decorators.
fn function_entity(
    def: &tree_sitter::Node,
    outer: &tree_sitter::Node,
    source: &str,
    file_path: &str,
    scope: Option<&str>,
) -> Entity {
    let name = def
        .child_by_field_name("name")
        .map(|n| node_text(&n, source))
        .unwrap_or("<anonymous>");
    let scoped = match scope {
        Some(class) => format!("{class}.{name}"),
        None => name.to_string(),
    };
    let mut entity = Entity::new(
        EntityKind::Function,
        scoped,
        file_path,
        line_start(outer),
        line_end(outer),
        &token_text(outer, source),
    );
    if let Some(params) = def.child_by_field_name("parameters") {
        entity.params = param_names(&params, source);
        entity.type_refs = param_type_refs(&params, source);
    }
    if let Some(ret) = def.child_by_field_name("return_type") {
        collect_type_identifiers(&ret, source, &mut entity.type_refs);
    }
    entity.type_refs = filter_type_refs(std::mem::take(&mut entity.type_refs));
    if let Some(body) = def.child_by_field_name("body") {
        entity.calls = collect_calls(&body, source, name);
    }
    entity
}

/// Build a class entity plus one entity per method, scoped `Class.method`.
fn extract_class(
    def: &tree_sitter::Node,
    outer: &tree_sitter::Node,
    source: &str,
    file_path: &str,
    decorators: Vec<String>,
    entities: &mut Vec<Entity>,
) {
    let Some(name_node) = def.child_by_field_name("name") else {
        return;
    };
    let class_name = node_text(&name_node, source);
    let mut entity = Entity::new(
        EntityKind::Class,
        class_name,
        file_path,
        line_start(outer),
        line_end(outer),
        &token_text(outer, source),
    );
    entity.decorators = decorators;
    if let Some(bases) = def.child_by_field_name("superclasses") {
        let mut cursor = bases.walk();
        for base in bases.children(&mut cursor) {
            let base_name = match base.kind() {
                "identifier" => Some(node_text(&base, source).to_string()),
                "attribute" => base
                    .child_by_field_name("attribute")
                    .map(|a| node_text(&a, source).to_string()),
                _ => None,
            };
            if let Some(base_name) = base_name
                && base_name != "object"
            {
                entity.inherits.push(base_name);
            }
        }
    }
    entities.push(entity);

    let Some(body) = def.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                entities.push(function_entity(&child, &child, source, file_path, Some(class_name)));
            }
            "decorated_definition" => {
                if let Some(def) = child.child_by_field_name("definition")
                    && def.kind() == "function_definition"
                {
                    let mut method =
                        function_entity(&def, &child, source, file_path, Some(class_name));
                    method.decorators = decorator_names(&child, source);
                    entities.push(method);
                }
            }
            _ => {}
        }
    }
}

fn decorator_names(decorated: &tree_sitter::Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = decorated.walk();
    for child in decorated.children(&mut cursor) {
        if child.kind() != "decorator" {
            continue;
        }
        let text = node_text(&child, source).trim_start_matches('@');
        // `@functools.lru_cache(maxsize=1)` -> `lru_cache`
        let name = text
            .split('(')
            .next()
            .unwrap_or(text)
            .rsplit('.')
            .next()
            .unwrap_or(text)
            .trim()
            .to_string();
        if !name.is_empty() && !PYTHON_STD_DECORATORS.contains(&name.as_str()) {
            names.push(name);
        }
    }
    names
}

/// Ordered parameter names, `self`/`cls` skipped, splat prefixes kept.
fn param_names(params: &tree_sitter::Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        let name = match child.kind() {
            "identifier" => Some(node_text(&child, source).to_string()),
            "typed_parameter" | "default_parameter" | "typed_default_parameter" => child
                .child_by_field_name("name")
                .or_else(|| child.child(0).filter(|n| n.kind() == "identifier"))
                .map(|n| node_text(&n, source).to_string()),
            "list_splat_pattern" => child
                .child(1)
                .filter(|n| n.kind() == "identifier")
                .map(|n| format!("*{}", node_text(&n, source))),
            "dictionary_splat_pattern" => child
                .child(1)
                .filter(|n| n.kind() == "identifier")
                .map(|n| format!("**{}", node_text(&n, source))),
            _ => None,
        };
        if let Some(name) = name
            && name != "self"
            && name != "cls"
        {
            names.push(name);
        }
    }
    names
}

fn param_type_refs(params: &tree_sitter::Node, source: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        if matches!(child.kind(), "typed_parameter" | "typed_default_parameter")
            && let Some(type_node) = child.child_by_field_name("type")
        {
            collect_type_identifiers(&type_node, source, &mut refs);
        }
    }
    refs
}

/// Gather identifiers inside a type expression (`Dict[str, Config]` yields
/// `Dict`, `str`, `Config` before filtering).
fn collect_type_identifiers(node: &tree_sitter::Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "identifier" {
        out.push(node_text(node, source).to_string());
        return;
    }
    if node.kind() == "attribute" {
        if let Some(attr) = node.child_by_field_name("attribute") {
            out.push(node_text(&attr, source).to_string());
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_type_identifiers(&child, source, out);
    }
}

fn filter_type_refs(refs: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    refs.into_iter()
        .filter(|r| !PYTHON_BUILTIN_TYPES.contains(&r.as_str()))
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

/// Referenced call names inside a body, builtins and self-recursion kept
/// out, first-occurrence order, deduplicated.
fn collect_calls(body: &tree_sitter::Node, source: &str, own_name: &str) -> Vec<String> {
    let mut calls = Vec::new();
    let mut seen = BTreeSet::new();
    collect_calls_rec(body, source, &mut calls, &mut seen);
    calls.retain(|c| c != own_name && !PYTHON_BUILTINS.contains(&c.as_str()));
    calls
}

fn collect_calls_rec(
    node: &tree_sitter::Node,
    source: &str,
    calls: &mut Vec<String>,
    seen: &mut BTreeSet<String>,
) {
    if node.kind() == "call"
        && let Some(func) = node.child_by_field_name("function")
    {
        let callee = match func.kind() {
            "identifier" => Some(node_text(&func, source).to_string()),
            // obj.method -> method
            "attribute" => func
                .child_by_field_name("attribute")
                .map(|a| node_text(&a, source).to_string()),
            _ => None,
        };
        if let Some(callee) = callee
            && seen.insert(callee.clone())
        {
            calls.push(callee);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls_rec(&child, source, calls, seen);
    }
}

fn assignment_child<'t>(stmt: &tree_sitter::Node<'t>) -> Option<tree_sitter::Node<'t>> {
    let child = stmt.child(0)?;
    matches!(child.kind(), "assignment" | "augmented_assignment").then_some(child)
}

fn is_docstring(stmt: &tree_sitter::Node) -> bool {
    stmt.child(0).is_some_and(|c| c.kind() == "string")
}

/// Module-level variable assignment. `__all__` additionally records the
/// explicit export list.
fn variable_entity(
    assignment: &tree_sitter::Node,
    stmt: &tree_sitter::Node,
    source: &str,
    file_path: &str,
    exported: &mut Option<BTreeSet<String>>,
) -> Option<Entity> {
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let name = node_text(&left, source);
    if name == "__all__" {
        let mut listed = BTreeSet::new();
        if let Some(right) = assignment.child_by_field_name("right") {
            collect_string_elements(&right, source, &mut listed);
        }
        exported.get_or_insert_with(BTreeSet::new).extend(listed);
    }
    let mut entity = Entity::new(
        EntityKind::Variable,
        name,
        file_path,
        line_start(stmt),
        line_end(stmt),
        &token_text(stmt, source),
    );
    if let Some(type_node) = assignment.child_by_field_name("type") {
        let mut refs = Vec::new();
        collect_type_identifiers(&type_node, source, &mut refs);
        entity.type_refs = filter_type_refs(refs);
    }
    if let Some(right) = assignment.child_by_field_name("right") {
        entity.calls = collect_calls(&right, source, name);
    }
    Some(entity)
}

fn collect_string_elements(node: &tree_sitter::Node, source: &str, out: &mut BTreeSet<String>) {
    if node.kind() == "string" {
        let text = node_text(node, source);
        out.insert(text.trim_matches(|c| c == '"' || c == '\'').to_string());
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_string_elements(&child, source, out);
    }
}

/// Import entities: one per bound local name.
fn extract_import(
    stmt: &tree_sitter::Node,
    source: &str,
    file_path: &str,
    entities: &mut Vec<Entity>,
) {
    let start = line_start(stmt);
    let end = line_end(stmt);
    let text = token_text(stmt, source);

    let mut push = |local: String, module: String, symbol: String| {
        let mut entity = Entity::new(EntityKind::Import, local, file_path, start, end, &text);
        entity.imports.push((module, symbol));
        entities.push(entity);
    };

    if stmt.kind() == "import_statement" {
        // `import a.b` binds `a`; `import a.b as c` binds `c`.
        let mut cursor = stmt.walk();
        for child in stmt.children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let module = node_text(&child, source).to_string();
                    let local = module.split('.').next().unwrap_or(&module).to_string();
                    push(local, module, String::new());
                }
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| node_text(&n, source).to_string())
                        .unwrap_or_default();
                    let local = child
                        .child_by_field_name("alias")
                        .map(|n| node_text(&n, source).to_string())
                        .unwrap_or_else(|| module.clone());
                    push(local, module, String::new());
                }
                _ => {}
            }
        }
        return;
    }

    // `from module import a, b as c` — one entity per imported symbol.
    let module = stmt
        .child_by_field_name("module_name")
        .map(|n| node_text(&n, source).to_string())
        .unwrap_or_default();
    let mut past_import_kw = false;
    let mut cursor = stmt.walk();
    for child in stmt.children(&mut cursor) {
        if child.kind() == "import" {
            past_import_kw = true;
            continue;
        }
        if !past_import_kw {
            continue;
        }
        match child.kind() {
            "dotted_name" => {
                let symbol = node_text(&child, source).to_string();
                push(symbol.clone(), module.clone(), symbol);
            }
            "aliased_import" => {
                let symbol = child
                    .child_by_field_name("name")
                    .map(|n| node_text(&n, source).to_string())
                    .unwrap_or_default();
                let local = child
                    .child_by_field_name("alias")
                    .map(|n| node_text(&n, source).to_string())
                    .unwrap_or_else(|| symbol.clone());
                push(local, module.clone(), symbol);
            }
            _ => {}
        }
    }
}

/// Free top-level statements collapse into a single `<module>` entity so
/// their call references still enter the graph.
fn module_code_entity(
    statements: &[tree_sitter::Node],
    source: &str,
    file_path: &str,
) -> Option<Entity> {
    let first = statements.first()?;
    let last = statements.last()?;
    let text: String = statements
        .iter()
        .map(|n| token_text(n, source))
        .collect::<Vec<_>>()
        .join("\n");
    let mut entity = Entity::new(
        EntityKind::ModuleCode,
        "<module>",
        file_path,
        line_start(first),
        line_end(last),
        &text,
    );
    let mut calls = Vec::new();
    let mut seen = BTreeSet::new();
    for stmt in statements {
        collect_calls_rec(stmt, source, &mut calls, &mut seen);
    }
    calls.retain(|c| !PYTHON_BUILTINS.contains(&c.as_str()));
    entity.calls = calls;
    Some(entity)
}
