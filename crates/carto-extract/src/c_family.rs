//! Pattern-matching extractors for C and C++.
//!
//! C coverage: functions, structs, local includes, calls. No inheritance —
//! the language has none. C++ adds classes with base lists, in-class and
//! out-of-line methods (`Class::method` becomes `Class.method`).

use crate::patterns::{
    block_end, collect_calls, join_lines, split_params, strip_comments,
    strip_comments_and_strings, type_identifiers,
};
use crate::{Extraction, Extractor, dedup_entities, extension};
use carto_core::entity::{Entity, EntityKind};
use regex::Regex;
use std::sync::LazyLock;

pub(crate) const C_BUILTINS: &[&str] = &[
    "printf", "fprintf", "sprintf", "snprintf", "scanf", "sscanf", "malloc", "calloc",
    "realloc", "free", "memcpy", "memset", "memmove", "memcmp", "strlen", "strcpy",
    "strncpy", "strcmp", "strncmp", "strcat", "strchr", "strstr", "strtok", "fopen",
    "fclose", "fread", "fwrite", "fgets", "fputs", "fseek", "ftell", "exit", "abort",
    "assert", "puts", "putchar", "getchar", "atoi", "atof", "strtol", "strtod", "qsort",
    "bsearch", "abs", "rand", "srand", "time", "perror",
];

const CPP_BUILTINS: &[&str] = &[
    "push_back", "emplace_back", "pop_back", "size", "begin", "end", "rbegin", "rend",
    "at", "insert", "erase", "clear", "find", "count", "c_str", "data", "substr",
    "append", "reserve", "resize", "empty", "front", "back", "make_shared", "make_unique",
    "make_pair", "get", "reset", "move", "forward", "swap", "to_string", "stoi", "stod",
    "static_cast", "dynamic_cast", "reinterpret_cast", "const_cast",
];

const C_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "return", "sizeof", "case", "do", "else", "goto",
    "typedef", "defined", "catch", "throw", "new", "delete", "template", "operator",
];

const C_BUILTIN_TYPES: &[&str] = &[
    "int", "char", "float", "double", "void", "long", "short", "unsigned", "signed",
    "const", "static", "inline", "extern", "volatile", "register", "struct", "enum",
    "union", "bool", "auto", "size_t", "ssize_t", "ptrdiff_t", "int8_t", "int16_t",
    "int32_t", "int64_t", "uint8_t", "uint16_t", "uint32_t", "uint64_t", "uintptr_t",
    "intptr_t", "FILE", "std", "string", "vector", "map", "set", "pair", "shared_ptr",
    "unique_ptr", "virtual", "explicit", "override", "final", "public", "private",
    "protected", "class", "typename", "template", "constexpr", "noexcept", "mutable",
];

static INCLUDE_LOCAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*#\s*include\s+"([^"]+)""#).expect("static regex"));
static FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w\s\*&:<>,]*?[\s\*]\s*(\w+)\s*\(").expect("static regex")
});
static STRUCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:typedef\s+)?struct\s+(\w+)\s*\{").expect("static regex")
});
static CPP_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:class|struct)\s+(\w+)\s*(?::\s*([^\{]+))?\s*\{").expect("static regex")
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s+(?:virtual\s+|static\s+|inline\s+|explicit\s+|constexpr\s+)*[\w:<>\*&\s~]*?(~?\w+)\s*\(([^)]*)\)\s*(?:const\s*)?(?:override\s*)?(?:noexcept\s*)?\{",
    )
    .expect("static regex")
});
static OUT_OF_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w\s\*&:<>,]*?\b(\w+)::(~?\w+)\s*\(").expect("static regex")
});

pub struct CExtractor;

impl Extractor for CExtractor {
    fn language(&self) -> &'static str {
        "c"
    }

    fn can_handle(&self, file_path: &str) -> bool {
        matches!(extension(file_path).as_deref(), Some("c" | "h"))
    }

    fn extract(&self, source: &str, file_path: &str) -> Extraction {
        Extraction::clean(extract_c_like(source, file_path, false))
    }
}

pub struct CppExtractor;

impl Extractor for CppExtractor {
    fn language(&self) -> &'static str {
        "cpp"
    }

    fn can_handle(&self, file_path: &str) -> bool {
        matches!(
            extension(file_path).as_deref(),
            Some("cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh")
        )
    }

    fn extract(&self, source: &str, file_path: &str) -> Extraction {
        Extraction::clean(extract_c_like(source, file_path, true))
    }
}

fn deny_for(cpp: bool) -> Vec<&'static str> {
    let mut deny = C_BUILTINS.to_vec();
    if cpp {
        deny.extend_from_slice(CPP_BUILTINS);
    }
    deny
}

fn extract_c_like(source: &str, file_path: &str, cpp: bool) -> Vec<Entity> {
    let clean = strip_comments(source);
    let lines: Vec<&str> = clean.lines().collect();
    let mut entities: Vec<Entity> = Vec::new();
    let deny = deny_for(cpp);

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(cap) = INCLUDE_LOCAL_RE.captures(line) {
            let header = &cap[1];
            let stem = header
                .rsplit('/')
                .next()
                .unwrap_or(header)
                .trim_end_matches(".h")
                .trim_end_matches(".hpp");
            let mut entity = Entity::new(EntityKind::Import, stem, file_path, i + 1, i + 1, line);
            entity.imports.push((".".to_string(), stem.to_string()));
            entities.push(entity);
            i += 1;
            continue;
        }
        if line.trim_start().starts_with('#') {
            i += 1;
            continue;
        }

        if cpp && let Some(cap) = CPP_CLASS_RE.captures(line) {
            let end = block_end(&lines, i);
            let text = join_lines(&lines, i, end);
            let name = cap[1].to_string();
            let mut entity =
                Entity::new(EntityKind::Class, &name, file_path, i + 1, end + 1, &text);
            if let Some(bases) = cap.get(2) {
                entity.inherits = bases
                    .as_str()
                    .split(',')
                    .map(|b| {
                        b.trim()
                            .trim_start_matches("public ")
                            .trim_start_matches("protected ")
                            .trim_start_matches("private ")
                            .trim_start_matches("virtual ")
                            .trim()
                            .to_string()
                    })
                    .filter(|b| !b.is_empty())
                    .collect();
            }
            entities.push(entity);
            extract_cpp_methods(&lines, i, end, &name, file_path, &deny, &mut entities);
            i = end + 1;
            continue;
        }

        if !cpp && let Some(cap) = STRUCT_RE.captures(line) {
            let end = block_end(&lines, i);
            let text = join_lines(&lines, i, end);
            entities.push(Entity::new(
                EntityKind::Class,
                &cap[1],
                file_path,
                i + 1,
                end + 1,
                &text,
            ));
            i = end + 1;
            continue;
        }

        if cpp && let Some(cap) = OUT_OF_LINE_RE.captures(line) {
            let end = block_end(&lines, i);
            if end > i || line.contains('{') {
                let scoped = format!("{}.{}", &cap[1], cap[2].trim_start_matches('~'));
                entities.push(c_function_entity(&lines, i, end, &scoped, &deny, file_path));
                i = end + 1;
                continue;
            }
        }

        if let Some(cap) = FUNC_RE.captures(line) {
            let name = cap[1].to_string();
            if !C_KEYWORDS.contains(&name.as_str()) {
                let end = block_end(&lines, i);
                // prototypes have no body
                let has_body = end > i || line.contains('{');
                let is_prototype = line.trim_end().ends_with(';');
                if has_body && !is_prototype {
                    entities.push(c_function_entity(&lines, i, end, &name, &deny, file_path));
                    i = end + 1;
                    continue;
                }
            }
        }

        i += 1;
    }

    dedup_entities(entities)
}

fn c_function_entity(
    lines: &[&str],
    start: usize,
    end: usize,
    name: &str,
    deny: &[&str],
    file_path: &str,
) -> Entity {
    let text = join_lines(lines, start, end);
    let mut entity =
        Entity::new(EntityKind::Function, name, file_path, start + 1, end + 1, &text);

    if let Some(open) = lines[start].find('(') {
        let close = lines[start].rfind(')').unwrap_or(lines[start].len());
        if close > open {
            for param in split_params(&lines[start][open + 1..close]) {
                if param == "void" {
                    continue;
                }
                // last identifier is the name, the rest is the type
                let idents = type_identifiers(&param, &[]);
                if let Some((pname, ptypes)) = idents.split_last() {
                    if !C_BUILTIN_TYPES.contains(&pname.as_str()) {
                        entity.params.push(pname.clone());
                    }
                    entity.type_refs.extend(
                        ptypes.iter().filter(|t| !C_BUILTIN_TYPES.contains(&t.as_str())).cloned(),
                    );
                }
            }
        }
        // tokens before the function name form the return type
        let bare = entity.bare_name().to_string();
        if let Some(name_pos) = lines[start].find(&bare) {
            entity.type_refs.extend(type_identifiers(&lines[start][..name_pos], C_BUILTIN_TYPES));
        }
    }
    entity.type_refs.dedup();
    let own = entity.bare_name().to_string();
    entity.calls = collect_calls(&strip_comments_and_strings(&text), deny, C_KEYWORDS, &own);
    entity
}

fn extract_cpp_methods(
    lines: &[&str],
    start: usize,
    end: usize,
    class_name: &str,
    file_path: &str,
    deny: &[&str],
    entities: &mut Vec<Entity>,
) {
    let mut depth: i32 = 0;
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
        if depth_before == 1
            && let Some(cap) = METHOD_RE.captures(line)
        {
            let name = cap[1].trim_start_matches('~').to_string();
            if !C_KEYWORDS.contains(&name.as_str()) {
                let method_end = block_end(lines, i).min(end);
                let scoped = format!("{class_name}.{name}");
                entities.push(c_function_entity(lines, i, method_end, &scoped, deny, file_path));
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
