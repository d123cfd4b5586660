//! Pattern-matching extractor for JavaScript.
//!
//! Shares the JS-like core with the TypeScript extractor; adds CommonJS
//! export detection. No type annotations or decorators.

use crate::patterns::strip_comments;
use crate::typescript::extract_js_like;
use crate::{Extraction, Extractor, extension};
use regex::Regex;
use std::sync::LazyLock;

static MODULE_EXPORTS_OBJ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"module\.exports\s*=\s*\{([^}]*)\}").expect("static regex"));
static MODULE_EXPORTS_ONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"module\.exports\s*=\s*(\w+)\s*;?\s*$").expect("static regex"));
static EXPORTS_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:module\.)?exports\.(\w+)\s*=").expect("static regex"));

pub struct JavaScriptExtractor;

impl Extractor for JavaScriptExtractor {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn can_handle(&self, file_path: &str) -> bool {
        matches!(extension(file_path).as_deref(), Some("js" | "jsx" | "mjs" | "cjs"))
    }

    fn extract(&self, source: &str, file_path: &str) -> Extraction {
        let mut entities = extract_js_like(source, file_path, false);

        let clean = strip_comments(source);
        let mut marked: Vec<String> = Vec::new();
        for cap in MODULE_EXPORTS_OBJ_RE.captures_iter(&clean) {
            for part in cap[1].split(',') {
                let name = part.split(':').next().unwrap_or("").trim();
                if !name.is_empty() {
                    marked.push(name.to_string());
                }
            }
        }
        for cap in MODULE_EXPORTS_ONE_RE.captures_iter(&clean) {
            marked.push(cap[1].to_string());
        }
        for cap in EXPORTS_FIELD_RE.captures_iter(&clean) {
            marked.push(cap[1].to_string());
        }
        for entity in &mut entities {
            if marked.iter().any(|n| n == entity.bare_name()) {
                entity.exported = true;
            }
        }

        Extraction::clean(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commonjs_exports_marked() {
        let src = "function go() {}\nfunction stay() {}\nmodule.exports = { go };\n";
        let ex = JavaScriptExtractor.extract(src, "app.js");
        let go = ex.entities.iter().find(|e| e.name == "go").unwrap();
        let stay = ex.entities.iter().find(|e| e.name == "stay").unwrap();
        assert!(go.exported);
        assert!(!stay.exported);
    }

    #[test]
    fn test_no_type_annotations_in_js() {
        let ex = JavaScriptExtractor.extract("function f(a, b) {\n  helper(a);\n}\n", "app.js");
        assert_eq!(ex.entities[0].params, vec!["a", "b"]);
        assert!(ex.entities[0].type_refs.is_empty());
        assert_eq!(ex.entities[0].calls, vec!["helper"]);
    }

    #[test]
    fn test_require_binding() {
        let ex = JavaScriptExtractor.extract("const util = require('./util');\n", "app.js");
        assert_eq!(ex.entities[0].imports, vec![("./util".to_string(), String::new())]);
    }
}
