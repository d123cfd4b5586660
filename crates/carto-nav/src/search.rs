//! Regex search over node names.

use crate::QueryStatus;
use carto_core::entity::{EntityKind, bare_name};
use carto_core::graph::GraphStore;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub file: String,
    pub kind: EntityKind,
    pub line_start: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub pattern: String,
    pub status: QueryStatus,
    pub hits: Vec<SearchHit>,
}

/// Search scoped and bare names. A pattern without explicit anchors is
/// wrapped in word boundaries so `get` does not match `widget`.
pub fn search(store: &GraphStore, pattern: &str) -> SearchReport {
    let effective = if pattern.contains('^') || pattern.contains('$') || pattern.contains("\\b") {
        pattern.to_string()
    } else {
        format!(r"\b(?:{pattern})\b")
    };
    let Ok(re) = Regex::new(&effective) else {
        return SearchReport {
            pattern: pattern.to_string(),
            status: QueryStatus::InvalidPattern,
            hits: Vec::new(),
        };
    };

    let hits: Vec<SearchHit> = store
        .all_nodes()
        .filter(|n| re.is_match(&n.entity.name) || re.is_match(bare_name(&n.entity.name)))
        .map(|n| SearchHit {
            id: n.id.clone(),
            name: n.entity.name.clone(),
            file: n.entity.file_path.clone(),
            kind: n.entity.kind,
            line_start: n.entity.line_start,
        })
        .collect();
    SearchReport {
        pattern: pattern.to_string(),
        status: if hits.is_empty() { QueryStatus::NotFound } else { QueryStatus::Ok },
        hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_node;

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "get_user", EntityKind::Function);
        make_node(&mut store, "a.py", "Widget", EntityKind::Class);
        make_node(&mut store, "b.py", "Widget.get", EntityKind::Function);
        store
    }

    #[test]
    fn test_word_boundary_wrapping() {
        let store = sample_store();
        let hits = search(&store, "get");
        // `get` matches Widget.get's bare name and get_user? no — word
        // boundary keeps get_user out (underscore is a word character)
        assert_eq!(hits.hits.len(), 1);
        assert_eq!(hits.hits[0].name, "Widget.get");
    }

    #[test]
    fn test_explicit_anchor_respected() {
        let store = sample_store();
        let hits = search(&store, "^get_.*$");
        assert_eq!(hits.hits.len(), 1);
        assert_eq!(hits.hits[0].name, "get_user");
    }

    #[test]
    fn test_invalid_pattern_flagged() {
        let store = sample_store();
        assert_eq!(search(&store, "([").status, QueryStatus::InvalidPattern);
    }

    #[test]
    fn test_no_match_is_not_found() {
        let store = sample_store();
        assert_eq!(search(&store, "ghost").status, QueryStatus::NotFound);
    }
}
