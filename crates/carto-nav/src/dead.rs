//! Dead-code candidates: defined but never referenced.

use carto_core::entity::{EntityKind, bare_name};
use carto_core::graph::GraphStore;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DeadNode {
    pub id: String,
    pub name: String,
    pub file: String,
    pub kind: EntityKind,
    pub line_start: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadReport {
    pub dead: Vec<DeadNode>,
}

/// Functions and classes with no incoming edges of any kind, excluding
/// explicitly exported entities and names matching the entry-point
/// patterns. Invalid patterns are skipped.
pub fn dead(store: &GraphStore, entrypoint_patterns: &[String]) -> DeadReport {
    let patterns: Vec<Regex> = entrypoint_patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

    let dead = store
        .all_nodes()
        .filter(|n| matches!(n.entity.kind, EntityKind::Function | EntityKind::Class))
        .filter(|n| store.in_degree(&n.id) == 0)
        .filter(|n| !n.entity.exported)
        .filter(|n| {
            let name = bare_name(&n.entity.name);
            !patterns.iter().any(|p| p.is_match(name))
        })
        .map(|n| DeadNode {
            id: n.id.clone(),
            name: n.entity.name.clone(),
            file: n.entity.file_path.clone(),
            kind: n.entity.kind,
            line_start: n.entity.line_start,
        })
        .collect();
    DeadReport { dead }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_edge, make_node};
    use carto_core::graph::EdgeKind;

    fn patterns() -> Vec<String> {
        vec!["^(main|run|start|handler|init)$".to_string()]
    }

    #[test]
    fn test_orphan_function_is_dead() {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "orphan", EntityKind::Function);
        let report = dead(&store, &patterns());
        assert_eq!(report.dead.len(), 1);
        assert_eq!(report.dead[0].name, "orphan");
    }

    #[test]
    fn test_called_function_is_live() {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "used", EntityKind::Function);
        make_node(&mut store, "b.py", "go", EntityKind::Function);
        make_edge(&mut store, ("b.py", "go"), ("a.py", "used"), EdgeKind::Calls);
        let names: Vec<String> = dead(&store, &patterns()).dead.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["go"]);
    }

    #[test]
    fn test_entrypoints_and_exports_excluded() {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "main", EntityKind::Function);
        make_node(&mut store, "a.py", "api", EntityKind::Function);
        // mark api explicitly exported
        let mut node = store.lookup("api")[0].clone();
        node.entity.exported = true;
        store.insert_node(node);
        assert!(dead(&store, &patterns()).dead.is_empty());
    }

    #[test]
    fn test_variables_and_imports_not_reported() {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "CONST", EntityKind::Variable);
        make_node(&mut store, "a.py", "os", EntityKind::Import);
        assert!(dead(&store, &patterns()).dead.is_empty());
    }
}
