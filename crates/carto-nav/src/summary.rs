//! Whole-graph overview: counts, hubs, entry points, cycles.

use carto_core::entity::{EntityKind, bare_name};
use carto_core::graph::GraphStore;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct DegreeEntry {
    pub id: String,
    pub degree: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub nodes: usize,
    pub edges: usize,
    pub files: usize,
    pub nodes_by_kind: BTreeMap<&'static str, usize>,
    pub edges_by_kind: BTreeMap<&'static str, usize>,
    pub edges_by_confidence: BTreeMap<&'static str, usize>,
    pub top_in_degree: Vec<DegreeEntry>,
    pub top_out_degree: Vec<DegreeEntry>,
    /// Functions whose name matches an entry-point convention, or that
    /// live in a `__main__`-style file.
    pub entry_points: Vec<String>,
    pub cycles: Vec<Vec<String>>,
}

pub fn summarize(store: &GraphStore, top_k: usize, entrypoint_patterns: &[String]) -> Summary {
    let mut nodes_by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
    for node in store.all_nodes() {
        *nodes_by_kind.entry(node.entity.kind.name()).or_default() += 1;
    }
    let mut edges_by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut edges_by_confidence: BTreeMap<&'static str, usize> = BTreeMap::new();
    for edge in store.all_edges() {
        *edges_by_kind.entry(edge.kind.name()).or_default() += 1;
        *edges_by_confidence.entry(edge.confidence.name()).or_default() += 1;
    }

    let top_in_degree = top_by(store, top_k, |id| store.in_degree(id));
    let top_out_degree = top_by(store, top_k, |id| store.out_degree(id));

    let patterns: Vec<Regex> = entrypoint_patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();
    let entry_points: Vec<String> = store
        .all_nodes()
        .filter(|n| n.entity.kind == EntityKind::Function)
        .filter(|n| {
            let name = bare_name(&n.entity.name);
            let file_stem = n
                .entity
                .file_path
                .rsplit('/')
                .next()
                .and_then(|f| f.split('.').next())
                .unwrap_or("");
            patterns.iter().any(|p| p.is_match(name)) || file_stem == "__main__"
        })
        .map(|n| n.id.clone())
        .collect();

    Summary {
        nodes: store.node_count(),
        edges: store.edge_count(),
        files: store.files().len(),
        nodes_by_kind,
        edges_by_kind,
        edges_by_confidence,
        top_in_degree,
        top_out_degree,
        entry_points,
        cycles: store
            .file_cycles()
            .into_iter()
            .map(|c| c.into_iter().collect())
            .collect(),
    }
}

fn top_by(store: &GraphStore, top_k: usize, degree: impl Fn(&str) -> usize) -> Vec<DegreeEntry> {
    let mut entries: Vec<DegreeEntry> = store
        .all_nodes()
        .map(|n| DegreeEntry {
            degree: degree(&n.id),
            id: n.id.clone(),
        })
        .filter(|e| e.degree > 0)
        .collect();
    entries.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.id.cmp(&b.id)));
    entries.truncate(top_k);
    entries
}
