//! Callers and callees of a named entity.

use crate::QueryStatus;
use carto_core::entity::Confidence;
use carto_core::graph::{EdgeKind, GraphStore};
use serde::Serialize;

/// One edge endpoint in a neighbor listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    /// The other endpoint (caller for `callers`, target for `callees`).
    pub node: String,
    pub kind: EdgeKind,
    pub confidence: Confidence,
    /// The matched node this reference attaches to.
    pub subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborReport {
    pub query: String,
    pub status: QueryStatus,
    /// Node ids the query resolved to, in deterministic order.
    pub matched: Vec<String>,
    pub references: Vec<Reference>,
}

/// Incoming references of every node the name resolves to, across all edge
/// kinds.
pub fn callers(store: &GraphStore, name: &str) -> NeighborReport {
    neighbor_report(store, name, true)
}

/// Outgoing references, symmetric to [`callers`]. Unresolved targets appear
/// with their `unresolved:` placeholder id.
pub fn callees(store: &GraphStore, name: &str) -> NeighborReport {
    neighbor_report(store, name, false)
}

fn neighbor_report(store: &GraphStore, name: &str, incoming: bool) -> NeighborReport {
    let nodes = store.lookup(name);
    if nodes.is_empty() {
        return NeighborReport {
            query: name.to_string(),
            status: QueryStatus::NotFound,
            matched: Vec::new(),
            references: Vec::new(),
        };
    }
    let matched: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let mut references = Vec::new();
    for node in &nodes {
        let edges = if incoming {
            store.incoming_edges(&node.id)
        } else {
            store.outgoing_edges(&node.id)
        };
        for edge in edges {
            references.push(Reference {
                node: if incoming { edge.source.clone() } else { edge.target.clone() },
                kind: edge.kind,
                confidence: edge.confidence,
                subject: node.id.clone(),
            });
        }
    }
    references.sort_by(|a, b| (&a.node, a.kind).cmp(&(&b.node, b.kind)));
    references.dedup();
    NeighborReport {
        query: name.to_string(),
        status: QueryStatus::Ok,
        matched,
        references,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_edge, make_node};
    use carto_core::entity::EntityKind;

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "util", EntityKind::Function);
        make_node(&mut store, "b.py", "go", EntityKind::Function);
        make_node(&mut store, "c.py", "also", EntityKind::Function);
        make_edge(&mut store, ("b.py", "go"), ("a.py", "util"), EdgeKind::Calls);
        make_edge(&mut store, ("c.py", "also"), ("a.py", "util"), EdgeKind::UsesType);
        store
    }

    #[test]
    fn test_callers_lists_all_kinds() {
        let store = sample_store();
        let report = callers(&store, "util");
        assert_eq!(report.status, QueryStatus::Ok);
        assert_eq!(report.references.len(), 2);
        assert_eq!(report.references[0].node, "b.py::go");
        assert_eq!(report.references[0].kind, EdgeKind::Calls);
        assert_eq!(report.references[1].kind, EdgeKind::UsesType);
    }

    #[test]
    fn test_callees_symmetric() {
        let store = sample_store();
        let report = callees(&store, "go");
        assert_eq!(report.references.len(), 1);
        assert_eq!(report.references[0].node, "a.py::util");
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let store = sample_store();
        let report = callers(&store, "ghost");
        assert_eq!(report.status, QueryStatus::NotFound);
        assert!(report.references.is_empty());
    }

    #[test]
    fn test_results_are_deterministic() {
        let store = sample_store();
        let a = callers(&store, "util");
        let b = callers(&store, "util");
        assert_eq!(a.references, b.references);
    }
}
