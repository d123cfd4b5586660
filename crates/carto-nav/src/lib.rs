//! Structural queries over the graph store.
//!
//! Callers/callees ([`neighbors`]), file dependencies ([`deps`]), impact
//! radius ([`impact`]), shortest paths ([`paths`]), dead code ([`dead`]),
//! file cycles ([`cycles`]), name search ([`search`]), graph summary
//! ([`summary`]), node/file detail ([`fetch`]), and DOT export
//! ([`export`]). All queries are pure reads: they never mutate the graph,
//! and unresolved subjects come back as an empty result with a status flag
//! rather than an error.

pub mod cycles;
pub mod dead;
pub mod deps;
pub mod dispatch;
pub mod export;
pub mod fetch;
pub mod impact;
pub mod neighbors;
pub mod paths;
pub mod search;
pub mod summary;

use serde::Serialize;

/// Outcome flag carried by every query report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Ok,
    /// The queried name or file is not in the graph.
    NotFound,
    /// The query text is not a usable pattern.
    InvalidPattern,
}

#[cfg(test)]
pub(crate) mod testutil {
    use carto_core::entity::{Confidence, Entity, EntityKind};
    use carto_core::graph::{Edge, EdgeKind, GraphStore, Node, node_id};

    pub fn make_node(store: &mut GraphStore, file: &str, name: &str, kind: EntityKind) {
        let entity = Entity::new(kind, name, file, 1, 4, name);
        store.insert_node(Node::from_entity(entity, chrono::Utc::now()));
    }

    pub fn make_edge(store: &mut GraphStore, from: (&str, &str), to: (&str, &str), kind: EdgeKind) {
        store.insert_edge(Edge {
            source: node_id(from.0, from.1),
            target: node_id(to.0, to.1),
            kind,
            confidence: Confidence::High,
            source_file: from.0.to_string(),
        });
    }
}
