//! Detail lookups: one entity, or everything in a file.

use crate::QueryStatus;
use carto_core::graph::{GraphStore, Node};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EntityReport {
    pub query: String,
    pub status: QueryStatus,
    /// All nodes the query resolved to, in deterministic order.
    pub nodes: Vec<Node>,
}

/// Resolve a name and return the full node records.
pub fn entity_info(store: &GraphStore, query: &str) -> EntityReport {
    let nodes: Vec<Node> = store.lookup(query).into_iter().cloned().collect();
    EntityReport {
        query: query.to_string(),
        status: if nodes.is_empty() { QueryStatus::NotFound } else { QueryStatus::Ok },
        nodes,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub status: QueryStatus,
    pub nodes: Vec<Node>,
}

/// All nodes defined in a file, in id order.
pub fn file_info(store: &GraphStore, file: &str) -> FileReport {
    let nodes: Vec<Node> = store.nodes_in_file(file).into_iter().cloned().collect();
    FileReport {
        file: file.to_string(),
        status: if nodes.is_empty() { QueryStatus::NotFound } else { QueryStatus::Ok },
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_node;
    use carto_core::entity::EntityKind;

    #[test]
    fn test_entity_and_file_lookup() {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "util", EntityKind::Function);
        make_node(&mut store, "a.py", "Box", EntityKind::Class);

        let entity = entity_info(&store, "util");
        assert_eq!(entity.status, QueryStatus::Ok);
        assert_eq!(entity.nodes[0].id, "a.py::util");

        let file = file_info(&store, "a.py");
        assert_eq!(file.nodes.len(), 2);
        assert_eq!(file_info(&store, "b.py").status, QueryStatus::NotFound);
    }
}
