//! File-level dependency listings.

use crate::QueryStatus;
use carto_core::graph::GraphStore;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FileDepsReport {
    pub file: String,
    pub status: QueryStatus,
    pub files: Vec<String>,
}

/// Distinct files this file's nodes point at.
pub fn deps(store: &GraphStore, file: &str) -> FileDepsReport {
    report(store, file, store.file_deps(file).into_iter().collect())
}

/// Distinct files pointing into this file.
pub fn rdeps(store: &GraphStore, file: &str) -> FileDepsReport {
    report(store, file, store.file_rdeps(file).into_iter().collect())
}

fn report(store: &GraphStore, file: &str, files: Vec<String>) -> FileDepsReport {
    let known = !store.nodes_in_file(file).is_empty();
    FileDepsReport {
        file: file.to_string(),
        status: if known { QueryStatus::Ok } else { QueryStatus::NotFound },
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_edge, make_node};
    use carto_core::entity::EntityKind;
    use carto_core::graph::EdgeKind;

    #[test]
    fn test_deps_and_rdeps() {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "one", EntityKind::Function);
        make_node(&mut store, "b.py", "two", EntityKind::Function);
        make_edge(&mut store, ("b.py", "two"), ("a.py", "one"), EdgeKind::Imports);

        let d = deps(&store, "b.py");
        assert_eq!(d.status, QueryStatus::Ok);
        assert_eq!(d.files, vec!["a.py"]);
        assert_eq!(rdeps(&store, "a.py").files, vec!["b.py"]);
        assert!(deps(&store, "a.py").files.is_empty());
        assert_eq!(deps(&store, "zz.py").status, QueryStatus::NotFound);
    }
}
