//! Impact radius: which files are affected by a change to this one.

use crate::QueryStatus;
use carto_core::entity::bare_name;
use carto_core::graph::GraphStore;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub file: String,
    pub status: QueryStatus,
    /// Files reachable over reverse dependencies, sorted.
    pub affected: Vec<String>,
    pub depth_reached: usize,
}

/// BFS over file-level reverse dependencies up to `max_depth`. When `name`
/// is given, the result keeps only files that reference a node with that
/// bare name.
pub fn impact(
    store: &GraphStore,
    file: &str,
    name: Option<&str>,
    max_depth: usize,
) -> ImpactReport {
    if store.nodes_in_file(file).is_empty() {
        return ImpactReport {
            file: file.to_string(),
            status: QueryStatus::NotFound,
            affected: Vec::new(),
            depth_reached: 0,
        };
    }

    let mut visited = BTreeSet::new();
    let mut depth_reached = 0;
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((file.to_string(), 0));
    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for rdep in store.file_rdeps(&current) {
            if rdep != file && visited.insert(rdep.clone()) {
                depth_reached = depth_reached.max(depth + 1);
                queue.push_back((rdep, depth + 1));
            }
        }
    }

    let affected: Vec<String> = match name {
        Some(name) => visited
            .into_iter()
            .filter(|f| references_name(store, f, name))
            .collect(),
        None => visited.into_iter().collect(),
    };
    ImpactReport {
        file: file.to_string(),
        status: QueryStatus::Ok,
        affected,
        depth_reached,
    }
}

/// Does any edge leaving `file` target a node with this bare name?
fn references_name(store: &GraphStore, file: &str, name: &str) -> bool {
    store.edges_from_file(file).iter().any(|edge| {
        store
            .node(&edge.target)
            .map(|n| bare_name(&n.entity.name) == name)
            .unwrap_or_else(|| edge.target.ends_with(&format!(":{name}")))
    })
}
