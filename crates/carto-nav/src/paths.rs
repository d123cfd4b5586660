//! Shortest dependency path between two nodes.

use crate::QueryStatus;
use carto_core::graph::{EdgeKind, GraphStore};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub source: String,
    pub target: String,
    pub status: QueryStatus,
    /// Node ids along the path, source first. Empty when unreachable.
    pub nodes: Vec<String>,
    /// Edge kinds between consecutive nodes.
    pub edges: Vec<EdgeKind>,
}

/// BFS shortest path by edges in the node graph. At most one path is
/// returned; among equal-length paths the lexicographically smallest node
/// sequence wins because neighbors are expanded in id order.
pub fn shortest_path(store: &GraphStore, source: &str, target: &str) -> PathReport {
    let (Some(src), Some(dst)) = (
        store.lookup(source).first().map(|n| n.id.clone()),
        store.lookup(target).first().map(|n| n.id.clone()),
    ) else {
        return PathReport {
            source: source.to_string(),
            target: target.to_string(),
            status: QueryStatus::NotFound,
            nodes: Vec::new(),
            edges: Vec::new(),
        };
    };

    let mut predecessor: HashMap<String, (String, EdgeKind)> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(src.clone());
    let mut found = src == dst;
    while let Some(current) = queue.pop_front() {
        if found {
            break;
        }
        // outgoing edges arrive in (kind, target) order; re-sort by target
        // id so tie-breaking is purely lexicographic
        let mut next: Vec<(&String, EdgeKind)> =
            store.outgoing_edges(&current).iter().map(|e| (&e.target, e.kind)).collect();
        next.sort();
        for (neighbor, kind) in next {
            if neighbor == &src || predecessor.contains_key(neighbor) {
                continue;
            }
            if store.node(neighbor).is_none() {
                continue;
            }
            predecessor.insert(neighbor.clone(), (current.clone(), kind));
            if *neighbor == dst {
                found = true;
                break;
            }
            queue.push_back(neighbor.clone());
        }
    }

    if !found {
        return PathReport {
            source: src,
            target: dst,
            status: QueryStatus::Ok,
            nodes: Vec::new(),
            edges: Vec::new(),
        };
    }

    let mut nodes = vec![dst.clone()];
    let mut edges = Vec::new();
    let mut cursor = dst.clone();
    while cursor != src {
        let (prev, kind) = predecessor[&cursor].clone();
        edges.push(kind);
        nodes.push(prev.clone());
        cursor = prev;
    }
    nodes.reverse();
    edges.reverse();
    PathReport {
        source: src,
        target: dst,
        status: QueryStatus::Ok,
        nodes,
        edges,
    }
}
