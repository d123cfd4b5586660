//! Typed directed multigraph over code entities, with the index set needed
//! for surgical incremental patching.
//!
//! Node identity is `file_path + "::" + scoped_name`. A pair of nodes may be
//! connected by edges of several kinds, but at most one edge of a given kind
//! exists per ordered pair. Edges whose target could not be resolved point at
//! a symbolic `unresolved:<name>` placeholder until a later pass promotes
//! them.

use crate::entity::{Confidence, Entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Prefix of placeholder targets for unresolved edges.
pub const UNRESOLVED_PREFIX: &str = "unresolved:";

/// Canonical node id for an entity.
pub fn node_id(file_path: &str, scoped_name: &str) -> String {
    format!("{file_path}::{scoped_name}")
}

/// Placeholder target id for an unresolved bare name.
pub fn unresolved_id(name: &str) -> String {
    format!("{UNRESOLVED_PREFIX}{name}")
}

/// The bare name behind a placeholder target, if `target` is one.
pub fn unresolved_name(target: &str) -> Option<&str> {
    target.strip_prefix(UNRESOLVED_PREFIX)
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    Imports,
    Inherits,
    UsesType,
    DecoratedBy,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::Calls,
        EdgeKind::Imports,
        EdgeKind::Inherits,
        EdgeKind::UsesType,
        EdgeKind::DecoratedBy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::Inherits => "inherits",
            Self::UsesType => "uses_type",
            Self::DecoratedBy => "decorated_by",
        }
    }
}

/// The graph's persistent view of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub entity: Entity,
    /// When this node was last confirmed by an extraction.
    pub last_seen: DateTime<Utc>,
    pub confidence: Confidence,
}

impl Node {
    pub fn from_entity(entity: Entity, seen: DateTime<Utc>) -> Self {
        Node {
            id: node_id(&entity.file_path, &entity.name),
            confidence: entity.confidence,
            last_seen: seen,
            entity,
        }
    }

    pub fn bare_name(&self) -> &str {
        self.entity.bare_name()
    }
}

/// A directed labeled edge. `target` is either a node id or an
/// `unresolved:<name>` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "source_id")]
    pub source: String,
    #[serde(rename = "target_id_or_placeholder")]
    pub target: String,
    pub kind: EdgeKind,
    pub confidence: Confidence,
    /// Always the file of the source node; used to bulk-invalidate edges
    /// when that file is re-extracted.
    pub source_file: String,
}

impl Edge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey(self.source.clone(), self.kind, self.target.clone())
    }

    pub fn is_unresolved(&self) -> bool {
        self.target.starts_with(UNRESOLVED_PREFIX)
    }
}

/// Identity of an edge: `(source, kind, target)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey(pub String, pub EdgeKind, pub String);

/// The typed multigraph plus its query indices.
///
/// The store owns all nodes and edges. Indices are derived data, kept in
/// sync by the mutation methods here and rebuilt wholesale when a snapshot
/// is loaded.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
    /// bare name -> node ids.
    name_index: HashMap<String, BTreeSet<String>>,
    /// node id -> keys of edges leaving it.
    outgoing: HashMap<String, BTreeSet<EdgeKey>>,
    /// node id or placeholder -> keys of edges arriving at it.
    incoming: HashMap<String, BTreeSet<EdgeKey>>,
    /// file -> node ids defined in it.
    file_index: HashMap<String, BTreeSet<String>>,
    /// source file -> keys of edges originating from it.
    edges_by_file: HashMap<String, BTreeSet<EdgeKey>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ───────────────────────────────────────────────────────────

    /// Insert a node, replacing any node with the same id.
    pub fn insert_node(&mut self, node: Node) {
        let id = node.id.clone();
        self.name_index
            .entry(node.bare_name().to_string())
            .or_default()
            .insert(id.clone());
        self.file_index
            .entry(node.entity.file_path.clone())
            .or_default()
            .insert(id.clone());
        self.nodes.insert(id, node);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Remove a node. Its outgoing edges are dropped; incoming edges are
    /// demoted to low-confidence placeholders so callers keep the name.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        if let Some(ids) = self.name_index.get_mut(node.bare_name()) {
            ids.remove(id);
            if ids.is_empty() {
                self.name_index.remove(node.bare_name());
            }
        }
        if let Some(ids) = self.file_index.get_mut(&node.entity.file_path) {
            ids.remove(id);
            if ids.is_empty() {
                self.file_index.remove(&node.entity.file_path);
            }
        }
        for key in self.outgoing.remove(id).unwrap_or_default() {
            self.detach_edge(&key);
        }
        let placeholder = unresolved_id(node.bare_name());
        for key in self.incoming.remove(id).unwrap_or_default() {
            if let Some(mut edge) = self.detach_edge(&key) {
                edge.target = placeholder.clone();
                edge.confidence = Confidence::Low;
                self.insert_edge(edge);
            }
        }
        Some(node)
    }

    /// Rename a node in place: the id is rebuilt from the new scoped name
    /// and incoming edges are carried over with their targets rewritten.
    /// Returns the new id.
    pub fn rename_node(&mut self, id: &str, new_name: &str) -> Option<String> {
        let mut node = self.nodes.remove(id)?;
        if let Some(ids) = self.name_index.get_mut(node.bare_name()) {
            ids.remove(id);
            if ids.is_empty() {
                self.name_index.remove(node.bare_name());
            }
        }
        if let Some(ids) = self.file_index.get_mut(&node.entity.file_path) {
            ids.remove(id);
        }
        let new_id = node_id(&node.entity.file_path, new_name);
        node.entity.name = new_name.to_string();
        node.id = new_id.clone();
        let incoming = self.incoming.remove(id).unwrap_or_default();
        let outgoing = self.outgoing.remove(id).unwrap_or_default();
        self.insert_node(node);
        for key in incoming {
            if let Some(mut edge) = self.detach_edge(&key) {
                edge.target = new_id.clone();
                self.insert_edge(edge);
            }
        }
        for key in outgoing {
            if let Some(mut edge) = self.detach_edge(&key) {
                edge.source = new_id.clone();
                self.insert_edge(edge);
            }
        }
        Some(new_id)
    }

    // ── Edges ───────────────────────────────────────────────────────────

    /// Insert an edge. A second edge with the same `(source, kind, target)`
    /// replaces the first.
    pub fn insert_edge(&mut self, edge: Edge) {
        let key = edge.key();
        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .insert(key.clone());
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .insert(key.clone());
        self.edges_by_file
            .entry(edge.source_file.clone())
            .or_default()
            .insert(key.clone());
        self.edges.insert(key, edge);
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Remove a single edge and unlink it from every index.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Option<Edge> {
        self.detach_edge(key)
    }

    fn detach_edge(&mut self, key: &EdgeKey) -> Option<Edge> {
        let edge = self.edges.remove(key)?;
        if let Some(set) = self.outgoing.get_mut(&edge.source) {
            set.remove(key);
            if set.is_empty() {
                self.outgoing.remove(&edge.source);
            }
        }
        if let Some(set) = self.incoming.get_mut(&edge.target) {
            set.remove(key);
            if set.is_empty() {
                self.incoming.remove(&edge.target);
            }
        }
        if let Some(set) = self.edges_by_file.get_mut(&edge.source_file) {
            set.remove(key);
            if set.is_empty() {
                self.edges_by_file.remove(&edge.source_file);
            }
        }
        Some(edge)
    }

    /// Drop every edge whose source file is `file`. Returns how many were
    /// removed.
    pub fn remove_edges_from_file(&mut self, file: &str) -> usize {
        let keys = self.edges_by_file.remove(file).unwrap_or_default();
        let count = keys.len();
        for key in keys {
            let Some(edge) = self.edges.remove(&key) else {
                continue;
            };
            if let Some(set) = self.outgoing.get_mut(&edge.source) {
                set.remove(&key);
                if set.is_empty() {
                    self.outgoing.remove(&edge.source);
                }
            }
            if let Some(set) = self.incoming.get_mut(&edge.target) {
                set.remove(&key);
                if set.is_empty() {
                    self.incoming.remove(&edge.target);
                }
            }
        }
        count
    }

    /// Rewrite an existing edge's target, keeping source and kind. The
    /// confidence is only ever raised, never lowered.
    pub fn retarget_edge(&mut self, key: &EdgeKey, new_target: &str, confidence: Confidence) {
        if let Some(mut edge) = self.detach_edge(key) {
            edge.target = new_target.to_string();
            edge.confidence = edge.confidence.max(confidence);
            self.insert_edge(edge);
        }
    }

    // ── Traversal ───────────────────────────────────────────────────────

    pub fn outgoing_edges(&self, id: &str) -> Vec<&Edge> {
        self.outgoing
            .get(id)
            .map(|keys| keys.iter().filter_map(|k| self.edges.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn incoming_edges(&self, id: &str) -> Vec<&Edge> {
        self.incoming
            .get(id)
            .map(|keys| keys.iter().filter_map(|k| self.edges.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn outgoing_by_kind(&self, id: &str, kind: EdgeKind) -> Vec<&Edge> {
        self.outgoing_edges(id)
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    pub fn incoming_by_kind(&self, id: &str, kind: EdgeKind) -> Vec<&Edge> {
        self.incoming_edges(id)
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect()
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.incoming.get(id).map_or(0, BTreeSet::len)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.outgoing.get(id).map_or(0, BTreeSet::len)
    }

    /// Edges currently pointing at the placeholder for `name`.
    pub fn edges_to_unresolved(&self, name: &str) -> Vec<&Edge> {
        self.incoming_edges(&unresolved_id(name))
    }

    /// All placeholder names that currently have at least one edge.
    pub fn unresolved_names(&self) -> BTreeSet<String> {
        self.incoming
            .keys()
            .filter_map(|t| unresolved_name(t))
            .map(str::to_string)
            .collect()
    }

    // ── File-level views ────────────────────────────────────────────────

    /// Nodes defined in `file`, in id order.
    pub fn nodes_in_file(&self, file: &str) -> Vec<&Node> {
        self.file_index
            .get(file)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Edges leaving `file`, in key order.
    pub fn edges_from_file(&self, file: &str) -> Vec<&Edge> {
        self.edges_by_file
            .get(file)
            .map(|keys| keys.iter().filter_map(|k| self.edges.get(k)).collect())
            .unwrap_or_default()
    }

    /// All files that currently have nodes.
    pub fn files(&self) -> BTreeSet<String> {
        self.file_index.keys().cloned().collect()
    }

    /// Distinct files that nodes in `file` point at.
    pub fn file_deps(&self, file: &str) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        for edge in self.edges_from_file(file) {
            if let Some(target) = self.nodes.get(&edge.target)
                && target.entity.file_path != file
            {
                deps.insert(target.entity.file_path.clone());
            }
        }
        deps
    }

    /// Distinct files with edges pointing into `file`.
    pub fn file_rdeps(&self, file: &str) -> BTreeSet<String> {
        let mut rdeps = BTreeSet::new();
        if let Some(ids) = self.file_index.get(file) {
            for id in ids {
                for edge in self.incoming_edges(id) {
                    if edge.source_file != file {
                        rdeps.insert(edge.source_file.clone());
                    }
                }
            }
        }
        rdeps
    }

    /// Condensed file-level adjacency: `F1 -> F2` iff some node in `F1` has
    /// an edge to a node in `F2`. Self-loops are kept.
    pub fn file_graph(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for file in self.file_index.keys() {
            adjacency.entry(file.clone()).or_default();
        }
        for edge in self.edges.values() {
            if let Some(target) = self.nodes.get(&edge.target) {
                adjacency
                    .entry(edge.source_file.clone())
                    .or_default()
                    .insert(target.entity.file_path.clone());
            }
        }
        adjacency
    }

    /// Strongly connected components of the condensed file graph, keeping
    /// only real cycles: components with more than one file, or a single
    /// file with a self-loop. Iterative Tarjan (explicit recursion stack),
    /// deterministic output order.
    pub fn file_cycles(&self) -> Vec<BTreeSet<String>> {
        let adjacency = self.file_graph();
        let files: Vec<&String> = adjacency.keys().collect();
        let index_of: HashMap<&str, usize> = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.as_str(), i))
            .collect();
        let neighbors: Vec<Vec<usize>> = files
            .iter()
            .map(|f| {
                adjacency[f.as_str()]
                    .iter()
                    .filter_map(|t| index_of.get(t.as_str()).copied())
                    .collect()
            })
            .collect();

        let n = files.len();
        let mut index = vec![usize::MAX; n];
        let mut lowlink = vec![usize::MAX; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_index = 0;
        let mut components: Vec<BTreeSet<String>> = Vec::new();

        for root in 0..n {
            if index[root] != usize::MAX {
                continue;
            }
            let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some(&(v, child)) = frames.last() {
                if child == 0 {
                    index[v] = next_index;
                    lowlink[v] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }
                if child < neighbors[v].len() {
                    frames.last_mut().expect("frame exists").1 += 1;
                    let w = neighbors[v][child];
                    if index[w] == usize::MAX {
                        frames.push((w, 0));
                    } else if on_stack[w] {
                        lowlink[v] = lowlink[v].min(index[w]);
                    }
                } else {
                    if lowlink[v] == index[v] {
                        let mut component = BTreeSet::new();
                        loop {
                            let w = stack.pop().expect("stack tracks open nodes");
                            on_stack[w] = false;
                            component.insert(files[w].clone());
                            if w == v {
                                break;
                            }
                        }
                        let is_cycle = component.len() > 1
                            || component
                                .iter()
                                .next()
                                .is_some_and(|f| adjacency[f].contains(f));
                        if is_cycle {
                            components.push(component);
                        }
                    }
                    frames.pop();
                    if let Some(&(parent, _)) = frames.last() {
                        lowlink[parent] = lowlink[parent].min(lowlink[v]);
                    }
                }
            }
        }
        components.sort();
        components
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// Progressive node lookup: exact id, then bare-name exact, then scoped
    /// suffix, then regex over scoped names. Results are in
    /// `(file_path, scoped_name)` order, so repeated queries are stable.
    pub fn lookup(&self, query: &str) -> Vec<&Node> {
        if let Some(node) = self.nodes.get(query) {
            return vec![node];
        }
        if let Some(ids) = self.name_index.get(query) {
            return ids.iter().filter_map(|id| self.nodes.get(id)).collect();
        }
        let suffix = format!(".{query}");
        let matches: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.entity.name.ends_with(&suffix))
            .collect();
        if !matches.is_empty() {
            return matches;
        }
        match regex::Regex::new(query) {
            Ok(re) => self
                .nodes
                .values()
                .filter(|n| re.is_match(&n.entity.name))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Node ids whose bare name equals `name`, in deterministic order.
    pub fn ids_with_bare_name(&self, name: &str) -> Vec<String> {
        self.name_index
            .get(name)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The file a resolved edge target lives in, if any.
    pub fn target_file(&self, edge: &Edge) -> Option<&str> {
        self.nodes.get(&edge.target).map(|n| n.entity.file_path.as_str())
    }
}

/// Rebuild a store from flat node and edge lists (snapshot load).
pub fn store_from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> GraphStore {
    let mut store = GraphStore::new();
    for node in nodes {
        store.insert_node(node);
    }
    for edge in edges {
        store.insert_edge(edge);
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;

    fn make_node(file: &str, name: &str) -> Node {
        let entity = Entity::new(EntityKind::Function, name, file, 1, 3, "body");
        Node::from_entity(entity, Utc::now())
    }

    fn make_edge(source: &str, target: &str, kind: EdgeKind, file: &str) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            confidence: Confidence::High,
            source_file: file.to_string(),
        }
    }

    #[test]
    fn test_insert_and_lookup_exact() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        assert_eq!(store.lookup("a.py::foo").len(), 1);
        assert_eq!(store.lookup("foo").len(), 1);
        assert!(store.lookup("missing").is_empty());
    }

    #[test]
    fn test_lookup_suffix_and_regex() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "Box.get"));
        store.insert_node(make_node("b.py", "Box.get"));
        // bare-name index hits first
        assert_eq!(store.lookup("get").len(), 2);
        // scoped suffix
        assert_eq!(store.lookup("Box.get").len(), 2);
        // regex fallback
        assert_eq!(store.lookup("^Box\\..*").len(), 2);
        // deterministic order by file
        let files: Vec<&str> = store
            .lookup("get")
            .iter()
            .map(|n| n.entity.file_path.as_str())
            .collect();
        assert_eq!(files, vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_edge_uniqueness_per_kind() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "bar"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::UsesType, "a.py"));
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn test_incoming_outgoing_symmetry() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "bar"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        assert_eq!(store.outgoing_edges("a.py::foo").len(), 1);
        assert_eq!(store.incoming_edges("b.py::bar").len(), 1);
        assert_eq!(store.in_degree("b.py::bar"), store.outgoing_edges("a.py::foo").len());
    }

    #[test]
    fn test_remove_node_demotes_incoming_to_placeholder() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "bar"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        store.remove_node("b.py::bar");
        assert_eq!(store.node_count(), 1);
        let unresolved = store.edges_to_unresolved("bar");
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].confidence, Confidence::Low);
        assert_eq!(unresolved[0].source, "a.py::foo");
    }

    #[test]
    fn test_remove_node_drops_outgoing() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "bar"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        store.remove_node("a.py::foo");
        assert_eq!(store.edge_count(), 0);
        assert!(store.incoming_edges("b.py::bar").is_empty());
    }

    #[test]
    fn test_rename_preserves_incoming_edges() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "util"));
        store.insert_node(make_node("b.py", "go"));
        store.insert_edge(make_edge("b.py::go", "a.py::util", EdgeKind::Calls, "b.py"));
        let new_id = store.rename_node("a.py::util", "helper").unwrap();
        assert_eq!(new_id, "a.py::helper");
        assert!(store.node("a.py::util").is_none());
        let incoming = store.incoming_edges("a.py::helper");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, "b.py::go");
        assert_eq!(incoming[0].confidence, Confidence::High);
    }

    #[test]
    fn test_bulk_remove_edges_by_file() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "bar"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        store.insert_edge(make_edge("b.py::bar", "a.py::foo", EdgeKind::Calls, "b.py"));
        assert_eq!(store.remove_edges_from_file("a.py"), 1);
        assert_eq!(store.edge_count(), 1);
        assert!(store.outgoing_edges("a.py::foo").is_empty());
        assert_eq!(store.incoming_edges("a.py::foo").len(), 1);
    }

    #[test]
    fn test_file_deps_and_rdeps() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "bar"));
        store.insert_node(make_node("c.py", "baz"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        store.insert_edge(make_edge("a.py::foo", "c.py::baz", EdgeKind::Imports, "a.py"));
        let deps = store.file_deps("a.py");
        assert_eq!(deps, BTreeSet::from(["b.py".to_string(), "c.py".to_string()]));
        assert_eq!(store.file_rdeps("b.py"), BTreeSet::from(["a.py".to_string()]));
        assert!(store.file_deps("b.py").is_empty());
    }

    #[test]
    fn test_file_graph_condensation() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("x.py", "a"));
        store.insert_node(make_node("y.py", "b"));
        store.insert_edge(make_edge("x.py::a", "y.py::b", EdgeKind::Imports, "x.py"));
        store.insert_edge(make_edge("y.py::b", "x.py::a", EdgeKind::Imports, "y.py"));
        let fg = store.file_graph();
        assert!(fg["x.py"].contains("y.py"));
        assert!(fg["y.py"].contains("x.py"));
    }

    #[test]
    fn test_file_cycles_detects_pair_and_self_loop() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("x.py", "a"));
        store.insert_node(make_node("y.py", "b"));
        store.insert_node(make_node("z.py", "c"));
        store.insert_node(make_node("w.py", "d"));
        store.insert_edge(make_edge("x.py::a", "y.py::b", EdgeKind::Imports, "x.py"));
        store.insert_edge(make_edge("y.py::b", "x.py::a", EdgeKind::Imports, "y.py"));
        store.insert_edge(make_edge("z.py::c", "w.py::d", EdgeKind::Calls, "z.py"));
        let cycles = store.file_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], BTreeSet::from(["x.py".to_string(), "y.py".to_string()]));
    }

    #[test]
    fn test_file_cycles_empty_for_acyclic_graph() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "f"));
        store.insert_node(make_node("b.py", "g"));
        store.insert_edge(make_edge("a.py::f", "b.py::g", EdgeKind::Calls, "a.py"));
        assert!(store.file_cycles().is_empty());
    }

    #[test]
    fn test_unresolved_tracking() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_edge(make_edge("a.py::foo", &unresolved_id("util"), EdgeKind::Calls, "a.py"));
        assert_eq!(store.unresolved_names(), BTreeSet::from(["util".to_string()]));
        assert_eq!(store.edges_to_unresolved("util").len(), 1);
    }

    #[test]
    fn test_retarget_never_lowers_confidence() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "util"));
        let edge = Edge {
            source: "a.py::foo".to_string(),
            target: unresolved_id("util"),
            kind: EdgeKind::Calls,
            confidence: Confidence::Medium,
            source_file: "a.py".to_string(),
        };
        let key = edge.key();
        store.insert_edge(edge);
        store.retarget_edge(&key, "b.py::util", Confidence::Low);
        let edges = store.incoming_edges("b.py::util");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_store_from_parts_rebuilds_indices() {
        let mut store = GraphStore::new();
        store.insert_node(make_node("a.py", "foo"));
        store.insert_node(make_node("b.py", "bar"));
        store.insert_edge(make_edge("a.py::foo", "b.py::bar", EdgeKind::Calls, "a.py"));
        let nodes: Vec<Node> = store.all_nodes().cloned().collect();
        let edges: Vec<Edge> = store.all_edges().cloned().collect();
        let rebuilt = store_from_parts(nodes, edges);
        assert_eq!(rebuilt.node_count(), 2);
        assert_eq!(rebuilt.incoming_edges("b.py::bar").len(), 1);
        assert_eq!(rebuilt.edges_from_file("a.py").len(), 1);
    }
}
