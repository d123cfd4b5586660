//! Two-pass name resolution linking calls, imports, inheritance, type
//! references, and decorators across files.
//!
//! Pass one materializes edges for a freshly extracted file through a fixed
//! ladder: in-file exact name, in-file class method, explicit import
//! binding, then project-wide bare-name match (medium confidence when
//! unique, placeholder when absent or ambiguous). Pass two revisits
//! unresolved placeholders whose name just gained a definition and promotes
//! them, never lowering confidence.

use carto_core::entity::{Confidence, Entity, bare_name};
use carto_core::graph::{Edge, EdgeKind, GraphStore, node_id, unresolved_id};
use std::collections::{BTreeSet, HashMap};

/// `local name -> (module, symbol)` bindings from a file's import entities.
fn import_bindings(entities: &[Entity]) -> HashMap<String, (String, String)> {
    let mut bindings = HashMap::new();
    for entity in entities {
        for (module, symbol) in &entity.imports {
            bindings.insert(entity.name.clone(), (module.clone(), symbol.clone()));
        }
    }
    bindings
}

/// Pass one: rebuild all edges sourced from `file` out of its entity list.
/// The caller must have bulk-deleted the file's previous edges. Returns the
/// number of edges created.
pub fn resolve_file(store: &mut GraphStore, file: &str, entities: &[Entity]) -> usize {
    let bindings = import_bindings(entities);
    let mut created = 0;

    for entity in entities {
        let source_id = node_id(file, &entity.name);
        if store.node(&source_id).is_none() {
            continue;
        }
        let mut emit = |store: &mut GraphStore, target: String, kind: EdgeKind, conf: Confidence| {
            store.insert_edge(Edge {
                source: source_id.clone(),
                target,
                kind,
                confidence: conf,
                source_file: file.to_string(),
            });
        };

        for call in &entity.calls {
            let (target, conf) = resolve_name(store, file, entity, &bindings, call);
            emit(store, target, EdgeKind::Calls, conf);
            created += 1;
        }
        for base in &entity.inherits {
            let (target, conf) = resolve_name(store, file, entity, &bindings, base);
            emit(store, target, EdgeKind::Inherits, conf);
            created += 1;
        }
        for type_ref in &entity.type_refs {
            let (target, conf) = resolve_name(store, file, entity, &bindings, type_ref);
            emit(store, target, EdgeKind::UsesType, conf);
            created += 1;
        }
        for decorator in &entity.decorators {
            let (target, conf) = resolve_name(store, file, entity, &bindings, decorator);
            emit(store, target, EdgeKind::DecoratedBy, conf);
            created += 1;
        }
        for (module, symbol) in &entity.imports {
            let defining = if symbol.is_empty() {
                module.rsplit(['.', ':', '/']).next().unwrap_or(module)
            } else {
                symbol
            };
            let (target, conf) = resolve_import_target(store, file, defining);
            emit(store, target, EdgeKind::Imports, conf);
            created += 1;
        }
    }
    created
}

/// The resolution ladder for call/inherit/type/decorator references.
fn resolve_name(
    store: &GraphStore,
    file: &str,
    entity: &Entity,
    bindings: &HashMap<String, (String, String)>,
    name: &str,
) -> (String, Confidence) {
    // (i) in-file exact name
    let in_file = node_id(file, name);
    if store.node(&in_file).is_some() {
        return (in_file, Confidence::High);
    }
    // (ii) in-file method of the caller's own class
    if let Some((class, _)) = entity.name.rsplit_once('.') {
        let method_id = node_id(file, &format!("{class}.{name}"));
        if store.node(&method_id).is_some() {
            return (method_id, Confidence::High);
        }
    }
    // (iii) explicit import binding for this local name
    if let Some((_, symbol)) = bindings.get(name) {
        let defining = if symbol.is_empty() { name } else { symbol.as_str() };
        let candidates = store.ids_with_bare_name(defining);
        if let Some(id) = candidates.iter().find(|id| !id.starts_with(&format!("{file}::"))) {
            return (id.clone(), Confidence::High);
        }
    }
    // (iv) project-wide bare-name fallback
    let candidates = store.ids_with_bare_name(name);
    match candidates.as_slice() {
        [only] => (only.clone(), Confidence::Medium),
        _ => (unresolved_id(name), Confidence::Low),
    }
}

/// Import edges target the defining node of the imported symbol; until one
/// exists they stay as low-confidence placeholders.
fn resolve_import_target(store: &GraphStore, file: &str, symbol: &str) -> (String, Confidence) {
    let candidates = store.ids_with_bare_name(symbol);
    let defining: Vec<&String> = candidates
        .iter()
        .filter(|id| !id.starts_with(&format!("{file}::")))
        .collect();
    match defining.as_slice() {
        [] => (unresolved_id(symbol), Confidence::Low),
        [only] => ((*only).clone(), Confidence::High),
        // deterministic first candidate; cross-file multi-match is a guess
        [first, ..] => ((*first).clone(), Confidence::Medium),
    }
}

/// Pass two: promote unresolved edges whose placeholder name matches a
/// newly added or renamed definition. Confidence only ever increases.
/// Returns the number of promoted edges.
pub fn promote_unresolved(store: &mut GraphStore, changed_names: &BTreeSet<String>) -> usize {
    let mut promoted = 0;
    for name in changed_names {
        let pending: Vec<_> = store
            .edges_to_unresolved(name)
            .into_iter()
            .map(|e| (e.key(), e.source_file.clone(), e.kind))
            .collect();
        if pending.is_empty() {
            continue;
        }
        let candidates = store.ids_with_bare_name(name);
        if candidates.is_empty() {
            continue;
        }
        for (key, source_file, kind) in pending {
            // an edge never resolves to its own source node
            let viable: Vec<&String> = candidates.iter().filter(|id| **id != key.0).collect();
            let resolved = if kind == EdgeKind::Imports {
                // imports bind to a definition in another file
                let cross: Vec<&&String> = viable
                    .iter()
                    .filter(|id| !id.starts_with(&format!("{source_file}::")))
                    .collect();
                match cross.as_slice() {
                    [] => None,
                    [only] => Some(((**only).clone(), Confidence::High)),
                    [first, ..] => Some(((**first).clone(), Confidence::Medium)),
                }
            } else {
                let same_file = viable
                    .iter()
                    .find(|id| id.starts_with(&format!("{source_file}::")));
                match same_file {
                    Some(id) => Some(((*id).clone(), Confidence::High)),
                    None => match viable.as_slice() {
                        // cross-file single-name match is a medium-trust guess
                        [only] => Some(((*only).clone(), Confidence::Medium)),
                        _ => None,
                    },
                }
            };
            if let Some((target, confidence)) = resolved {
                store.retarget_edge(&key, &target, confidence);
                promoted += 1;
            }
        }
    }
    promoted
}

/// Bare names defined by an entity list (used to drive pass two).
pub fn defined_names(entities: &[Entity]) -> BTreeSet<String> {
    entities.iter().map(|e| bare_name(&e.name).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carto_core::entity::EntityKind;
    use carto_core::graph::Node;
    use chrono::Utc;

    fn add_entities(store: &mut GraphStore, entities: &[Entity]) {
        for entity in entities {
            store.insert_node(Node::from_entity(entity.clone(), Utc::now()));
        }
    }

    fn function(file: &str, name: &str, calls: &[&str]) -> Entity {
        let mut e = Entity::new(EntityKind::Function, name, file, 1, 3, name);
        e.calls = calls.iter().map(|c| (*c).to_string()).collect();
        e
    }

    fn import(file: &str, local: &str, module: &str, symbol: &str) -> Entity {
        let mut e = Entity::new(EntityKind::Import, local, file, 1, 1, local);
        e.imports.push((module.to_string(), symbol.to_string()));
        e
    }

    #[test]
    fn test_in_file_call_resolves_high() {
        let mut store = GraphStore::new();
        let entities = vec![function("a.py", "main", &["helper"]), function("a.py", "helper", &[])];
        add_entities(&mut store, &entities);
        resolve_file(&mut store, "a.py", &entities);
        let edges = store.incoming_edges("a.py::helper");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].confidence, Confidence::High);
        assert_eq!(edges[0].kind, EdgeKind::Calls);
    }

    #[test]
    fn test_class_method_resolution() {
        let mut store = GraphStore::new();
        let entities = vec![
            Entity::new(EntityKind::Class, "Box", "a.py", 1, 10, "class Box"),
            function("a.py", "Box.get", &["check"]),
            function("a.py", "Box.check", &[]),
        ];
        add_entities(&mut store, &entities);
        resolve_file(&mut store, "a.py", &entities);
        let edges = store.incoming_edges("a.py::Box.check");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "a.py::Box.get");
        assert_eq!(edges[0].confidence, Confidence::High);
    }

    #[test]
    fn test_import_binding_resolves_cross_file_high() {
        let mut store = GraphStore::new();
        let a = vec![function("a.py", "util", &[])];
        add_entities(&mut store, &a);
        resolve_file(&mut store, "a.py", &a);

        let b = vec![import("b.py", "util", "a", "util"), function("b.py", "go", &["util"])];
        add_entities(&mut store, &b);
        resolve_file(&mut store, "b.py", &b);

        // the import node itself links to the definition
        let import_edges = store.outgoing_by_kind("b.py::util", EdgeKind::Imports);
        assert_eq!(import_edges.len(), 1);
        assert_eq!(import_edges[0].target, "a.py::util");
        assert_eq!(import_edges[0].confidence, Confidence::High);
        // the call binds to the local import node in-file
        let call_edges = store.outgoing_by_kind("b.py::go", EdgeKind::Calls);
        assert_eq!(call_edges[0].target, "b.py::util");
        assert_eq!(call_edges[0].confidence, Confidence::High);
    }

    #[test]
    fn test_unique_bare_name_fallback_is_medium() {
        let mut store = GraphStore::new();
        let a = vec![function("a.py", "solo", &[])];
        add_entities(&mut store, &a);
        let b = vec![function("b.py", "go", &["solo"])];
        add_entities(&mut store, &b);
        resolve_file(&mut store, "b.py", &b);
        let edges = store.incoming_edges("a.py::solo");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_ambiguous_name_stays_placeholder() {
        let mut store = GraphStore::new();
        let dupes = vec![function("a.py", "dup", &[]), function("b.py", "dup", &[])];
        add_entities(&mut store, &dupes);
        let c = vec![function("c.py", "go", &["dup"])];
        add_entities(&mut store, &c);
        resolve_file(&mut store, "c.py", &c);
        assert_eq!(store.edges_to_unresolved("dup").len(), 1);
    }

    #[test]
    fn test_missing_name_stays_placeholder_then_promotes() {
        let mut store = GraphStore::new();
        let b = vec![import("b.py", "util", "a", "util"), function("b.py", "go", &["util"])];
        add_entities(&mut store, &b);
        resolve_file(&mut store, "b.py", &b);
        assert!(!store.edges_to_unresolved("util").is_empty());

        // now a.py arrives with the definition
        let a = vec![function("a.py", "util", &[])];
        add_entities(&mut store, &a);
        resolve_file(&mut store, "a.py", &a);
        let promoted = promote_unresolved(&mut store, &defined_names(&a));
        assert!(promoted >= 1);
        assert!(store.edges_to_unresolved("util").is_empty());
        let import_edges = store.outgoing_by_kind("b.py::util", EdgeKind::Imports);
        assert_eq!(import_edges[0].target, "a.py::util");
        assert_eq!(import_edges[0].confidence, Confidence::High);
    }

    #[test]
    fn test_promotion_never_downgrades() {
        let mut store = GraphStore::new();
        let a = vec![function("a.py", "util", &[])];
        add_entities(&mut store, &a);
        let promoted = promote_unresolved(&mut store, &BTreeSet::from(["util".to_string()]));
        assert_eq!(promoted, 0);
    }
}
