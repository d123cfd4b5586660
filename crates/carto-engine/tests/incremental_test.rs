//! Integration tests for the incremental update pipeline.
//!
//! Drives the engine the way a host does: push file texts through
//! `process_change`, then check the graph, the reports, and the snapshot
//! across edits, renames, deletes, and restarts.

use carto_core::config::EngineConfig;
use carto_core::entity::Confidence;
use carto_core::graph::{EdgeKind, GraphStore};
use carto_engine::bridge::{ChangeKind, Engine, Warning};
use std::collections::BTreeSet;

fn make_engine() -> (Engine, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::with_config(EngineConfig::default(), &dir.path().join("graph.json")).unwrap();
    (engine, dir)
}

fn edit(engine: &mut Engine, file: &str, text: &str) -> carto_engine::bridge::ChangeReport {
    engine.process_change(file, Some(text), ChangeKind::Edit).unwrap()
}

/// Invariants that must hold after any update.
fn verify_graph_integrity(store: &GraphStore) {
    for edge in store.all_edges() {
        let source = store
            .node(&edge.source)
            .unwrap_or_else(|| panic!("dangling edge source: {}", edge.source));
        assert_eq!(
            edge.source_file, source.entity.file_path,
            "edge source_file must match the source node's file"
        );
    }
    // every edge is reachable from both of its adjacency indices
    let outgoing_total: usize = store.all_nodes().map(|n| store.outgoing_edges(&n.id).len()).sum();
    assert_eq!(outgoing_total, store.edge_count());
    for node in store.all_nodes() {
        for edge in store.incoming_edges(&node.id) {
            assert_eq!(edge.target, node.id);
        }
    }
}

// --- end-to-end scenarios ---

#[test]
fn test_rename_preserves_callers() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def foo():\n    return bar()\n");
    edit(&mut engine, "c.py", "from a import foo\ndef call_it():\n    foo()\n");
    assert!(!engine.store().incoming_edges("a.py::foo").is_empty());

    let report = edit(&mut engine, "a.py", "def baz():\n    return bar()\n");
    assert_eq!(report.renamed, 1);
    assert_eq!(report.added, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(report.modified, 0);

    assert!(engine.store().node("a.py::foo").is_none());
    let incoming = engine.store().incoming_edges("a.py::baz");
    assert_eq!(incoming.len(), 1, "previous callers of foo must carry over to baz");
    assert_eq!(incoming[0].source, "c.py::foo");
    verify_graph_integrity(engine.store());
}

#[test]
fn test_cross_file_call_resolves_high() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def util():\n    pass\n");
    edit(&mut engine, "b.py", "from a import util\ndef go():\n    util()\n");

    // the import node binds to the definition across files
    let imports = engine.store().outgoing_by_kind("b.py::util", EdgeKind::Imports);
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].target, "a.py::util");
    assert_eq!(imports[0].confidence, Confidence::High);
    // and the local call binds to the import node
    let calls = engine.store().outgoing_by_kind("b.py::go", EdgeKind::Calls);
    assert_eq!(calls[0].target, "b.py::util");
    assert_eq!(calls[0].confidence, Confidence::High);
    verify_graph_integrity(engine.store());
}

#[test]
fn test_unresolved_import_promotes_when_definition_arrives() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "b.py", "from a import util\ndef go():\n    util()\n");
    let pending = engine.store().edges_to_unresolved("util");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, EdgeKind::Imports);
    assert_eq!(pending[0].confidence, Confidence::Low);

    let report = edit(&mut engine, "a.py", "def util():\n    pass\n");
    assert!(report.promoted >= 1);
    assert!(engine.store().edges_to_unresolved("util").is_empty());
    let imports = engine.store().outgoing_by_kind("b.py::util", EdgeKind::Imports);
    assert_eq!(imports[0].target, "a.py::util");
    assert_eq!(imports[0].confidence, Confidence::High);
    verify_graph_integrity(engine.store());
}

#[test]
fn test_new_file_cycle_warns_and_clears() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "x.py", "from y import b\ndef a():\n    b()\n");
    let report = edit(&mut engine, "y.py", "from x import a\ndef b():\n    a()\n");
    assert!(
        report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::CycleIntroduced { .. })),
        "closing the loop should warn, got {:?}",
        report.warnings
    );
    let cycles = engine.store().file_cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0], BTreeSet::from(["x.py".to_string(), "y.py".to_string()]));

    // removing one import clears the cycle
    edit(&mut engine, "y.py", "def b():\n    pass\n");
    assert!(engine.store().file_cycles().is_empty());
    verify_graph_integrity(engine.store());
}

#[test]
fn test_file_dependency_chain() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def one():\n    pass\n");
    edit(&mut engine, "b.py", "from a import one\ndef two():\n    one()\n");
    edit(&mut engine, "c.py", "from b import two\ndef three():\n    two()\n");
    edit(&mut engine, "d.py", "from c import three\ndef four():\n    three()\n");

    assert_eq!(engine.store().file_deps("b.py"), BTreeSet::from(["a.py".to_string()]));
    assert_eq!(engine.store().file_rdeps("a.py"), BTreeSet::from(["b.py".to_string()]));
    assert_eq!(engine.store().file_rdeps("d.py"), BTreeSet::new());
    verify_graph_integrity(engine.store());
}

// --- structural invariants ---

#[test]
fn test_idempotence_of_process_change() {
    let (mut engine, _dir) = make_engine();
    let text = "def foo():\n    return bar()\n\nclass Box:\n    def get(self):\n        return 1\n";
    edit(&mut engine, "a.py", text);
    let nodes_before = engine.store().node_count();
    let edges_before = engine.store().edge_count();

    let report = edit(&mut engine, "a.py", text);
    assert_eq!(report.added, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(report.modified, 0);
    assert_eq!(report.renamed, 0);
    assert_eq!(engine.store().node_count(), nodes_before);
    assert_eq!(engine.store().edge_count(), edges_before);
}

#[test]
fn test_whitespace_and_comment_edit_is_no_change() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def foo():\n    x = helper()\n    return x\n");
    let report = edit(
        &mut engine,
        "a.py",
        "def foo():\n    # fetch the value\n    x = helper()\n\n    return x\n",
    );
    assert_eq!(report.modified, 0, "comment/blank-line edits must not count as modifications");
    assert_eq!(report.added, 0);
    assert_eq!(report.removed, 0);
}

#[test]
fn test_nodes_match_extraction_after_edit() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def one():\n    pass\n\ndef two():\n    pass\n");
    edit(&mut engine, "a.py", "def two():\n    pass\n\ndef three():\n    pass\n");
    let names: Vec<String> = engine
        .store()
        .nodes_in_file("a.py")
        .iter()
        .map(|n| n.entity.name.clone())
        .collect();
    assert_eq!(names, vec!["three".to_string(), "two".to_string()]);
    verify_graph_integrity(engine.store());
}

#[test]
fn test_delete_demotes_incoming_edges() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def util():\n    pass\n");
    edit(&mut engine, "b.py", "from a import util\ndef go():\n    util()\n");

    let report = engine.process_change("a.py", None, ChangeKind::Delete).unwrap();
    assert_eq!(report.removed, 1);
    assert!(engine.store().nodes_in_file("a.py").is_empty());
    let pending = engine.store().edges_to_unresolved("util");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].confidence, Confidence::Low);
    verify_graph_integrity(engine.store());
}

#[test]
fn test_breaking_change_warning_on_param_loss() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def api(a, b, c):\n    return a\n");
    let report = edit(&mut engine, "a.py", "def api(a, c):\n    return a\n");
    let breaking = report
        .warnings
        .iter()
        .find_map(|w| match w {
            Warning::BreakingChange { node, missing_params } => Some((node, missing_params)),
            _ => None,
        })
        .expect("dropping a param from a public function should warn");
    assert_eq!(breaking.0, "a.py::api");
    assert_eq!(breaking.1, &vec!["b".to_string()]);
}

#[test]
fn test_newly_dead_warning() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def helper():\n    pass\n");
    edit(&mut engine, "b.py", "from a import helper\ndef go():\n    helper()\n");
    assert!(!engine.store().incoming_edges("a.py::helper").is_empty());

    let report = edit(&mut engine, "b.py", "def go():\n    pass\n");
    assert!(
        report.warnings.iter().any(|w| matches!(
            w,
            Warning::NewlyDead { node } if node == "a.py::helper"
        )),
        "helper lost its last reference, got {:?}",
        report.warnings
    );
}

#[test]
fn test_parse_failure_keeps_previous_entities() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def keeper():\n    pass\n");
    // recovery salvages nothing from a fully broken file; the previous
    // entities must survive
    let report = engine
        .process_change("a.py", Some("def keeper(:\n"), ChangeKind::Edit)
        .unwrap();
    assert!(report.warnings.iter().any(|w| matches!(w, Warning::ParseFailed { .. })));
    assert!(engine.store().node("a.py::keeper").is_some());
}

#[test]
fn test_unknown_extension_ignored() {
    let (mut engine, _dir) = make_engine();
    let report = edit(&mut engine, "notes.txt", "not code");
    assert_eq!(report.added, 0);
    assert_eq!(engine.store().node_count(), 0);
}

#[test]
fn test_confidence_never_decreases_on_promotion() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "b.py", "from a import util\ndef go():\n    util()\n");
    let before: Vec<Confidence> =
        engine.store().all_edges().map(|e| e.confidence).collect();
    edit(&mut engine, "a.py", "def util():\n    pass\n");
    // every edge that survived kept or raised its confidence
    let after_min = engine.store().all_edges().map(|e| e.confidence).min();
    let before_min = before.into_iter().min();
    assert!(after_min >= before_min);
}

// --- persistence across restarts ---

#[test]
fn test_restart_restores_graph_and_diffs_correctly() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("graph.json");
    {
        let mut engine = Engine::with_config(EngineConfig::default(), &snapshot).unwrap();
        edit(&mut engine, "a.py", "def util():\n    pass\n");
        edit(&mut engine, "b.py", "from a import util\ndef go():\n    util()\n");
        engine.shutdown().unwrap();
    }

    let mut engine = Engine::with_config(EngineConfig::default(), &snapshot).unwrap();
    assert_eq!(engine.store().node_count(), 3);
    assert!(engine.exports().contains_key("a.py"));

    // the per-file snapshots survive, so an identical edit is a no-op
    let report = edit(&mut engine, "a.py", "def util():\n    pass\n");
    assert_eq!(report.added + report.removed + report.modified + report.renamed, 0);
    verify_graph_integrity(engine.store());
}

#[test]
fn test_query_reflects_latest_edit() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def util():\n    pass\n");
    edit(&mut engine, "b.py", "from a import util\ndef go():\n    util()\n");
    let value = engine.query("callers", &["util".to_string()]);
    assert_eq!(value["status"], "ok");
    assert!(!value["references"].as_array().unwrap().is_empty());
    let value = engine.query("summary", &[]);
    assert_eq!(value["nodes"], 3);
    let value = engine.query("nonsense", &[]);
    assert_eq!(value["status"], "unknown_command");
}

#[test]
fn test_shutdown_refuses_further_work() {
    let (mut engine, _dir) = make_engine();
    edit(&mut engine, "a.py", "def util():\n    pass\n");
    engine.shutdown().unwrap();
    assert!(engine.process_change("a.py", Some("def x():\n    pass\n"), ChangeKind::Edit).is_err());
}

// --- propagation ---

#[test]
fn test_export_change_repropagates_dependents() {
    let (mut engine, _dir) = make_engine();
    // two files call a name that does not exist anywhere yet
    edit(&mut engine, "m.py", "def go():\n    shared()\n");
    edit(&mut engine, "n.py", "def run():\n    shared()\n");
    assert_eq!(engine.store().edges_to_unresolved("shared").len(), 2);

    // the definition appears; pass two resolves, possibly via propagation
    let report = edit(&mut engine, "lib.py", "def shared():\n    pass\n");
    assert!(report.promoted >= 2 || !report.propagated_files.is_empty());
    assert!(engine.store().edges_to_unresolved("shared").is_empty());
    for edge in engine.store().incoming_edges("lib.py::shared") {
        assert_eq!(edge.confidence, Confidence::Medium);
    }
    verify_graph_integrity(engine.store());
}

#[test]
fn test_propagation_respects_fanout_budget() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.propagation.max_fanout = 2;
    let mut engine = Engine::with_config(config, &dir.path().join("graph.json")).unwrap();

    for i in 0..5 {
        edit(&mut engine, &format!("dep{i}.py"), "def go():\n    shared()\n");
    }
    assert_eq!(engine.store().edges_to_unresolved("shared").len(), 5);
    let report = edit(&mut engine, "lib.py", "def shared():\n    pass\n");
    // pass two promotion is not budgeted, but any scheduled propagation is
    assert!(report.propagated_files.len() <= 2);
}
