//! Export the graph as a DOT (Graphviz) document.

use carto_core::entity::EntityKind;
use carto_core::graph::GraphStore;
use std::fmt::Write as _;

/// Render the node graph as DOT. Nodes are shaped by entity kind, edges
/// labeled by relationship kind; unresolved placeholder targets are drawn
/// dashed.
pub fn export_dot(store: &GraphStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph cartograph {{");
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(out, "  node [shape=box, fontsize=10];");
    let _ = writeln!(out);

    for node in store.all_nodes() {
        let shape = match node.entity.kind {
            EntityKind::Function => "ellipse",
            EntityKind::Class => "box",
            EntityKind::Variable => "note",
            EntityKind::Import => "cds",
            EntityKind::ModuleCode => "component",
        };
        let _ = writeln!(
            out,
            "  \"{}\" [shape={}, label=\"{}\\n{}\"];",
            node.id, shape, node.entity.name, node.entity.file_path
        );
    }
    let _ = writeln!(out);

    for edge in store.all_edges() {
        let style = if edge.is_unresolved() { ", style=dashed" } else { "" };
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"{}];",
            edge.source,
            edge.target,
            edge.kind.name(),
            style
        );
    }
    let _ = writeln!(out, "}}");
    out
}
