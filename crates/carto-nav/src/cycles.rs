//! File-level circular dependency detection.

use carto_core::graph::GraphStore;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_count: usize,
    /// Each cycle as its sorted member files.
    pub cycles: Vec<Vec<String>>,
    pub summary: String,
}

/// Strongly connected components of the condensed file graph with more
/// than one member, or a single member with a self-loop.
pub fn detect_cycles(store: &GraphStore) -> CycleReport {
    let cycles: Vec<Vec<String>> = store
        .file_cycles()
        .into_iter()
        .map(|c| c.into_iter().collect())
        .collect();
    let summary = match cycles.len() {
        0 => "no circular file dependencies".to_string(),
        1 => format!("1 circular dependency involving {} file(s)", cycles[0].len()),
        n => {
            let files: usize = cycles.iter().map(Vec::len).sum();
            format!("{n} circular dependencies involving {files} file(s)")
        }
    };
    CycleReport {
        cycle_count: cycles.len(),
        cycles,
        summary,
    }
}
