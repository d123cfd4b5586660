//! Cold-start project scan.
//!
//! Walks the project (gitignore-aware, hidden files skipped) and feeds each
//! supported file through `process_change`. Bounded by a file-count ceiling
//! and a wall-clock ceiling; files beyond either stay out of the graph
//! until they are edited.

use crate::bridge::{ChangeKind, Engine};
use anyhow::Result;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
pub struct ScanSummary {
    pub indexed: usize,
    pub skipped: usize,
    /// True when a ceiling cut the scan short.
    pub truncated: bool,
}

pub fn initial_scan(engine: &mut Engine, project_root: &Path) -> Result<ScanSummary> {
    let started = Instant::now();
    let deadline = Duration::from_millis(engine.config().scan.max_duration_ms);
    let max_files = engine.config().scan.max_files;
    let mut summary = ScanSummary::default();

    let walker = ignore::WalkBuilder::new(project_root)
        .hidden(true)
        .git_ignore(true)
        .build();

    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(project_root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if !engine.registry().handles(&rel) {
            summary.skipped += 1;
            continue;
        }
        if summary.indexed >= max_files || started.elapsed() >= deadline {
            summary.truncated = true;
            break;
        }
        let Ok(text) = std::fs::read_to_string(entry.path()) else {
            summary.skipped += 1;
            continue;
        };
        if engine.process_change(&rel, Some(&text), ChangeKind::Create).is_ok() {
            summary.indexed += 1;
        }
    }

    tracing::info!(
        indexed = summary.indexed,
        skipped = summary.skipped,
        truncated = summary.truncated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "initial scan complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carto_core::config::EngineConfig;

    fn engine_in(dir: &Path) -> Engine {
        Engine::with_config(EngineConfig::default(), &dir.join("graph.json")).unwrap()
    }

    #[test]
    fn test_scan_indexes_supported_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.py"), "def util():\n    pass\n").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "not code").unwrap();
        let state = tempfile::tempdir().unwrap();
        let mut engine = engine_in(state.path());
        let summary = initial_scan(&mut engine, tmp.path()).unwrap();
        assert_eq!(summary.indexed, 1);
        assert!(summary.skipped >= 1);
        assert_eq!(engine.store().nodes_in_file("a.py").len(), 1);
    }

    #[test]
    fn test_scan_respects_file_ceiling() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(tmp.path().join(format!("m{i}.py")), "def f():\n    pass\n").unwrap();
        }
        let state = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.scan.max_files = 2;
        let mut engine = Engine::with_config(config, &state.path().join("graph.json")).unwrap();
        let summary = initial_scan(&mut engine, tmp.path()).unwrap();
        assert_eq!(summary.indexed, 2);
        assert!(summary.truncated);
    }
}
