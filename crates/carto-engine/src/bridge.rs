//! The incremental bridge: one edit in, a patched graph and a structured
//! event report out.
//!
//! `process_change` is atomic with respect to queries: it runs extract →
//! diff → patch → resolve → propagate to completion (propagation drained
//! up to its bound) before returning, then checkpoints the snapshot. Every
//! failure inside the pipeline degrades to a warning on the report; the
//! engine never aborts a session.

use crate::diff::{EntityDelta, diff_entities};
use crate::propagate::Propagator;
use crate::resolve::{defined_names, promote_unresolved, resolve_file};
use crate::scan;
use anyhow::{Context, Result};
use carto_core::config::{self, EngineConfig};
use carto_core::entity::{Entity, EntityKind};
use carto_core::graph::{GraphStore, Node, node_id};
use carto_core::snapshot;
use carto_extract::{ParseStatus, Registry};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// What happened to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Edit,
    Create,
    Delete,
}

/// A non-fatal condition surfaced by `process_change`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The edit closed a new file-level dependency cycle.
    CycleIntroduced { files: Vec<String> },
    /// A function or class lost its last caller.
    NewlyDead { node: String },
    /// A public entity's parameter list lost or reordered arguments.
    BreakingChange {
        node: String,
        missing_params: Vec<String>,
    },
    /// The file could not be parsed, even with recovery; its previous
    /// entities were retained.
    ParseFailed { file: String },
    /// Propagation work beyond the fan-out budget was dropped.
    PropagationTruncated { dropped: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::CycleIntroduced { files } => {
                write!(f, "new dependency cycle: {}", files.join(" -> "))
            }
            Warning::NewlyDead { node } => write!(f, "no remaining references to {node}"),
            Warning::BreakingChange { node, missing_params } => {
                write!(f, "breaking change in {node} (params: {})", missing_params.join(", "))
            }
            Warning::ParseFailed { file } => write!(f, "could not parse {file}"),
            Warning::PropagationTruncated { dropped } => {
                write!(f, "propagation budget exceeded, {dropped} file(s) deferred")
            }
        }
    }
}

/// Structured event report returned from every `process_change` call.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ChangeReport {
    pub file: String,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub renamed: usize,
    pub edges_rebuilt: usize,
    pub promoted: usize,
    pub propagated_files: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// The engine rejects work only after shutdown.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine has been shut down")]
    Closed,
}

/// The long-lived engine instance: graph store, per-file entity snapshots,
/// exported-symbol sets, and the extractor registry.
///
/// The engine is single-threaded by design. It is `Send`, so a host that
/// calls in from several threads serializes everything behind one mutex;
/// edits and queries then alternate, with each edit draining its
/// propagation before the lock is released.
pub struct Engine {
    store: GraphStore,
    file_snapshots: BTreeMap<String, Vec<Entity>>,
    exports: BTreeMap<String, BTreeSet<String>>,
    registry: Registry,
    config: EngineConfig,
    snapshot_file: PathBuf,
    closed: bool,
}

impl Engine {
    /// Load-or-scan startup for a project root: restores the snapshot when
    /// one is intact, otherwise walks the project within the scan ceilings.
    pub fn open(project_root: &Path) -> Result<Self> {
        let root = config::config_root();
        let cfg = EngineConfig::load(&root).context("failed to load engine config")?;
        let snapshot_file = config::snapshot_path(&root, project_root);
        let mut engine = Self::with_config(cfg, &snapshot_file)?;
        if engine.store.node_count() == 0 {
            scan::initial_scan(&mut engine, project_root)?;
        }
        Ok(engine)
    }

    /// Build an engine with explicit config and snapshot location. Restores
    /// state from the snapshot if present; does not scan.
    pub fn with_config(config: EngineConfig, snapshot_file: &Path) -> Result<Self> {
        let loaded = snapshot::load(snapshot_file)?.unwrap_or_default();
        Ok(Engine {
            store: loaded.store,
            file_snapshots: loaded.file_snapshots,
            exports: loaded.exports,
            registry: Registry::with_default_extractors(),
            config,
            snapshot_file: snapshot_file.to_path_buf(),
            closed: false,
        })
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn exports(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.exports
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Apply one file change to the graph. `new_text` of `None` is treated
    /// as a delete regardless of `kind` (missing file on edit).
    pub fn process_change(
        &mut self,
        file_path: &str,
        new_text: Option<&str>,
        kind: ChangeKind,
    ) -> Result<ChangeReport, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        let mut report = ChangeReport {
            file: file_path.to_string(),
            ..ChangeReport::default()
        };

        let text = match new_text {
            Some(text) if kind != ChangeKind::Delete => text,
            _ => {
                self.remove_file(file_path, &mut report);
                self.checkpoint();
                return Ok(report);
            }
        };

        let Some(extractor) = self.registry.for_path(file_path) else {
            return Ok(report);
        };
        let extraction = extractor.extract(text, file_path);
        let previous = self.file_snapshots.get(file_path).cloned().unwrap_or_default();
        let total_failure = extraction.status == ParseStatus::Failed
            || (extraction.status == ParseStatus::Recovered
                && extraction.entities.is_empty()
                && !previous.is_empty());
        if total_failure {
            tracing::warn!(file = file_path, "extraction failed, keeping previous entities");
            report.warnings.push(Warning::ParseFailed {
                file: file_path.to_string(),
            });
            return Ok(report);
        }
        let new_entities = extraction.entities;

        let delta = diff_entities(&previous, &new_entities, self.config.diff.rename_window);
        report.added = delta.added.len();
        report.removed = delta.removed.len();
        report.modified = delta.modified.len();
        report.renamed = delta.renamed.len();

        // Captured before patching so the warning pass can compare.
        let cycles_before: HashSet<BTreeSet<String>> =
            self.store.file_cycles().into_iter().collect();
        let had_incoming: Vec<String> = self
            .store
            .all_nodes()
            .filter(|n| self.store.in_degree(&n.id) > 0)
            .map(|n| n.id.clone())
            .collect();
        let exports_before = self.exports.get(file_path).cloned().unwrap_or_default();

        self.patch_nodes(file_path, &delta);

        // All edges sourced from this file are recreated from scratch.
        self.store.remove_edges_from_file(file_path);
        report.edges_rebuilt = resolve_file(&mut self.store, file_path, &new_entities);

        // Pass two: names that just appeared may resolve old placeholders.
        let mut changed_names = defined_names(&delta.added);
        changed_names.extend(defined_names(
            &delta.renamed.iter().map(|(_, new)| new.clone()).collect::<Vec<_>>(),
        ));
        report.promoted = promote_unresolved(&mut self.store, &changed_names);

        let exports_after = exported_symbols(&new_entities);
        if exports_after != exports_before {
            self.propagate(file_path, &delta, &exports_before, &exports_after, &mut report);
        }
        self.exports.insert(file_path.to_string(), exports_after);
        self.file_snapshots.insert(file_path.to_string(), new_entities);

        self.collect_warnings(file_path, &delta, &exports_before, &cycles_before, &had_incoming, &mut report);
        self.checkpoint();
        Ok(report)
    }

    /// Run a named read-only query; see the `carto-nav` modules for the
    /// individual report shapes. Unknown commands and bad arguments come
    /// back as an error value, never an `Err`.
    pub fn query(&self, command: &str, args: &[String]) -> serde_json::Value {
        let ctx = carto_nav::dispatch::QueryContext {
            store: &self.store,
            exports: &self.exports,
            config: &self.config.query,
        };
        carto_nav::dispatch::run(&ctx, command, args)
    }

    /// Flush a final snapshot and refuse further work.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        self.closed = true;
        Ok(())
    }

    /// Write the snapshot now.
    pub fn flush(&self) -> Result<()> {
        snapshot::save(
            &self.snapshot_file,
            &self.store,
            &self.file_snapshots,
            &self.exports,
            self.config.storage.compress,
        )
    }

    fn checkpoint(&self) {
        if let Err(err) = self.flush() {
            tracing::warn!(%err, "checkpoint failed");
        }
    }

    fn remove_file(&mut self, file_path: &str, report: &mut ChangeReport) {
        self.store.remove_edges_from_file(file_path);
        let ids: Vec<String> = self
            .store
            .nodes_in_file(file_path)
            .iter()
            .map(|n| n.id.clone())
            .collect();
        report.removed = ids.len();
        for id in ids {
            self.store.remove_node(&id);
        }
        self.file_snapshots.remove(file_path);
        self.exports.remove(file_path);
        tracing::debug!(file = file_path, removed = report.removed, "file removed from graph");
    }

    /// Apply the delta buckets to the node set. Edges are handled by the
    /// caller.
    fn patch_nodes(&mut self, file_path: &str, delta: &EntityDelta) {
        let now = chrono::Utc::now();
        for entity in &delta.removed {
            self.store.remove_node(&node_id(file_path, &entity.name));
        }
        for (old, new) in &delta.renamed {
            let old_id = node_id(file_path, &old.name);
            if let Some(new_id) = self.store.rename_node(&old_id, &new.name)
                && let Some(node) = self.store.node_mut(&new_id)
            {
                node.entity = new.clone();
                node.last_seen = now;
                node.confidence = new.confidence;
            }
        }
        for (_, new) in &delta.modified {
            let id = node_id(file_path, &new.name);
            match self.store.node_mut(&id) {
                Some(node) => {
                    node.entity = new.clone();
                    node.last_seen = now;
                    node.confidence = new.confidence;
                }
                None => self.store.insert_node(Node::from_entity(new.clone(), now)),
            }
        }
        for entity in &delta.added {
            self.store.insert_node(Node::from_entity(entity.clone(), now));
        }
        for entity in &delta.unchanged {
            if let Some(node) = self.store.node_mut(&node_id(file_path, &entity.name)) {
                node.last_seen = now;
                node.confidence = entity.confidence;
            }
        }
    }

    /// Re-resolve the files most likely affected by an export change.
    /// Propagated files are edge-only: their cached entities are reused,
    /// nothing is re-parsed.
    fn propagate(
        &mut self,
        file_path: &str,
        delta: &EntityDelta,
        before: &BTreeSet<String>,
        after: &BTreeSet<String>,
        report: &mut ChangeReport,
    ) {
        let mut affected_names: BTreeSet<String> =
            before.symmetric_difference(after).cloned().collect();
        for (old, _) in &delta.renamed {
            affected_names.insert(old.bare_name().to_string());
        }

        let mut propagator = Propagator::new(&self.config.propagation);
        for name in &affected_names {
            let mut sources: BTreeSet<String> = self
                .store
                .edges_to_unresolved(name)
                .iter()
                .map(|e| e.source_file.clone())
                .collect();
            for id in self.store.ids_with_bare_name(name) {
                if !id.starts_with(&format!("{file_path}::")) {
                    continue;
                }
                for edge in self.store.incoming_edges(&id) {
                    if edge.confidence == carto_core::entity::Confidence::Low {
                        sources.insert(edge.source_file.clone());
                    }
                }
            }
            for source in sources {
                if source != file_path {
                    propagator.schedule(1, &source);
                }
            }
        }

        while let Some(item) = propagator.pop() {
            let Some(cached) = self.file_snapshots.get(&item.file).cloned() else {
                continue;
            };
            self.store.remove_edges_from_file(&item.file);
            resolve_file(&mut self.store, &item.file, &cached);
            report.propagated_files.push(item.file.clone());
            if item.depth < self.config.propagation.max_depth {
                for rdep in self.store.file_rdeps(&item.file) {
                    if rdep != file_path {
                        propagator.schedule(item.depth + 1, &rdep);
                    }
                }
            }
        }
        if propagator.dropped() > 0 {
            report.warnings.push(Warning::PropagationTruncated {
                dropped: propagator.dropped(),
            });
        }
    }

    fn collect_warnings(
        &self,
        file_path: &str,
        delta: &EntityDelta,
        exports_before: &BTreeSet<String>,
        cycles_before: &HashSet<BTreeSet<String>>,
        had_incoming: &[String],
        report: &mut ChangeReport,
    ) {
        for component in self.store.file_cycles() {
            if component.contains(file_path) && !cycles_before.contains(&component) {
                report.warnings.push(Warning::CycleIntroduced {
                    files: component.into_iter().collect(),
                });
            }
        }

        for id in had_incoming {
            let Some(node) = self.store.node(id) else {
                continue;
            };
            if self.store.in_degree(id) == 0
                && matches!(node.entity.kind, EntityKind::Function | EntityKind::Class)
                && !node.entity.exported
            {
                report.warnings.push(Warning::NewlyDead { node: id.clone() });
            }
        }

        for (old, new) in &delta.modified {
            let public = old.exported || exports_before.contains(&old.name);
            if !public {
                continue;
            }
            let missing: Vec<String> =
                old.params.iter().filter(|p| !new.params.contains(p)).cloned().collect();
            let kept_old: Vec<&String> =
                old.params.iter().filter(|p| new.params.contains(*p)).collect();
            let kept_new: Vec<&String> =
                new.params.iter().filter(|p| old.params.contains(*p)).collect();
            let reordered = kept_old != kept_new;
            if !missing.is_empty() || reordered {
                report.warnings.push(Warning::BreakingChange {
                    node: node_id(file_path, &new.name),
                    missing_params: missing,
                });
            }
        }
    }
}

/// A file's exported-symbol set: explicitly marked names when the file has
/// any marker, otherwise every top-level definition.
pub fn exported_symbols(entities: &[Entity]) -> BTreeSet<String> {
    let marked: BTreeSet<String> = entities
        .iter()
        .filter(|e| e.exported)
        .map(|e| e.name.clone())
        .collect();
    if !marked.is_empty() {
        return marked;
    }
    entities
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                EntityKind::Function | EntityKind::Class | EntityKind::Variable
            )
        })
        .filter(|e| !e.name.contains('.'))
        .map(|e| e.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: EntityKind, name: &str, exported: bool) -> Entity {
        let mut e = Entity::new(kind, name, "a.py", 1, 2, name);
        e.exported = exported;
        e
    }

    #[test]
    fn test_exported_symbols_fallback_all_top_level() {
        let entities = vec![
            entity(EntityKind::Function, "go", false),
            entity(EntityKind::Function, "Box.run", false),
            entity(EntityKind::Class, "Box", false),
            entity(EntityKind::Import, "os", false),
        ];
        assert_eq!(
            exported_symbols(&entities),
            BTreeSet::from(["go".to_string(), "Box".to_string()])
        );
    }

    #[test]
    fn test_exported_symbols_explicit_markers_win() {
        let entities = vec![
            entity(EntityKind::Function, "go", true),
            entity(EntityKind::Function, "hidden", false),
        ];
        assert_eq!(exported_symbols(&entities), BTreeSet::from(["go".to_string()]));
    }
}
