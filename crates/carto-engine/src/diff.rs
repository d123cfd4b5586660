//! Minimal delta computation between the previous and new entity lists of
//! one file.
//!
//! Classification: matching `(kind, name)` with equal signature hashes is
//! unchanged; with different hashes it is modified in place. Among the
//! leftovers, an old/new pair of the same kind with equal structure hashes
//! and nearby positions is a rename. Whatever remains was removed or added.

use carto_core::entity::{Entity, EntityKind};
use std::collections::HashMap;

/// The four change buckets plus the untouched remainder (new side).
#[derive(Debug, Default)]
pub struct EntityDelta {
    pub added: Vec<Entity>,
    pub removed: Vec<Entity>,
    /// `(old, new)` pairs with the same name but changed signatures.
    pub modified: Vec<(Entity, Entity)>,
    /// `(old, new)` pairs recognized as renames.
    pub renamed: Vec<(Entity, Entity)>,
    pub unchanged: Vec<Entity>,
}

impl EntityDelta {
    /// True when the edit changed nothing structurally.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.renamed.is_empty()
    }
}

/// Compare old and new entity lists. `rename_window` is the maximum line
/// distance between an old and new definition for rename pairing.
pub fn diff_entities(old: &[Entity], new: &[Entity], rename_window: usize) -> EntityDelta {
    let mut delta = EntityDelta::default();

    let old_by_key: HashMap<(EntityKind, &str), &Entity> =
        old.iter().map(|e| ((e.kind, e.name.as_str()), e)).collect();
    let new_keys: HashMap<(EntityKind, &str), ()> =
        new.iter().map(|e| ((e.kind, e.name.as_str()), ())).collect();

    let mut only_new: Vec<&Entity> = Vec::new();
    for entity in new {
        match old_by_key.get(&(entity.kind, entity.name.as_str())) {
            Some(prev) if prev.signature_hash == entity.signature_hash => {
                delta.unchanged.push(entity.clone());
            }
            Some(prev) => {
                delta.modified.push(((*prev).clone(), entity.clone()));
            }
            None => only_new.push(entity),
        }
    }
    let mut only_old: Vec<&Entity> = old
        .iter()
        .filter(|e| !new_keys.contains_key(&(e.kind, e.name.as_str())))
        .collect();

    // Rename pairing: same kind, same structure hash, within the window.
    for entity in only_new {
        let matched = only_old.iter().position(|prev| {
            prev.kind == entity.kind
                && prev.structure_hash == entity.structure_hash
                && entity.line_start.abs_diff(prev.line_start) <= rename_window
        });
        match matched {
            Some(pos) => {
                let prev = only_old.remove(pos);
                delta.renamed.push((prev.clone(), entity.clone()));
            }
            None => delta.added.push(entity.clone()),
        }
    }
    delta.removed = only_old.into_iter().cloned().collect();
    delta
}
