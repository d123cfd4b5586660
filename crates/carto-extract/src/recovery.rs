//! Partial recovery for transiently unparseable Python files.
//!
//! Mid-edit states often break only a small region of a file. This variant
//! binary-searches for a minimal line range whose blanking yields a clean
//! parse, then extracts entities from the reduced source. Blanked lines are
//! replaced with empty lines, so surviving entities keep their true line
//! numbers. Recovered entities carry medium confidence.

use crate::{Extraction, ParseStatus, python};
use carto_core::entity::Confidence;

/// Attempt reduction and extraction. Returns `ParseStatus::Failed` when no
/// blanking produces a clean parse (the caller keeps its previous state).
pub(crate) fn recover(source: &str, file_path: &str) -> Extraction {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return Extraction {
            entities: Vec::new(),
            status: ParseStatus::Failed,
        };
    }

    let blank = |lo: usize, hi: usize| -> String {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| if i >= lo && i < hi { "" } else { *line })
            .collect::<Vec<_>>()
            .join("\n")
    };

    // Invariant: blanking [lo, hi) parses clean. The whole-file blanking is
    // an empty module, so the search always starts valid.
    let mut lo = 0;
    let mut hi = lines.len();
    if parse_clean(&blank(lo, hi)).is_none() {
        return Extraction {
            entities: Vec::new(),
            status: ParseStatus::Failed,
        };
    }
    loop {
        if hi - lo <= 1 {
            break;
        }
        let mid = lo + (hi - lo) / 2;
        if parse_clean(&blank(lo, mid)).is_some() {
            hi = mid;
        } else if parse_clean(&blank(mid, hi)).is_some() {
            lo = mid;
        } else {
            // Damage on both sides of the midpoint; keep the current range.
            break;
        }
    }

    let reduced = blank(lo, hi);
    let Some(tree) = parse_clean(&reduced) else {
        return Extraction {
            entities: Vec::new(),
            status: ParseStatus::Failed,
        };
    };

    tracing::debug!(
        file = file_path,
        blanked_from = lo + 1,
        blanked_to = hi,
        "recovered entities from reduced source"
    );

    let mut entities = python::extract_module(&tree.root_node(), &reduced, file_path);
    for entity in &mut entities {
        entity.confidence = Confidence::Medium;
    }
    Extraction {
        entities,
        status: ParseStatus::Recovered,
    }
}

fn parse_clean(source: &str) -> Option<tree_sitter::Tree> {
    python::parse(source).filter(|tree| !tree.root_node().has_error())
}
