//! JSON snapshot persistence for the graph store.
//!
//! One document per engine instance, written atomically (temp file +
//! rename). Loading is defensive: a schema-version or checksum mismatch, or
//! any parse error, yields a clean start instead of an error. Per-file
//! entity snapshots ride along so delta computation stays correct across
//! process restarts.

use crate::entity::Entity;
use crate::graph::{Edge, GraphStore, Node, store_from_parts};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read as _;
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 3;

/// Zstd magic bytes: 0x28 0xB5 0x2F 0xFD.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// The on-disk document.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotDoc {
    pub schema_version: u32,
    /// Epoch seconds.
    pub saved_at: i64,
    /// Short hash over the serialized graph content; detects truncation and
    /// hand-editing.
    pub checksum: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// file -> entities from its last extraction, for cross-restart diffs.
    pub file_snapshots: BTreeMap<String, Vec<Entity>>,
    /// file -> exported symbol names.
    pub exports: BTreeMap<String, BTreeSet<String>>,
}

/// Everything a restarted engine needs to resume.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub store: GraphStore,
    pub file_snapshots: BTreeMap<String, Vec<Entity>>,
    pub exports: BTreeMap<String, BTreeSet<String>>,
}

fn content_checksum(nodes: &[Node], edges: &[Edge]) -> Result<String> {
    let body = serde_json::to_string(&(nodes, edges)).context("failed to serialize checksum body")?;
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    Ok(format!("{:x}", hasher.finalize())[..16].to_string())
}

/// Serialize the graph and companion state to `path`, atomically.
pub fn save(
    path: &Path,
    store: &GraphStore,
    file_snapshots: &BTreeMap<String, Vec<Entity>>,
    exports: &BTreeMap<String, BTreeSet<String>>,
    compress: bool,
) -> Result<()> {
    let nodes: Vec<Node> = store.all_nodes().cloned().collect();
    let edges: Vec<Edge> = store.all_edges().cloned().collect();
    let doc = SnapshotDoc {
        schema_version: SCHEMA_VERSION,
        saved_at: chrono::Utc::now().timestamp(),
        checksum: content_checksum(&nodes, &edges)?,
        nodes,
        edges,
        file_snapshots: file_snapshots.clone(),
        exports: exports.clone(),
    };
    let json = serde_json::to_string(&doc).context("failed to serialize snapshot")?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    if compress {
        let compressed = zstd::encode_all(json.as_bytes(), 3).context("failed to compress snapshot")?;
        std::fs::write(&tmp, compressed)
    } else {
        std::fs::write(&tmp, json)
    }
    .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move snapshot into place at {}", path.display()))?;

    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Load a snapshot if one exists and is intact. Any corruption (bad JSON,
/// schema mismatch, checksum mismatch) logs a warning and returns `None` so
/// the caller cold-starts with an empty graph.
pub fn load(path: &Path) -> Result<Option<LoadedState>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let json = if raw.len() >= 4 && raw[..4] == ZSTD_MAGIC {
        let mut decoder = match zstd::Decoder::new(&raw[..]) {
            Ok(d) => d,
            Err(err) => {
                tracing::warn!(%err, "snapshot zstd header unreadable, starting clean");
                return Ok(None);
            }
        };
        let mut decompressed = String::new();
        if let Err(err) = decoder.read_to_string(&mut decompressed) {
            tracing::warn!(%err, "snapshot decompression failed, starting clean");
            return Ok(None);
        }
        decompressed
    } else {
        match String::from_utf8(raw) {
            Ok(s) => s,
            Err(_) => {
                tracing::warn!("snapshot is not valid UTF-8, starting clean");
                return Ok(None);
            }
        }
    };

    let doc: SnapshotDoc = match serde_json::from_str(&json) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(%err, "snapshot failed to parse, starting clean");
            return Ok(None);
        }
    };
    if doc.schema_version != SCHEMA_VERSION {
        tracing::warn!(
            found = doc.schema_version,
            expected = SCHEMA_VERSION,
            "snapshot schema version mismatch, starting clean"
        );
        return Ok(None);
    }
    match content_checksum(&doc.nodes, &doc.edges) {
        Ok(expected) if expected == doc.checksum => {}
        _ => {
            tracing::warn!("snapshot checksum mismatch, starting clean");
            return Ok(None);
        }
    }

    Ok(Some(LoadedState {
        store: store_from_parts(doc.nodes, doc.edges),
        file_snapshots: doc.file_snapshots,
        exports: doc.exports,
    }))
}
