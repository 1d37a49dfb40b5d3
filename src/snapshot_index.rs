//! Snapshot index (spec §4.5): the single authoritative blob listing
//! `(name, uuid)` pairs under the fixed name `index` at the repository
//! root.
//!
//! The index is **never rebuilt from a scan** of blob names: failed
//! deletes leave orphan blobs a scan would resurrect, and write-once
//! backends can't erase orphans at all.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::backend::Container;
use crate::error::Result;
use crate::layout::SNAPSHOT_INDEX_NAME;
use crate::snapshot_id::SnapshotId;

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    name: String,
    uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexDocument {
    snapshots: Vec<IndexEntry>,
}

/// Legacy pre-object-format index documents contain bare name strings
/// instead of `{name, uuid}` objects (spec §6.3). `serde_json::Value` lets
/// us distinguish the two shapes without a custom `Deserialize` impl.
#[derive(Debug, Deserialize)]
struct LegacyIndexDocument {
    snapshots: Vec<serde_json::Value>,
}

/// Read the snapshot index (spec §4.5 `read_snapshot_list`).
///
/// Tolerates `Unsupported` on `exists` by reading directly, and tolerates
/// any parse or I/O error by logging a warning and returning an empty map
/// — read-only repositories must not fail list operations because of a
/// transient index read error (spec §7).
pub fn read_snapshot_list(container: &dyn Container) -> HashMap<String, SnapshotId> {
    read_snapshot_order(container)
        .into_iter()
        .map(|id| (id.name.clone(), id))
        .collect()
}

/// Same source as [`read_snapshot_list`], but preserves the order snapshots
/// appear in the index blob (spec §4.8 `snapshots()`: "ordering is the
/// insertion order preserved by the index blob"). Duplicate names keep
/// their first occurrence.
pub fn read_snapshot_order(container: &dyn Container) -> Vec<SnapshotId> {
    let raw = match container.exists(SNAPSHOT_INDEX_NAME) {
        Ok(false) => return Vec::new(),
        Ok(true) | Err(_) => match container.read(SNAPSHOT_INDEX_NAME) {
            Ok(data) => data,
            Err(e) if e.is_not_found() => return Vec::new(),
            Err(e) => {
                warn!("failed to read snapshot index: {}", e);
                return Vec::new();
            }
        },
    };

    parse_index_document(&raw)
}

fn parse_index_document(raw: &[u8]) -> Vec<SnapshotId> {
    let ids: Vec<SnapshotId> = if let Ok(doc) = serde_json::from_slice::<IndexDocument>(raw) {
        doc.snapshots
            .into_iter()
            .map(|e| SnapshotId::new(e.name, e.uuid))
            .collect()
    } else if let Ok(doc) = serde_json::from_slice::<LegacyIndexDocument>(raw) {
        doc.snapshots
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .map(SnapshotId::legacy)
            .collect()
    } else {
        warn!("snapshot index blob is neither object nor bare-name format");
        Vec::new()
    };

    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.name.clone()))
        .collect()
}

/// Write the snapshot index (spec §4.5 `write_snapshot_list`).
///
/// Takes the ordered snapshot list rather than the lookup map returned by
/// [`read_snapshot_list`]: the index blob is the sole source of ordering
/// (spec §4.8 `snapshots()`), and a `HashMap`'s iteration order is not
/// insertion order, so rewriting from one would silently reshuffle the
/// list on every `finalize`/`delete`.
///
/// Callers hold the single-writer invariant (mutations against the same
/// repository are serialized by the coordinator); no compare-and-swap is
/// required. Deletes the existing blob before writing the new one, per
/// spec §4.5.
pub fn write_snapshot_list(container: &dyn Container, snapshots: &[SnapshotId]) -> Result<()> {
    let doc = IndexDocument {
        snapshots: snapshots
            .iter()
            .map(|id| IndexEntry {
                name: id.name.clone(),
                uuid: id.uuid.clone(),
            })
            .collect(),
    };
    let raw = serde_json::to_vec_pretty(&doc).expect("IndexDocument always serializes");

    // best-effort: absence is fine, any real failure surfaces from write()
    let _ = container.delete(SNAPSHOT_INDEX_NAME);
    container.write(SNAPSHOT_INDEX_NAME, &raw)
}
