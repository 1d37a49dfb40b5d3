//! `GlobalMetadata` and `IndexMetadata` (spec §3).
//!
//! Both are treated as opaque-but-typed value types with a stable `serde`
//! serialization, the same treatment the pack gives cluster/index metadata
//! (`but-next::manifest`, `AeroDB::backup::manifest`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cluster-wide metadata carried by a snapshot: the set of indices known
/// at snapshot time plus arbitrary cluster settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GlobalMetadata {
    pub indices: Vec<String>,
    pub settings: HashMap<String, String>,
}

/// Per-index settings and mappings, keyed by index name within a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IndexMetadata {
    pub num_shards: u32,
    pub settings: HashMap<String, String>,
    pub mappings: HashMap<String, String>,
}

/// Merged view produced by `read_snapshot_metadata` (spec §4.8): the
/// global metadata plus whichever per-index metadata could be resolved.
#[derive(Debug, Clone, Default)]
pub struct MergedMetadata {
    pub global: GlobalMetadata,
    pub per_index: HashMap<String, IndexMetadata>,
}
