//! Shard data path (spec §2 "Shard Data Path", §4.6 "Shard writes
//! (external)").
//!
//! The index shard snapshotter that walks segment files and emits
//! per-shard blob manifests is an external collaborator (spec §1,
//! out of scope). This module specifies only the interface this layer
//! consumes: a manifest type plus rate-limited read/write helpers over a
//! shard's container, grounded in the teacher's [`crate::backend`]
//! `Container` contract and its `ReadChunk`-style reader abstraction
//! (`src/backup/read_chunk.rs`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::Container;
use crate::error::Result;
use crate::rate_limiter::{RateLimiter, ThrottleCounters};

/// Manifest listing the logical->physical segment-file mapping for one
/// shard of one snapshot, as emitted by the external shard snapshotter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShardSnapshot {
    pub index: String,
    pub shard: u32,
    /// Segment blob ids referenced by this shard, each stored under
    /// `__<segment-blob-id>` (spec §4.4/§6.1).
    pub segment_ids: Vec<String>,
}

/// Rate-limited handle the engine supplies to the external shard
/// snapshotter so it can write `snap-<uuid>.dat` manifests and
/// `__<segment-id>` blobs through the *snapshot* limiter, and a reader can
/// pull them back through the *restore* limiter.
pub struct ShardDataPath {
    snapshot_limiter: Option<Arc<RateLimiter>>,
    restore_limiter: Option<Arc<RateLimiter>>,
    counters: Arc<ThrottleCounters>,
}

impl ShardDataPath {
    pub fn new(
        snapshot_limiter: Option<Arc<RateLimiter>>,
        restore_limiter: Option<Arc<RateLimiter>>,
        counters: Arc<ThrottleCounters>,
    ) -> Self {
        Self {
            snapshot_limiter,
            restore_limiter,
            counters,
        }
    }

    /// Write a segment blob through the snapshot (write) limiter.
    pub fn write_segment(&self, container: &dyn Container, blob_name: &str, data: &[u8]) -> Result<()> {
        if let Some(limiter) = &self.snapshot_limiter {
            let paused = limiter.acquire(data.len() as u64);
            self.counters.add_snapshot_pause(paused);
        }
        container.write(blob_name, data)
    }

    /// Read a segment blob through the restore (read) limiter.
    pub fn read_segment(&self, container: &dyn Container, blob_name: &str) -> Result<Vec<u8>> {
        let data = container.read(blob_name)?;
        if let Some(limiter) = &self.restore_limiter {
            let paused = limiter.acquire(data.len() as u64);
            self.counters.add_restore_pause(paused);
        }
        Ok(data)
    }

    /// Delegate shard deletion: remove the per-shard manifest and every
    /// segment blob it references. Best-effort per spec §4.7 step 4d —
    /// callers are expected to log and continue past individual failures
    /// rather than abort the whole delete.
    pub fn delete_shard(
        &self,
        shard_container: &dyn Container,
        manifest_blob_name: &str,
        manifest: &ShardSnapshot,
    ) -> Vec<(String, Result<()>)> {
        let mut results = Vec::new();
        for seg in &manifest.segment_ids {
            let blob_name = format!("__{}", seg);
            let res = shard_container.delete(&blob_name);
            results.push((blob_name, res));
        }
        results.push((
            manifest_blob_name.to_string(),
            shard_container.delete(manifest_blob_name),
        ));
        results
    }
}
