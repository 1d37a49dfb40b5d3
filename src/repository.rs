//! Snapshot Lifecycle Engine (spec §4.6-§4.8, §4.10): the orchestration
//! layer that ties the backend contract, codecs, layout, rate limiter and
//! snapshot index together into `initialize`/`finalize`/`delete`/`read`/
//! `list`.
//!
//! Metadata writes during creation, and blob removals during deletion, go
//! in a fixed order chosen so a crash mid-operation never produces a
//! falsely "committed" snapshot (invariant #1, spec §3): finalize writes
//! the summary before the index; delete clears the summary before the
//! index.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use log::{debug, info, warn};

use crate::backend::{BlobBackend, Container};
use crate::codec::{BlobCodec, CodecName, CodecVariant, FramedCodec, LegacyCodec, VersionPolicy};
use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, Result};
use crate::layout::{
    global_metadata_filename, index_container_path, index_metadata_filename,
    legacy_metadata_filename, legacy_snapshot_filename, shard_container_path,
    shard_manifest_filename, snapshot_summary_filename,
};
use crate::metadata::{GlobalMetadata, IndexMetadata, MergedMetadata};
use crate::rate_limiter::{RateLimiter, ThrottleCounters};
use crate::shard::{ShardDataPath, ShardSnapshot};
use crate::snapshot::{Snapshot, ShardFailure};
use crate::snapshot_id::SnapshotId;
use crate::snapshot_index::{read_snapshot_list, read_snapshot_order, write_snapshot_list};
use crate::verification::{self, VerificationToken};

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn wrap_repository_error(name: &str, err: RepositoryError) -> RepositoryError {
    RepositoryError::Repository {
        name: name.to_string(),
        source: anyhow!(err),
    }
}

/// Probes `exists`, falling back to `read` when the backend reports
/// `Unsupported` on the probe itself (spec §9 "optional blob-exists
/// probe"): the not-found signal from `read` is authoritative either way.
/// Any other I/O failure propagates rather than being folded into a
/// present/absent guess (spec §7: "read paths propagate ... `Io`
/// directly").
fn blob_present(container: &dyn Container, name: &str) -> Result<bool> {
    match container.exists(name) {
        Ok(present) => Ok(present),
        Err(_) => match container.read(name) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        },
    }
}

/// A bound, running repository (spec §4.10 `started` state): the backend
/// is attached and codecs are initialized. Construct via
/// [`RepositoryHandle::start`] rather than directly in application code.
pub struct SnapshotRepository {
    config: RepositoryConfig,
    backend: Arc<dyn BlobBackend>,
    root: Arc<dyn Container>,
    policy: VersionPolicy,
    snapshot_codec: FramedCodec,
    metadata_codec: FramedCodec,
    index_metadata_codec: FramedCodec,
    legacy_codec: LegacyCodec,
    shard_data_path: ShardDataPath,
    throttle: Arc<ThrottleCounters>,
}

impl SnapshotRepository {
    pub fn new(config: RepositoryConfig, backend: Arc<dyn BlobBackend>) -> Self {
        let policy = VersionPolicy::default_policy();
        let root: Arc<dyn Container> = Arc::from(backend.container(&config.base_path));

        let snapshot_limiter = RateLimiter::new(config.max_snapshot_bytes_per_sec).map(Arc::new);
        let restore_limiter = RateLimiter::new(config.max_restore_bytes_per_sec).map(Arc::new);
        let throttle = Arc::new(ThrottleCounters::new());
        let shard_data_path =
            ShardDataPath::new(snapshot_limiter, restore_limiter, throttle.clone());

        Self {
            snapshot_codec: FramedCodec::new(CodecName::Snapshot, policy, config.compress),
            metadata_codec: FramedCodec::new(CodecName::Metadata, policy, config.compress),
            index_metadata_codec: FramedCodec::new(
                CodecName::IndexMetadata,
                policy,
                config.compress,
            ),
            legacy_codec: LegacyCodec::new(),
            policy,
            backend,
            root,
            shard_data_path,
            throttle,
            config,
        }
    }

    pub fn read_only(&self) -> bool {
        self.config.readonly
    }

    fn require_writable(&self) -> Result<()> {
        if self.config.readonly {
            Err(RepositoryError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Rate-limited handle the external shard snapshotter writes segment
    /// blobs and manifests through (spec §2 "Shard Data Path").
    pub fn shard_data_path(&self) -> &ShardDataPath {
        &self.shard_data_path
    }

    pub fn index_container(&self, index_name: &str) -> Box<dyn Container> {
        self.root.sub_container(&index_container_path(index_name))
    }

    pub fn shard_container(&self, index_name: &str, shard_id: u32) -> Box<dyn Container> {
        self.root
            .sub_container(&shard_container_path(index_name, shard_id))
    }

    pub fn snapshot_throttle_nanos(&self) -> u64 {
        self.throttle.snapshot_nanos()
    }

    pub fn restore_throttle_nanos(&self) -> u64 {
        self.throttle.restore_nanos()
    }

    // ---- §4.6 Snapshot Creation -----------------------------------------

    /// `initialize(id, indices, global_meta)` (spec §4.6). `index_metadata`
    /// supplies the per-index metadata written alongside each index's
    /// container; indices absent from the map get a default (empty) value.
    pub fn initialize(
        &self,
        id: &SnapshotId,
        indices: &[String],
        index_metadata: &HashMap<String, IndexMetadata>,
        global_meta: &GlobalMetadata,
    ) -> Result<()> {
        self.require_writable()?;

        let creation_err = |e: RepositoryError| RepositoryError::SnapshotCreation(id.name.clone(), anyhow!(e));

        // Name uniqueness (spec §3 invariant 2) is tracked by the
        // authoritative snapshot index, not by a per-UUID/legacy blob
        // probe: a conflicting `initialize` with a *different* uuid would
        // otherwise probe blob names that were never written and miss the
        // existing entry entirely.
        if read_snapshot_list(self.root.as_ref()).contains_key(&id.name) {
            return Err(RepositoryError::NameConflict(id.name.clone()));
        }

        let summary_name = snapshot_summary_filename(id.blob_id());
        let legacy_summary_name = legacy_snapshot_filename(&id.name);
        if blob_present(self.root.as_ref(), &summary_name).map_err(creation_err)?
            || blob_present(self.root.as_ref(), &legacy_summary_name).map_err(creation_err)?
        {
            return Err(RepositoryError::NameConflict(id.name.clone()));
        }

        let encoded = BlobCodec::<GlobalMetadata>::encode(&self.metadata_codec, global_meta)
            .map_err(creation_err)?;
        self.root
            .write(&global_metadata_filename(id.blob_id()), &encoded)
            .map_err(creation_err)?;

        for index in indices {
            let container = self.index_container(index);
            let meta = index_metadata.get(index).cloned().unwrap_or_default();
            let encoded =
                BlobCodec::<IndexMetadata>::encode(&self.index_metadata_codec, &meta)
                    .map_err(creation_err)?;
            container
                .write(&index_metadata_filename(id.blob_id()), &encoded)
                .map_err(creation_err)?;
        }

        debug!("initialized snapshot {}", id);
        Ok(())
    }

    /// `finalize(id, indices, start_time, failure?, total_shards,
    /// shard_failures) -> Snapshot` (spec §4.6). Writes the summary blob
    /// before updating the index, so a crash in between leaves an orphan
    /// summary rather than a phantom-committed snapshot.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        &self,
        id: &SnapshotId,
        indices: &[String],
        start_time_ms: i64,
        failure_message: Option<String>,
        total_shards: u32,
        shard_failures: Vec<ShardFailure>,
    ) -> Result<Snapshot> {
        self.require_writable()?;

        let snapshot = Snapshot {
            name: id.name.clone(),
            uuid: id.uuid.clone(),
            indices: indices.to_vec(),
            start_time_ms,
            end_time_ms: now_ms(),
            failure_message,
            total_shards,
            shard_failures,
            version: self.policy.current,
        };

        let encoded = BlobCodec::<Snapshot>::encode(&self.snapshot_codec, &snapshot)
            .map_err(|e| wrap_repository_error(&id.name, e))?;
        self.root
            .write(&snapshot_summary_filename(id.blob_id()), &encoded)
            .map_err(|e| wrap_repository_error(&id.name, e))?;

        let mut list = read_snapshot_order(self.root.as_ref());
        if !list.iter().any(|existing| existing.name == id.name) {
            list.push(id.clone());
            write_snapshot_list(self.root.as_ref(), &list)
                .map_err(|e| wrap_repository_error(&id.name, e))?;
        }

        info!("finalized snapshot {}", id);
        Ok(snapshot)
    }

    // ---- §4.7 Snapshot Deletion ------------------------------------------

    /// `delete(id)` (spec §4.7). Best-effort from the per-index/per-shard
    /// step onward: those failures are logged, not surfaced. Steps 4a-4c
    /// (summary, global metadata, index rewrite) surface as `Repository`.
    pub fn delete(&self, id: &SnapshotId) -> Result<()> {
        self.require_writable()?;

        let (indices, version) = self.recover_delete_context(id);

        // 4a: summary, 4b: global metadata — dual-codec if version unknown.
        self.delete_versioned(
            id,
            version,
            &snapshot_summary_filename(id.blob_id()),
            &legacy_snapshot_filename(&id.name),
        )?;
        self.delete_versioned(
            id,
            version,
            &global_metadata_filename(id.blob_id()),
            &legacy_metadata_filename(&id.name),
        )?;

        // 4c: index rewrite.
        let mut list = read_snapshot_order(self.root.as_ref());
        list.retain(|existing| existing.name != id.name);
        write_snapshot_list(self.root.as_ref(), &list)
            .map_err(|e| wrap_repository_error(&id.name, e))?;

        // 4d: per-index, per-shard best-effort cleanup.
        for index in &indices {
            self.delete_index_contents(id, index);
        }

        info!("deleted snapshot {}", id);
        Ok(())
    }

    /// Steps 2-3 of §4.7: recover `indices` and `version` from the summary
    /// before deleting it. `NotFound` or a parse failure both degrade to
    /// "unknown version, no indices to clean" rather than aborting.
    fn recover_delete_context(&self, id: &SnapshotId) -> (Vec<String>, Option<u32>) {
        match self.read_snapshot(id) {
            Ok(snapshot) => (snapshot.indices, Some(snapshot.version)),
            Err(e) if e.is_not_found() => {
                debug!("no snapshot summary for {} during delete; unknown version", id);
                (Vec::new(), None)
            }
            Err(e) => {
                warn!("failed to read snapshot summary for {} during delete: {}", id, e);
                (Vec::new(), None)
            }
        }
    }

    fn delete_versioned(
        &self,
        id: &SnapshotId,
        version: Option<u32>,
        framed_name: &str,
        legacy_name: &str,
    ) -> Result<()> {
        let wrap = |e: RepositoryError| wrap_repository_error(&id.name, e);
        match version.map(|v| self.policy.variant_for(v)) {
            Some(CodecVariant::Legacy) => self.root.delete(legacy_name).map_err(wrap),
            Some(CodecVariant::Framed) => self.root.delete(framed_name).map_err(wrap),
            None => {
                self.root.delete(framed_name).map_err(wrap)?;
                self.root.delete(legacy_name).map_err(wrap)
            }
        }
    }

    fn delete_index_contents(&self, id: &SnapshotId, index: &str) {
        let index_container = self.index_container(index);
        let meta_blob = index_metadata_filename(id.blob_id());

        let num_shards = match index_container.read(&meta_blob) {
            Ok(raw) => match BlobCodec::<IndexMetadata>::decode(&self.index_metadata_codec, &raw) {
                Ok(meta) => Some(meta.num_shards),
                Err(e) => {
                    warn!("failed to decode index metadata for {}/{}: {}", id, index, e);
                    None
                }
            },
            Err(e) => {
                warn!("failed to read index metadata for {}/{}: {}", id, index, e);
                None
            }
        };

        if let Err(e) = index_container.delete(&meta_blob) {
            warn!("failed to delete index metadata blob for {}/{}: {}", id, index, e);
        }

        let Some(num_shards) = num_shards else { return };

        for shard in 0..num_shards {
            let shard_container = self.shard_container(index, shard);
            let manifest_name = shard_manifest_filename(id.blob_id());
            let manifest = match shard_container.read(&manifest_name) {
                Ok(raw) => BlobCodec::<ShardSnapshot>::decode(&self.snapshot_codec, &raw)
                    .unwrap_or_default(),
                Err(e) => {
                    if !e.is_not_found() {
                        warn!(
                            "failed to read shard manifest for {}/{} shard {}: {}",
                            id, index, shard, e
                        );
                    }
                    ShardSnapshot::default()
                }
            };

            for (blob_name, res) in self.shard_data_path.delete_shard(
                shard_container.as_ref(),
                &manifest_name,
                &manifest,
            ) {
                if let Err(e) = res {
                    warn!(
                        "failed to delete shard blob {} for {}/{} shard {}: {}",
                        blob_name, id, index, shard, e
                    );
                }
            }
        }
    }

    // ---- §4.8 Snapshot Read & List ----------------------------------------

    /// `read_snapshot(id)` (spec §4.8): framed codec first, legacy fallback
    /// on `NotFound` only. Any other error, or `Corrupt`, propagates.
    pub fn read_snapshot(&self, id: &SnapshotId) -> Result<Snapshot> {
        let framed_name = snapshot_summary_filename(id.blob_id());
        match self.root.read(&framed_name) {
            Ok(raw) => BlobCodec::<Snapshot>::decode(&self.snapshot_codec, &raw)
                .map_err(|e| RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
            Err(e) if e.is_not_found() => self.read_legacy_snapshot(id),
            Err(e) => Err(RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
        }
    }

    fn read_legacy_snapshot(&self, id: &SnapshotId) -> Result<Snapshot> {
        let legacy_name = legacy_snapshot_filename(&id.name);
        match self.root.read(&legacy_name) {
            Ok(raw) => BlobCodec::<Snapshot>::decode(&self.legacy_codec, &raw)
                .map_err(|e| RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
            Err(e) if e.is_not_found() => Err(RepositoryError::Missing(id.name.clone())),
            Err(e) => Err(RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
        }
    }

    fn read_global_metadata(&self, id: &SnapshotId) -> Result<GlobalMetadata> {
        let framed_name = global_metadata_filename(id.blob_id());
        match self.root.read(&framed_name) {
            Ok(raw) => BlobCodec::<GlobalMetadata>::decode(&self.metadata_codec, &raw)
                .map_err(|e| RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
            Err(e) if e.is_not_found() => {
                let legacy_name = legacy_metadata_filename(&id.name);
                match self.root.read(&legacy_name) {
                    Ok(raw) => BlobCodec::<GlobalMetadata>::decode(&self.legacy_codec, &raw)
                        .map_err(|e| RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
                    Err(e) if e.is_not_found() => Err(RepositoryError::Missing(id.name.clone())),
                    Err(e) => Err(RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
                }
            }
            Err(e) => Err(RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))),
        }
    }

    /// `read_snapshot_metadata(id, indices, ignore_index_errors)` (spec
    /// §4.8). `ignore_index_errors` is set only from deletion: a single
    /// index's failure is logged and skipped rather than propagated.
    pub fn read_snapshot_metadata(
        &self,
        id: &SnapshotId,
        indices: &[String],
        ignore_index_errors: bool,
    ) -> Result<MergedMetadata> {
        let global = self.read_global_metadata(id)?;
        let mut merged = MergedMetadata {
            global,
            per_index: HashMap::new(),
        };

        for index in indices {
            match self.read_index_metadata(id, index) {
                Ok(meta) => {
                    merged.per_index.insert(index.clone(), meta);
                }
                Err(e) if ignore_index_errors => {
                    warn!("ignoring index metadata error for {}/{}: {}", id, index, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(merged)
    }

    fn read_index_metadata(&self, id: &SnapshotId, index: &str) -> Result<IndexMetadata> {
        let container = self.index_container(index);
        let raw = container
            .read(&index_metadata_filename(id.blob_id()))
            .map_err(|e| {
                if e.is_not_found() {
                    RepositoryError::Missing(format!("{}/{}", id.name, index))
                } else {
                    RepositoryError::SnapshotError(id.name.clone(), anyhow!(e))
                }
            })?;
        BlobCodec::<IndexMetadata>::decode(&self.index_metadata_codec, &raw)
            .map_err(|e| RepositoryError::SnapshotError(id.name.clone(), anyhow!(e)))
    }

    /// `snapshots()` (spec §4.8): ordered list, insertion order preserved
    /// by the index blob.
    pub fn snapshots(&self) -> Vec<SnapshotId> {
        read_snapshot_order(self.root.as_ref())
    }

    /// `resolve(names)` (spec §4.8): every unresolved name is `Missing`.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<SnapshotId>> {
        let list = read_snapshot_list(self.root.as_ref());
        names
            .iter()
            .map(|name| {
                list.get(name)
                    .cloned()
                    .ok_or_else(|| RepositoryError::Missing(name.clone()))
            })
            .collect()
    }

    // ---- §4.9 Verification Protocol ---------------------------------------

    /// `start_verification()` (spec §4.9): a null token on a read-only
    /// repository (nothing to verify from the writer side).
    pub fn start_verification(&self) -> Result<Option<VerificationToken>> {
        if self.read_only() {
            return Ok(None);
        }
        verification::start_verification(self.backend.as_ref()).map(Some)
    }

    /// `end_verification(token)` (spec §4.9). Calling this on a read-only
    /// repository is a caller error, surfaced as `ReadOnly` rather than a
    /// panic.
    pub fn end_verification(&self, token: &VerificationToken) -> Result<()> {
        self.require_writable()?;
        verification::end_verification(self.backend.as_ref(), token)
    }
}

/// Repository lifecycle (spec §4.10): `created -> started -> stopped ->
/// closed`. Consuming transitions make operating on a closed repository a
/// type-level non-issue everywhere except the one place a stale handle can
/// still be held across a `close()` — there, `Closed` is returned instead
/// of panicking.
pub enum RepositoryHandle {
    Created(RepositoryConfig),
    Started(SnapshotRepository),
    Stopped(SnapshotRepository),
    Closed,
}

impl RepositoryHandle {
    pub fn new(config: RepositoryConfig) -> Self {
        RepositoryHandle::Created(config)
    }

    /// Bind the blob backend and initialize codecs.
    pub fn start(self, backend: Arc<dyn BlobBackend>) -> Result<Self> {
        match self {
            RepositoryHandle::Created(config) => {
                Ok(RepositoryHandle::Started(SnapshotRepository::new(config, backend)))
            }
            RepositoryHandle::Stopped(repo) => Ok(RepositoryHandle::Started(repo)),
            RepositoryHandle::Started(repo) => Ok(RepositoryHandle::Started(repo)),
            RepositoryHandle::Closed => Err(RepositoryError::Closed),
        }
    }

    pub fn stop(self) -> Result<Self> {
        match self {
            RepositoryHandle::Started(repo) => Ok(RepositoryHandle::Stopped(repo)),
            RepositoryHandle::Closed => Err(RepositoryError::Closed),
            other => Ok(other),
        }
    }

    pub fn close(self) -> Self {
        RepositoryHandle::Closed
    }

    pub fn repository(&self) -> Result<&SnapshotRepository> {
        match self {
            RepositoryHandle::Started(repo) => Ok(repo),
            RepositoryHandle::Closed => Err(RepositoryError::Closed),
            RepositoryHandle::Created(_) | RepositoryHandle::Stopped(_) => {
                Err(RepositoryError::Repository {
                    name: "handle".into(),
                    source: anyhow!("repository not started"),
                })
            }
        }
    }
}
