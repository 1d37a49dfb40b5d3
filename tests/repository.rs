//! End-to-end scenarios and property tests against `MemoryBackend`,
//! following `spec.md` §8 (scenarios S1-S6, invariants 1-10).
//!
//! S1, S2, S3, S5, S6 are covered as unit tests alongside
//! `SnapshotRepository` itself (colocated `#[cfg(test)]`, since they only
//! need the repository type); this suite covers S4 (legacy read) plus the
//! cross-cutting invariants that are easier to express as black-box
//! sequences of repository calls.

use std::collections::HashMap;
use std::sync::Arc;

use snapshot_repository::codec::{BlobCodec, LegacyCodec};
use snapshot_repository::error::RepositoryError;
use snapshot_repository::{
    BlobBackend, Container, GlobalMetadata, IndexMetadata, MemoryBackend, RepositoryConfig,
    Snapshot, SnapshotId, SnapshotRepository,
};

fn repo(config: RepositoryConfig, backend: MemoryBackend) -> (SnapshotRepository, MemoryBackend) {
    let handle = backend.clone();
    (SnapshotRepository::new(config, Arc::new(backend)), handle)
}

fn new_repo() -> (SnapshotRepository, MemoryBackend) {
    repo(RepositoryConfig::new(""), MemoryBackend::new())
}

fn empty_meta() -> GlobalMetadata {
    GlobalMetadata::default()
}

/// S4 — legacy read: a repository pre-populated with an unframed
/// `snapshot-old` blob and a bare-name-array index entry is readable
/// through the legacy codec fallback.
#[test]
fn s4_legacy_read_falls_back_to_unframed_codec() {
    let (repo, backend) = new_repo();

    let legacy = Snapshot {
        name: "old".into(),
        uuid: SnapshotId::legacy("old").uuid,
        indices: vec!["idx-a".into()],
        start_time_ms: 10,
        end_time_ms: 20,
        failure_message: None,
        total_shards: 1,
        shard_failures: Vec::new(),
        version: 0,
    };
    let raw = BlobCodec::<Snapshot>::encode(&LegacyCodec::new(), &legacy).unwrap();
    let root = backend.container("");
    root.write("snapshot-old", &raw).unwrap();
    root.write("index", br#"{"snapshots": ["old"]}"#).unwrap();

    let id = SnapshotId::legacy("old");
    let read_back = repo.read_snapshot(&id).unwrap();
    assert_eq!(read_back.name, "old");
    assert_eq!(read_back.indices, vec!["idx-a".to_string()]);

    assert_eq!(repo.snapshots(), vec![id]);
}

/// Invariant 1 / property 1: for any sequence of initialize/finalize/
/// delete calls, `snapshots()` tracks the committed set exactly.
#[test]
fn committed_set_tracks_lifecycle_calls() {
    let (repo, _backend) = new_repo();

    let s1 = SnapshotId::new("s1", "U1");
    let s2 = SnapshotId::new("s2", "U2");

    repo.initialize(&s1, &[], &HashMap::new(), &empty_meta()).unwrap();
    repo.finalize(&s1, &[], 0, None, 0, Vec::new()).unwrap();
    assert_eq!(names(&repo), vec!["s1"]);

    repo.initialize(&s2, &[], &HashMap::new(), &empty_meta()).unwrap();
    repo.finalize(&s2, &[], 0, None, 0, Vec::new()).unwrap();
    assert_eq!(names(&repo), vec!["s1", "s2"]);

    repo.delete(&s1).unwrap();
    assert_eq!(names(&repo), vec!["s2"]);

    repo.delete(&s2).unwrap();
    assert!(names(&repo).is_empty());
}

fn names(repo: &SnapshotRepository) -> Vec<String> {
    repo.snapshots().into_iter().map(|id| id.name).collect()
}

/// Property 2: after finalize, `read_snapshot` returns the `indices`
/// passed to `initialize`.
#[test]
fn finalized_summary_preserves_indices() {
    let (repo, _backend) = new_repo();
    let id = SnapshotId::new("s1", "U1");
    let indices = vec!["idx-a".to_string(), "idx-b".to_string()];
    repo.initialize(&id, &indices, &HashMap::new(), &empty_meta()).unwrap();
    repo.finalize(&id, &indices, 5, None, 2, Vec::new()).unwrap();

    let read_back = repo.read_snapshot(&id).unwrap();
    assert_eq!(read_back.indices, indices);
}

/// Property 3: after delete, neither `snapshots()` nor `read_snapshot`
/// see the deleted name.
#[test]
fn deleted_snapshot_disappears_from_list_and_read() {
    let (repo, _backend) = new_repo();
    let id = SnapshotId::new("s1", "U1");
    repo.initialize(&id, &[], &HashMap::new(), &empty_meta()).unwrap();
    repo.finalize(&id, &[], 0, None, 0, Vec::new()).unwrap();

    repo.delete(&id).unwrap();
    assert!(names(&repo).is_empty());
    assert!(matches!(
        repo.read_snapshot(&id).unwrap_err(),
        RepositoryError::Missing(_)
    ));
}

/// Property 5: a finalize interrupted between the summary write and the
/// index update leaves the snapshot un-indexed; a later delete cleans up
/// the orphan without error.
#[test]
fn orphaned_summary_is_not_listed_and_deletes_cleanly() {
    let (repo, backend) = new_repo();
    let id = SnapshotId::new("s1", "U1");
    repo.initialize(&id, &[], &HashMap::new(), &empty_meta()).unwrap();

    // write the summary directly, bypassing the index update that would
    // normally follow it in `finalize` — simulates the crash window.
    let snapshot = Snapshot {
        name: id.name.clone(),
        uuid: id.uuid.clone(),
        indices: Vec::new(),
        start_time_ms: 0,
        end_time_ms: 0,
        failure_message: None,
        total_shards: 0,
        shard_failures: Vec::new(),
        version: 1,
    };
    let raw = BlobCodec::<Snapshot>::encode(
        &snapshot_repository::codec::FramedCodec::new(
            snapshot_repository::codec::CodecName::Snapshot,
            snapshot_repository::codec::VersionPolicy::default_policy(),
            false,
        ),
        &snapshot,
    )
    .unwrap();
    backend.container("").write("snap-U1.dat", &raw).unwrap();

    assert!(names(&repo).is_empty());
    repo.delete(&id).unwrap();
    assert!(names(&repo).is_empty());
    assert!(repo.read_snapshot(&id).unwrap_err().is_not_found());
}

/// Property 6: a delete interrupted between summary deletion and index
/// update still resolves to `Missing` on read, and a retried delete
/// converges `snapshots()`.
#[test]
fn delete_interrupted_before_index_rewrite_converges_on_retry() {
    let (repo, backend) = new_repo();
    let id = SnapshotId::new("s1", "U1");
    repo.initialize(&id, &[], &HashMap::new(), &empty_meta()).unwrap();
    repo.finalize(&id, &[], 0, None, 0, Vec::new()).unwrap();

    // simulate steps 4a complete, 4c not yet run: summary gone, index stale.
    backend.container("").delete("snap-U1.dat").unwrap();
    assert!(repo.read_snapshot(&id).unwrap_err().is_not_found());
    assert_eq!(names(&repo), vec!["s1"]);

    repo.delete(&id).unwrap();
    assert!(names(&repo).is_empty());
}

/// Property 7: a read-only repository never issues a write/delete/move —
/// observable as the backend's blob count staying at zero.
#[test]
fn readonly_repository_issues_no_backend_writes() {
    let (repo, backend) = repo(
        RepositoryConfig::new("").readonly(true),
        MemoryBackend::new(),
    );
    let id = SnapshotId::new("s1", "U1");

    assert!(repo.initialize(&id, &[], &HashMap::new(), &empty_meta()).is_err());
    assert!(repo.finalize(&id, &[], 0, None, 0, Vec::new()).is_err());
    assert!(repo.delete(&id).is_err());
    // read-only start_verification returns a null token rather than writing.
    assert!(repo.start_verification().unwrap().is_none());

    assert_eq!(backend.blob_count(), 0);
}

/// Property 9: corrupting any byte of a framed blob causes reads to fail
/// with `Corrupt`, never a silent misparse.
#[test]
fn corrupting_framed_summary_byte_is_corrupt_on_read() {
    let (repo, backend) = new_repo();
    let id = SnapshotId::new("s1", "U1");
    repo.initialize(&id, &[], &HashMap::new(), &empty_meta()).unwrap();
    repo.finalize(&id, &[], 0, None, 0, Vec::new()).unwrap();

    let root = backend.container("");
    let mut raw = root.read("snap-U1.dat").unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0xFF;
    root.write("snap-U1.dat", &raw).unwrap();

    let err = repo.read_snapshot(&id).unwrap_err();
    assert!(matches!(err, RepositoryError::SnapshotError(_, _)));
}

/// Initializing per-index metadata and later deleting it removes the
/// shard container contents through the per-index/per-shard best-effort
/// path (spec §4.7 step 4d).
#[test]
fn delete_removes_per_index_metadata_and_shard_blobs() {
    let (repo, backend) = new_repo();
    let id = SnapshotId::new("s1", "U1");

    let mut index_meta = HashMap::new();
    index_meta.insert(
        "idx-a".to_string(),
        IndexMetadata {
            num_shards: 1,
            settings: HashMap::new(),
            mappings: HashMap::new(),
        },
    );
    repo.initialize(&id, &["idx-a".to_string()], &index_meta, &empty_meta())
        .unwrap();

    // external shard snapshotter writes a manifest + one segment blob.
    let shard_container = repo.shard_container("idx-a", 0);
    let manifest = snapshot_repository::ShardSnapshot {
        index: "idx-a".into(),
        shard: 0,
        segment_ids: vec!["seg1".into()],
    };
    let manifest_raw = BlobCodec::<snapshot_repository::ShardSnapshot>::encode(
        &snapshot_repository::codec::FramedCodec::new(
            snapshot_repository::codec::CodecName::Snapshot,
            snapshot_repository::codec::VersionPolicy::default_policy(),
            false,
        ),
        &manifest,
    )
    .unwrap();
    shard_container.write("snap-U1.dat", &manifest_raw).unwrap();
    shard_container.write("__seg1", b"segment-bytes").unwrap();

    repo.finalize(&id, &["idx-a".to_string()], 0, None, 1, Vec::new()).unwrap();
    repo.delete(&id).unwrap();

    assert!(!backend.contains_path("indices/idx-a/meta-U1.dat"));
    assert!(!backend.contains_path("indices/idx-a/0/snap-U1.dat"));
    assert!(!backend.contains_path("indices/idx-a/0/__seg1"));
}

/// `read_snapshot_metadata` merges global and per-index metadata, and
/// `ignore_index_errors` degrades a missing index to a logged skip.
#[test]
fn read_snapshot_metadata_merges_and_tolerates_missing_index_when_asked() {
    let (repo, _backend) = new_repo();
    let id = SnapshotId::new("s1", "U1");

    let mut index_meta = HashMap::new();
    index_meta.insert(
        "idx-a".to_string(),
        IndexMetadata {
            num_shards: 3,
            settings: HashMap::new(),
            mappings: HashMap::new(),
        },
    );
    let global = GlobalMetadata {
        indices: vec!["idx-a".into()],
        settings: HashMap::new(),
    };
    repo.initialize(&id, &["idx-a".to_string()], &index_meta, &global).unwrap();
    repo.finalize(&id, &["idx-a".to_string()], 0, None, 3, Vec::new()).unwrap();

    let merged = repo
        .read_snapshot_metadata(&id, &["idx-a".to_string()], false)
        .unwrap();
    assert_eq!(merged.global.indices, vec!["idx-a".to_string()]);
    assert_eq!(merged.per_index["idx-a"].num_shards, 3);

    let err = repo
        .read_snapshot_metadata(&id, &["missing-idx".to_string()], false)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Missing(_)));

    let merged = repo
        .read_snapshot_metadata(&id, &["missing-idx".to_string()], true)
        .unwrap();
    assert!(!merged.per_index.contains_key("missing-idx"));
}
