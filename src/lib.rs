//! Blob-store-backed snapshot repository.
//!
//! A layered storage engine that persists point-in-time snapshots of a
//! sharded, segmented search index onto an opaque key/value blob backend
//! (local filesystem, object store, or network share). This crate owns
//! the repository's on-disk/on-blob layout and the protocols that
//! manipulate it — creating, finalizing, reading, listing, and deleting
//! snapshots, plus the rate-limited shard data path and the repository
//! verification protocol.
//!
//! What this crate does *not* do: walk segment files to build per-shard
//! manifests (that's the external index shard snapshotter, see
//! [`shard::ShardSnapshot`]), or serialize cluster coordination calls
//! ([`repository::SnapshotRepository`] assumes `initialize`/`finalize`/
//! `delete` against one snapshot name are already serialized by the
//! caller).
//!
//! Start at [`repository::SnapshotRepository`] for the public operations,
//! or [`repository::RepositoryHandle`] for the `created -> started ->
//! stopped -> closed` lifecycle wrapper.

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod rate_limiter;
pub mod repository;
pub mod shard;
pub mod snapshot;
pub mod snapshot_id;
pub mod snapshot_index;
pub mod verification;

pub use backend::{BlobBackend, Container, FilesystemBackend, MemoryBackend};
pub use config::RepositoryConfig;
pub use error::{RepositoryError, Result};
pub use metadata::{GlobalMetadata, IndexMetadata, MergedMetadata};
pub use repository::{RepositoryHandle, SnapshotRepository};
pub use shard::{ShardDataPath, ShardSnapshot};
pub use snapshot::{ShardFailure, Snapshot};
pub use snapshot_id::{SnapshotId, UNASSIGNED_UUID};
pub use verification::VerificationToken;
