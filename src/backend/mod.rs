//! The blob backend contract (spec §4.1).
//!
//! A [`BlobBackend`] is an abstract key/value store over byte blobs,
//! organized into hierarchical [`Container`]s addressed by a slash-separated
//! path. This module specifies only the contract; the repository layers on
//! top never reach into backend internals.

use crate::error::{RepositoryError, Result};

mod filesystem;
mod memory;

pub use filesystem::FilesystemBackend;
pub use memory::MemoryBackend;

/// A single blob name within a container, e.g. `"snap-<uuid>.dat"`.
pub type BlobName = str;

/// Abstract hierarchical blob store.
///
/// Implementations must make `write` atomic with respect to readers:
/// a reader observes either the old blob, the new blob, or [`RepositoryError::Missing`],
/// never a partial write. Backends that cannot overwrite atomically must
/// implement `write` as write-temp + `move_blob`.
///
/// Concurrent operations on *distinct* blob names must be safe; concurrent
/// writes to the *same* name have unspecified winner semantics (the layer
/// above serializes same-name mutations per the single-coordinator
/// precondition).
pub trait BlobBackend: Send + Sync {
    /// Open (or address) a sub-container at `path` relative to this backend's root.
    fn container(&self, path: &str) -> Box<dyn Container>;
}

/// A container is a named group of blobs, analogous to a directory or
/// object-store prefix.
pub trait Container: Send + Sync {
    /// Probe for existence. Backends unable to implement this cheaply may
    /// return `Err(RepositoryError::Io(..))` with `ErrorKind::Unsupported`;
    /// callers must tolerate this and fall back to `read`.
    fn exists(&self, name: &BlobName) -> Result<bool>;

    /// Read a blob's full contents. Fails with `Missing` if absent.
    fn read(&self, name: &BlobName) -> Result<Vec<u8>>;

    /// Atomically (over)write a blob.
    fn write(&self, name: &BlobName, data: &[u8]) -> Result<()>;

    /// Idempotent delete; deleting a missing blob is `Ok(())`.
    fn delete(&self, name: &BlobName) -> Result<()>;

    /// List blob names under an optional prefix. Only required by
    /// verification and diagnostic tools; backends may return
    /// `RepositoryError::Io` with `ErrorKind::Unsupported`.
    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>>;

    /// Rename/move a blob within the same backend. Required by the
    /// verification protocol; may fail with `ErrorKind::Unsupported`.
    fn move_blob(&self, src: &BlobName, dst: &BlobName) -> Result<()>;

    /// Recursively delete everything under this container's own path.
    /// Used by verification scratch cleanup.
    fn delete_container(&self) -> Result<()>;

    /// Address a nested sub-container, e.g. `indices/<name>/<shard>/`.
    fn sub_container(&self, relative_path: &str) -> Box<dyn Container>;
}

/// Helper for backend implementations: turns a plain `std::io::Error` into
/// the distinguished `Missing` atom when it is a not-found error, otherwise
/// wraps it as `Io`.
pub(crate) fn map_io_error(err: std::io::Error, context: &str) -> RepositoryError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RepositoryError::Missing(context.to_string())
    } else {
        RepositoryError::Io(err)
    }
}
