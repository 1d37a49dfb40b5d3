//! Error taxonomy for the snapshot repository.
//!
//! Internal plumbing threads `anyhow::Error` around (as the rest of the
//! pack does), but every public entry point on [`crate::repository::SnapshotRepository`]
//! returns this enum so callers can match on the kind of failure without
//! downcasting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository is read-only")]
    ReadOnly,

    #[error("snapshot '{0}' already exists")]
    NameConflict(String),

    #[error("missing: {0}")]
    Missing(String),

    #[error("corrupt blob: {0}")]
    Corrupt(String),

    #[error("unsupported blob version {version} (supported range {min}..={max})")]
    UnsupportedVersion { version: u32, min: u32, max: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("repository '{name}': {source}")]
    Repository {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("verification failed at '{path}': {source}")]
    VerificationError {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("snapshot creation failed for '{0}': {1}")]
    SnapshotCreation(String, #[source] anyhow::Error),

    #[error("snapshot error for '{0}': {1}")]
    SnapshotError(String, #[source] anyhow::Error),

    #[error("repository is closed")]
    Closed,
}

impl RepositoryError {
    /// True for the "not found" atom backends and codecs use to signal a
    /// benign absence, as opposed to a real I/O or corruption failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::Missing(_))
            || matches!(self, RepositoryError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
