//! `SnapshotId` (spec §3): `(name, uuid)`.

use serde::{Deserialize, Serialize};

/// Sentinel UUID used by legacy (pre-5.0-equivalent) index entries that
/// were written before snapshots carried a real UUID (spec §9 open
/// question: "the exact sentinel value is a repository-wide constant and
/// must be stable across reader versions").
pub const UNASSIGNED_UUID: &str = "unassigned";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotId {
    pub name: String,
    pub uuid: String,
}

impl SnapshotId {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }

    pub fn legacy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: UNASSIGNED_UUID.to_string(),
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.uuid == UNASSIGNED_UUID
    }

    /// The filename component used for blob names: the UUID for modern
    /// snapshots, the name for legacy ones (spec §3).
    pub fn blob_id(&self) -> &str {
        if self.is_legacy() {
            &self.name
        } else {
            &self.uuid
        }
    }
}

/// Equality and hashing are by `(name, uuid)`, per spec §3.
impl PartialEq for SnapshotId {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.uuid == other.uuid
    }
}
impl Eq for SnapshotId {}

impl std::hash::Hash for SnapshotId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.uuid.hash(state);
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.uuid)
    }
}
