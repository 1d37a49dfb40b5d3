//! Repository configuration (spec §6.4).
//!
//! A plain `serde`-deserializable struct, in the spirit of `but-next`'s
//! `config.rs` — simpler than the teacher's `SectionConfig`/`.cfg`-file
//! machinery (`src/config/datastore.rs`), since this crate is
//! backend-agnostic and not tied to a fixed system path like
//! `/etc/proxmox-backup/datastore.cfg`.

use serde::{Deserialize, Serialize};

fn default_bytes_per_sec() -> i64 {
    40 * 1024 * 1024 // 40 MiB/s
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Hierarchical path into the backend.
    pub base_path: String,

    /// Whether framed blob payloads are gzip-compressed.
    #[serde(default)]
    pub compress: bool,

    /// When set, segment blobs larger than this are split by the external
    /// shard writer. `None` disables chunking.
    #[serde(default)]
    pub chunk_size: Option<u64>,

    /// Byte rate for the snapshot (write) path. `<= 0` disables limiting.
    #[serde(default = "default_bytes_per_sec")]
    pub max_snapshot_bytes_per_sec: i64,

    /// Byte rate for the restore (read) path. `<= 0` disables limiting.
    #[serde(default = "default_bytes_per_sec")]
    pub max_restore_bytes_per_sec: i64,

    /// When true, every mutating operation is rejected.
    #[serde(default)]
    pub readonly: bool,
}

impl RepositoryConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            compress: false,
            chunk_size: None,
            max_snapshot_bytes_per_sec: default_bytes_per_sec(),
            max_restore_bytes_per_sec: default_bytes_per_sec(),
            readonly: false,
        }
    }

    pub fn readonly(mut self, value: bool) -> Self {
        self.readonly = value;
        self
    }

    pub fn compress(mut self, value: bool) -> Self {
        self.compress = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = RepositoryConfig::new("/tmp/repo");
        assert!(!cfg.compress);
        assert!(!cfg.readonly);
        assert_eq!(cfg.chunk_size, None);
        assert_eq!(cfg.max_snapshot_bytes_per_sec, 40 * 1024 * 1024);
        assert_eq!(cfg.max_restore_bytes_per_sec, 40 * 1024 * 1024);
    }

    #[test]
    fn deserializes_from_json_with_defaults() {
        let json = r#"{"base_path": "/data/repo"}"#;
        let cfg: RepositoryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.base_path, "/data/repo");
        assert_eq!(cfg.max_snapshot_bytes_per_sec, 40 * 1024 * 1024);
    }
}
