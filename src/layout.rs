//! Repository layout (spec §4.4, bit-exact filenames in spec §6.1).
//!
//! Centralizes every path-construction rule so the on-disk/on-blob
//! topology is derivable from one file, matching the documentation-heavy,
//! single-source-of-truth style of the teacher crate's datastore layout
//! comment block (`src/backup.rs`).
//!
//! ```text
//! <base_path>/
//!   index
//!   snap-<uuid>.dat
//!   meta-<uuid>.dat
//!   indices/<index-name>/meta-<uuid>.dat
//!   indices/<index-name>/<shard-id>/snap-<uuid>.dat
//!   indices/<index-name>/<shard-id>/__<segment-blob-id>
//!   tests-<random-seed>/master.dat
//! ```

pub const SNAPSHOT_INDEX_NAME: &str = "index";

pub fn snapshot_summary_filename(blob_id: &str) -> String {
    format!("snap-{}.dat", blob_id)
}

pub fn global_metadata_filename(blob_id: &str) -> String {
    format!("meta-{}.dat", blob_id)
}

pub fn index_metadata_filename(blob_id: &str) -> String {
    format!("meta-{}.dat", blob_id)
}

pub fn shard_manifest_filename(blob_id: &str) -> String {
    format!("snap-{}.dat", blob_id)
}

pub fn segment_blob_filename(segment_id: &str) -> String {
    format!("__{}", segment_id)
}

/// Legacy (pre-framed-codec) equivalents, per spec §4.4 / §6.1.
pub fn legacy_snapshot_filename(name: &str) -> String {
    format!("snapshot-{}", name)
}

pub fn legacy_metadata_filename(name: &str) -> String {
    format!("metadata-{}", name)
}

pub fn index_container_path(index_name: &str) -> String {
    format!("indices/{}", index_name)
}

pub fn shard_container_path(index_name: &str, shard_id: u32) -> String {
    format!("indices/{}/{}", index_name, shard_id)
}

pub fn verification_container_path(seed: &str) -> String {
    format!("tests-{}", seed)
}

pub const VERIFICATION_MASTER_NAME: &str = "master.dat";
pub const VERIFICATION_MASTER_TMP_NAME: &str = "master.dat-temp";
