//! `Snapshot` summary (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShardFailure {
    pub index: String,
    pub shard: u32,
    pub node: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub name: String,
    pub uuid: String,
    pub indices: Vec<String>,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub failure_message: Option<String>,
    pub total_shards: u32,
    pub shard_failures: Vec<ShardFailure>,
    /// Determines which codec variant was used and gates format-specific
    /// reads (spec §4.3.3).
    pub version: u32,
}
