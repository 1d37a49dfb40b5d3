//! Legacy unframed codec (spec §4.3.2).
//!
//! No magic, no CRC — payload only. Supported for **read and delete only**
//! when handling snapshots written by older versions; the repository never
//! calls [`LegacyCodec::encode`] from a live write path (encode exists so
//! tests can build legacy fixtures and so the trait stays symmetric).

use serde::{de::DeserializeOwned, Serialize};

use super::BlobCodec;
use crate::error::{RepositoryError, Result};

pub struct LegacyCodec;

impl LegacyCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LegacyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> BlobCodec<T> for LegacyCodec {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| RepositoryError::Corrupt(format!("serializing legacy payload: {}", e)))
    }

    fn decode(&self, raw: &[u8]) -> Result<T> {
        serde_json::from_slice(raw)
            .map_err(|e| RepositoryError::Corrupt(format!("deserializing legacy payload: {}", e)))
    }
}
