//! Checksummed framed codec (spec §4.3.1, wire format in §6.2).
//!
//! ```text
//! +---------+------------------+------------+---------+------+
//! | MAGIC(4)| CODEC_NAME(vstr) | VER(u32 BE)| PAYLOAD | CRC32|
//! +---------+------------------+------------+---------+------+
//! ```
//!
//! `PAYLOAD` is a `serde_json`-serialized value, optionally gzip-compressed
//! (spec's "gzip-equivalent" compression flag) via `flate2` — the pack's
//! dominant self-describing wire format and compression crate
//! respectively, standing in for the source's orthogonal "self-describing
//! serialization of T." CRC32 (`crc32fast`, already a teacher dependency)
//! covers everything from the start of `CODEC_NAME` through the end of
//! `PAYLOAD`, matching the teacher's `DataBlob::compute_crc` convention of
//! hashing everything after the fixed header.

use std::io::{Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use super::{BlobCodec, CodecName, VersionPolicy};
use crate::error::{RepositoryError, Result};

/// The 4-byte magic shared by every framed blob in the repository.
pub const MAGIC: [u8; 4] = *b"SNR1";

pub struct FramedCodec {
    codec_name: CodecName,
    policy: VersionPolicy,
    write_version: u32,
    compress: bool,
}

impl FramedCodec {
    pub fn new(codec_name: CodecName, policy: VersionPolicy, compress: bool) -> Self {
        Self {
            codec_name,
            policy,
            write_version: policy.current,
            compress,
        }
    }

    fn write_payload(&self, json: &[u8]) -> Result<Vec<u8>> {
        if self.compress {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(json)
                .map_err(RepositoryError::Io)?;
            encoder.finish().map_err(RepositoryError::Io)
        } else {
            Ok(json.to_vec())
        }
    }

    fn read_payload(&self, raw: &[u8]) -> Result<Vec<u8>> {
        if self.compress {
            let mut decoder = flate2::read::GzDecoder::new(raw);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| RepositoryError::Corrupt(format!("gzip payload: {}", e)))?;
            Ok(out)
        } else {
            Ok(raw.to_vec())
        }
    }
}

impl<T: Serialize + DeserializeOwned> BlobCodec<T> for FramedCodec {
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(value)
            .map_err(|e| RepositoryError::Corrupt(format!("serializing payload: {}", e)))?;
        let payload = self.write_payload(&json)?;

        let name = self.codec_name.as_str();
        let mut body = Vec::with_capacity(1 + name.len() + 4 + payload.len());
        body.push(name.len() as u8);
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(&self.write_version.to_be_bytes());
        body.extend_from_slice(&payload);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut out = Vec::with_capacity(4 + body.len() + 4);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&body);
        out.extend_from_slice(&crc.to_le_bytes());
        Ok(out)
    }

    fn decode(&self, raw: &[u8]) -> Result<T> {
        if raw.len() < 4 {
            return Err(RepositoryError::Corrupt("blob shorter than magic".into()));
        }
        if raw[0..4] != MAGIC {
            return Err(RepositoryError::Corrupt("bad magic".into()));
        }
        if raw.len() < 8 {
            return Err(RepositoryError::Corrupt("blob too short for header".into()));
        }

        let body = &raw[4..raw.len() - 4];
        let trailer_crc = u32::from_le_bytes(raw[raw.len() - 4..].try_into().unwrap());

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(body);
        if hasher.finalize() != trailer_crc {
            return Err(RepositoryError::Corrupt("CRC mismatch".into()));
        }

        if body.is_empty() {
            return Err(RepositoryError::Corrupt("empty body".into()));
        }
        let name_len = body[0] as usize;
        if body.len() < 1 + name_len + 4 {
            return Err(RepositoryError::Corrupt("truncated codec name/version".into()));
        }
        let name = std::str::from_utf8(&body[1..1 + name_len])
            .map_err(|_| RepositoryError::Corrupt("codec name not utf8".into()))?;
        if name != self.codec_name.as_str() {
            return Err(RepositoryError::Corrupt(format!(
                "codec name mismatch: expected '{}', found '{}'",
                self.codec_name.as_str(),
                name
            )));
        }

        let version_start = 1 + name_len;
        let version =
            u32::from_be_bytes(body[version_start..version_start + 4].try_into().unwrap());
        if !self.policy.is_supported(version) {
            return Err(RepositoryError::UnsupportedVersion {
                version,
                min: self.policy.min_supported,
                max: self.policy.current,
            });
        }

        let payload = &body[version_start + 4..];
        let json = self.read_payload(payload)?;
        serde_json::from_slice(&json)
            .map_err(|e| RepositoryError::Corrupt(format!("deserializing payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        a: u32,
        b: String,
    }

    fn codec(compress: bool) -> FramedCodec {
        FramedCodec::new(CodecName::Metadata, VersionPolicy::default_policy(), compress)
    }

    #[test]
    fn round_trips_uncompressed() {
        let c = codec(false);
        let value = Sample { a: 42, b: "hi".into() };
        let raw = BlobCodec::<Sample>::encode(&c, &value).unwrap();
        let decoded: Sample = c.decode(&raw).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trips_compressed() {
        let c = codec(true);
        let value = Sample { a: 7, b: "compressed".repeat(50) };
        let raw = BlobCodec::<Sample>::encode(&c, &value).unwrap();
        let decoded: Sample = c.decode(&raw).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn corrupting_a_byte_fails_crc() {
        let c = codec(false);
        let value = Sample { a: 1, b: "x".into() };
        let mut raw = BlobCodec::<Sample>::encode(&c, &value).unwrap();
        let last = raw.len() - 5;
        raw[last] ^= 0xFF;
        let err = BlobCodec::<Sample>::decode(&c, &raw).unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)));
    }

    #[test]
    fn wrong_codec_name_is_corrupt() {
        let writer = FramedCodec::new(CodecName::Snapshot, VersionPolicy::default_policy(), false);
        let reader = FramedCodec::new(CodecName::Metadata, VersionPolicy::default_policy(), false);
        let value = Sample { a: 1, b: "x".into() };
        let raw = BlobCodec::<Sample>::encode(&writer, &value).unwrap();
        let err = BlobCodec::<Sample>::decode(&reader, &raw).unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)));
    }

    #[test]
    fn version_outside_range_is_unsupported() {
        let policy = VersionPolicy { legacy_cutoff: 1, min_supported: 2, current: 2 };
        let writer = FramedCodec { codec_name: CodecName::Snapshot, policy, write_version: 99, compress: false };
        let reader = FramedCodec::new(CodecName::Snapshot, policy, false);
        let value = Sample { a: 1, b: "x".into() };
        let raw = BlobCodec::<Sample>::encode(&writer, &value).unwrap();
        let err = BlobCodec::<Sample>::decode(&reader, &raw).unwrap_err();
        assert!(matches!(err, RepositoryError::UnsupportedVersion { .. }));
    }
}
