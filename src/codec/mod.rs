//! Blob format codecs (spec §4.3).
//!
//! A blob format encodes/decodes a typed value `T` to/from a single blob.
//! The source this spec was distilled from expresses "checksummed framed"
//! vs. "legacy unframed" as a class hierarchy; per REDESIGN FLAGS (spec §9)
//! we collapse that into one [`BlobCodec`] trait with two concrete
//! implementors and a version-routing function that picks between them.

mod framed;
mod legacy;

pub use framed::FramedCodec;
pub use legacy::LegacyCodec;

use crate::error::Result;

/// A named, versioned blob codec for one payload type `T`.
pub trait BlobCodec<T> {
    /// Encode `value` to on-disk bytes.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode on-disk bytes back into `T`.
    fn decode(&self, raw: &[u8]) -> Result<T>;
}

/// The three codec-name tags used in the framed header (spec §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecName {
    Snapshot,
    Metadata,
    IndexMetadata,
}

impl CodecName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecName::Snapshot => "snapshot",
            CodecName::Metadata => "metadata",
            CodecName::IndexMetadata => "index-metadata",
        }
    }
}

/// Version routing policy (spec §4.3.3): selects the framed codec for
/// current versions, the legacy codec for anything strictly older than
/// `legacy_cutoff`.
#[derive(Debug, Clone, Copy)]
pub struct VersionPolicy {
    pub legacy_cutoff: u32,
    pub min_supported: u32,
    pub current: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecVariant {
    Framed,
    Legacy,
}

impl VersionPolicy {
    /// A reasonable default, per spec §9's open question: legacy covers
    /// anything older than the introduction of the framed codec.
    pub fn default_policy() -> Self {
        Self {
            legacy_cutoff: 1,
            min_supported: 1,
            current: 1,
        }
    }

    pub fn variant_for(&self, version: u32) -> CodecVariant {
        if version < self.legacy_cutoff {
            CodecVariant::Legacy
        } else {
            CodecVariant::Framed
        }
    }

    pub fn is_supported(&self, version: u32) -> bool {
        version >= self.min_supported && version <= self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_routing_picks_legacy_before_cutoff() {
        let policy = VersionPolicy {
            legacy_cutoff: 5,
            min_supported: 1,
            current: 10,
        };
        assert_eq!(policy.variant_for(4), CodecVariant::Legacy);
        assert_eq!(policy.variant_for(5), CodecVariant::Framed);
        assert_eq!(policy.variant_for(9), CodecVariant::Framed);
    }

    #[test]
    fn is_supported_checks_range() {
        let policy = VersionPolicy {
            legacy_cutoff: 1,
            min_supported: 2,
            current: 4,
        };
        assert!(!policy.is_supported(1));
        assert!(policy.is_supported(2));
        assert!(policy.is_supported(4));
        assert!(!policy.is_supported(5));
    }
}
