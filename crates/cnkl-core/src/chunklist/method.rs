//! Chunk digest algorithms declared by the chunklist header.

use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::ManifestError;

/// Hash algorithm used for every chunk checksum in a chunklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMethod {
    /// `CHUNKLIST_CHUNK_METHOD_SHA256`, 32-byte digests.
    Sha256,
    /// Legacy 20-byte SHA-1 digests.
    Sha1,
}

impl ChunkMethod {
    pub const SHA256_ID: u8 = 1;
    pub const SHA1_ID: u8 = 2;

    pub fn from_id(id: u8) -> Result<Self, ManifestError> {
        match id {
            Self::SHA256_ID => Ok(ChunkMethod::Sha256),
            Self::SHA1_ID => Ok(ChunkMethod::Sha1),
            other => Err(ManifestError::UnsupportedAlgorithm(other)),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            ChunkMethod::Sha256 => Self::SHA256_ID,
            ChunkMethod::Sha1 => Self::SHA1_ID,
        }
    }

    /// Width of one checksum in the chunk table.
    pub fn digest_len(self) -> usize {
        match self {
            ChunkMethod::Sha256 => 32,
            ChunkMethod::Sha1 => 20,
        }
    }

    /// Size of one chunk table record: `u32` length plus the checksum.
    pub fn record_len(self) -> usize {
        4 + self.digest_len()
    }

    pub fn hasher(self) -> ChunkHasher {
        match self {
            ChunkMethod::Sha256 => ChunkHasher::Sha256(Sha256::new()),
            ChunkMethod::Sha1 => ChunkHasher::Sha1(Sha1::new()),
        }
    }

    /// One-shot digest of an in-memory buffer.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut h = self.hasher();
        h.update(data);
        h.finalize()
    }
}

/// Incremental hasher for one chunk.
pub enum ChunkHasher {
    Sha256(Sha256),
    Sha1(Sha1),
}

impl ChunkHasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            ChunkHasher::Sha256(h) => h.update(data),
            ChunkHasher::Sha1(h) => h.update(data),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            ChunkHasher::Sha256(h) => h.finalize().to_vec(),
            ChunkHasher::Sha1(h) => h.finalize().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_ids_roundtrip() {
        for m in [ChunkMethod::Sha256, ChunkMethod::Sha1] {
            assert_eq!(ChunkMethod::from_id(m.id()).unwrap(), m);
        }
    }

    #[test]
    fn unknown_method_rejected() {
        assert_eq!(
            ChunkMethod::from_id(9),
            Err(ManifestError::UnsupportedAlgorithm(9))
        );
    }

    #[test]
    fn digest_widths_match_output() {
        assert_eq!(ChunkMethod::Sha256.digest(b"x").len(), 32);
        assert_eq!(ChunkMethod::Sha1.digest(b"x").len(), 20);
        assert_eq!(ChunkMethod::Sha256.record_len(), 36);
    }

    #[test]
    fn sha256_known_vector() {
        let d = ChunkMethod::Sha256.digest(b"hello\n");
        assert_eq!(
            hex::encode(d),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut h = ChunkMethod::Sha1.hasher();
        h.update(b"hel");
        h.update(b"lo");
        assert_eq!(h.finalize(), ChunkMethod::Sha1.digest(b"hello"));
    }
}
