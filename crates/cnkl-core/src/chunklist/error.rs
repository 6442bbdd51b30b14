//! Errors raised while decoding a chunklist.

use thiserror::Error;

/// Reason a chunklist buffer could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("chunklist is {len} bytes, shorter than the {need}-byte header")]
    TruncatedHeader { len: usize, need: usize },

    #[error("bad chunklist magic {found:02x?}")]
    BadMagic { found: [u8; 4] },

    #[error("declared header size {declared} is invalid for a {len}-byte chunklist")]
    BadHeaderSize { declared: u32, len: usize },

    #[error("unsupported chunklist file version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported chunk method {0}")]
    UnsupportedAlgorithm(u8),

    #[error("chunk table of {count} records at offset {offset} does not fit in {len} bytes")]
    TruncatedTable { count: u64, offset: u64, len: usize },

    #[error("chunk table offset {offset} lies inside the {header_size}-byte header")]
    TableOverlapsHeader { offset: u64, header_size: u32 },

    #[error("signature offset {offset} lies inside the chunk table ending at {table_end}")]
    SignatureOverlapsTable { offset: u64, table_end: u64 },

    #[error("signature offset {offset} is past the end of a {len}-byte chunklist")]
    BadSignatureOffset { offset: u64, len: usize },
}
