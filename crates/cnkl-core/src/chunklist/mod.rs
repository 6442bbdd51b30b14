//! Chunklist manifest decoding.
//!
//! A chunklist is the binary sidecar Apple publishes next to large installer
//! packages (`InstallAssistant.pkg`). It lists the length and digest of every
//! consecutive chunk of the package so a download can be verified piecewise.
//!
//! Layout (little-endian, packed, see XNU `bsd/kern/chunklist.h`):
//!
//! ```text
//! 0   magic            "CNKL"
//! 4   header size      u32 (0x24)
//! 8   file version     u8  (1)
//! 9   chunk method     u8
//! 10  signature method u8
//! 11  padding          u8
//! 12  chunk count      u64
//! 20  chunk offset     u64
//! 28  signature offset u64
//! ```
//!
//! followed at `chunk offset` by `chunk count` records of `u32 size` plus a
//! digest whose width depends on the chunk method.

mod error;
mod method;

pub use error::ManifestError;
pub use method::{ChunkHasher, ChunkMethod};

use serde::Serialize;

/// Magic at offset 0 (`0x4C4B4E43` as a little-endian u32).
pub const CHUNKLIST_MAGIC: [u8; 4] = *b"CNKL";
/// Size of the fixed header.
pub const HEADER_LEN: usize = 0x24;
pub const FILE_VERSION_10: u8 = 1;

/// Decoded fixed header. Field values are kept as read for `cnkl inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunklistHeader {
    pub header_size: u32,
    pub file_version: u8,
    pub chunk_method: u8,
    pub signature_method: u8,
    pub chunk_count: u64,
    pub chunk_offset: u64,
    pub signature_offset: u64,
}

/// One chunk of the target file. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkRecord {
    pub index: u32,
    pub size: u32,
    #[serde(serialize_with = "hex_bytes")]
    pub checksum: Vec<u8>,
}

/// Parsed chunklist. Chunks are contiguous byte ranges of the target file
/// starting at offset 0, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunklistManifest {
    header: ChunklistHeader,
    chunk_method: ChunkMethod,
    chunks: Vec<ChunkRecord>,
    signature: Option<Vec<u8>>,
}

impl ChunklistManifest {
    /// Decode a chunklist buffer. Never indexes out of bounds; every size
    /// taken from the header is checked against `buf.len()` first.
    pub fn parse(buf: &[u8]) -> Result<Self, ManifestError> {
        let header = parse_header(buf)?;
        let chunk_method = ChunkMethod::from_id(header.chunk_method)?;
        let (chunks, table_end) = parse_table(buf, &header, chunk_method)?;

        let signature = match header.signature_offset {
            0 => None,
            off if off > buf.len() as u64 => {
                return Err(ManifestError::BadSignatureOffset {
                    offset: off,
                    len: buf.len(),
                })
            }
            off if off < table_end => {
                return Err(ManifestError::SignatureOverlapsTable {
                    offset: off,
                    table_end,
                })
            }
            off => {
                let sig = &buf[off as usize..];
                (!sig.is_empty()).then(|| sig.to_vec())
            }
        };

        Ok(ChunklistManifest {
            header,
            chunk_method,
            chunks,
            signature,
        })
    }

    /// Build a manifest from precomputed records (table immediately after the
    /// header, no signature). Record indices are renumbered from 1.
    pub fn from_records(chunk_method: ChunkMethod, records: Vec<(u32, Vec<u8>)>) -> Self {
        let chunks: Vec<ChunkRecord> = records
            .into_iter()
            .enumerate()
            .map(|(i, (size, checksum))| ChunkRecord {
                index: i as u32 + 1,
                size,
                checksum,
            })
            .collect();
        let header = ChunklistHeader {
            header_size: HEADER_LEN as u32,
            file_version: FILE_VERSION_10,
            chunk_method: chunk_method.id(),
            signature_method: 0,
            chunk_count: chunks.len() as u64,
            chunk_offset: HEADER_LEN as u64,
            signature_offset: 0,
        };
        ChunklistManifest {
            header,
            chunk_method,
            chunks,
            signature: None,
        }
    }

    /// Hash `data` split at `sizes` and build the matching manifest.
    /// `sizes` must not sum past `data.len()`.
    pub fn for_data(chunk_method: ChunkMethod, data: &[u8], sizes: &[u32]) -> Self {
        let mut offset = 0usize;
        let records = sizes
            .iter()
            .map(|&size| {
                let end = (offset + size as usize).min(data.len());
                let digest = chunk_method.digest(&data[offset..end]);
                offset = end;
                (size, digest)
            })
            .collect();
        Self::from_records(chunk_method, records)
    }

    /// Serialize in the on-disk layout. The signature, if any, is appended
    /// right after the chunk table.
    pub fn encode(&self) -> Vec<u8> {
        let table_len = self.chunks.len() * self.chunk_method.record_len();
        let sig_offset = match self.signature {
            Some(_) => (HEADER_LEN + table_len) as u64,
            None => 0,
        };
        let mut out = Vec::with_capacity(HEADER_LEN + table_len);
        out.extend_from_slice(&CHUNKLIST_MAGIC);
        out.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());
        out.push(self.header.file_version);
        out.push(self.chunk_method.id());
        out.push(self.header.signature_method);
        out.push(0);
        out.extend_from_slice(&(self.chunks.len() as u64).to_le_bytes());
        out.extend_from_slice(&(HEADER_LEN as u64).to_le_bytes());
        out.extend_from_slice(&sig_offset.to_le_bytes());
        for c in &self.chunks {
            out.extend_from_slice(&c.size.to_le_bytes());
            out.extend_from_slice(&c.checksum);
        }
        if let Some(sig) = &self.signature {
            out.extend_from_slice(sig);
        }
        out
    }

    pub fn with_signature(mut self, signature_method: u8, signature: Vec<u8>) -> Self {
        self.header.signature_method = signature_method;
        self.signature = Some(signature);
        self
    }

    pub fn header(&self) -> &ChunklistHeader {
        &self.header
    }

    pub fn chunk_method(&self) -> ChunkMethod {
        self.chunk_method
    }

    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn total_chunks(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// Number of target-file bytes covered by the chunk table.
    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.size as u64).sum()
    }

    /// Byte offset of the chunk with 1-based `index` in the target file.
    pub fn chunk_offset(&self, index: u32) -> Option<u64> {
        let pos = (index as usize).checked_sub(1)?;
        if pos >= self.chunks.len() {
            return None;
        }
        Some(self.chunks[..pos].iter().map(|c| c.size as u64).sum())
    }
}

fn parse_header(buf: &[u8]) -> Result<ChunklistHeader, ManifestError> {
    if buf.len() < HEADER_LEN {
        return Err(ManifestError::TruncatedHeader {
            len: buf.len(),
            need: HEADER_LEN,
        });
    }
    let truncated = || ManifestError::TruncatedHeader {
        len: buf.len(),
        need: HEADER_LEN,
    };

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&buf[0..4]);
    if magic != CHUNKLIST_MAGIC {
        return Err(ManifestError::BadMagic { found: magic });
    }

    let header_size = le_u32(buf, 4).ok_or_else(truncated)?;
    if (header_size as usize) < HEADER_LEN || header_size as usize > buf.len() {
        return Err(ManifestError::BadHeaderSize {
            declared: header_size,
            len: buf.len(),
        });
    }

    let file_version = buf[8];
    if file_version != FILE_VERSION_10 {
        return Err(ManifestError::UnsupportedVersion(file_version));
    }

    Ok(ChunklistHeader {
        header_size,
        file_version,
        chunk_method: buf[9],
        signature_method: buf[10],
        chunk_count: le_u64(buf, 12).ok_or_else(truncated)?,
        chunk_offset: le_u64(buf, 20).ok_or_else(truncated)?,
        signature_offset: le_u64(buf, 28).ok_or_else(truncated)?,
    })
}

/// Decode the chunk table. Returns the records and the offset just past the table.
fn parse_table(
    buf: &[u8],
    header: &ChunklistHeader,
    method: ChunkMethod,
) -> Result<(Vec<ChunkRecord>, u64), ManifestError> {
    if header.chunk_offset < header.header_size as u64 {
        return Err(ManifestError::TableOverlapsHeader {
            offset: header.chunk_offset,
            header_size: header.header_size,
        });
    }
    let too_big = || ManifestError::TruncatedTable {
        count: header.chunk_count,
        offset: header.chunk_offset,
        len: buf.len(),
    };
    let record_len = method.record_len();
    let table_end = header
        .chunk_count
        .checked_mul(record_len as u64)
        .and_then(|n| n.checked_add(header.chunk_offset))
        .ok_or_else(too_big)?;
    if table_end > buf.len() as u64 {
        return Err(too_big());
    }

    let table = &buf[header.chunk_offset as usize..table_end as usize];
    let chunks = table
        .chunks_exact(record_len)
        .enumerate()
        .map(|(i, rec)| {
            let index = u32::try_from(i + 1).map_err(|_| too_big())?;
            let size = le_u32(rec, 0).ok_or_else(too_big)?;
            Ok(ChunkRecord {
                index,
                size,
                checksum: rec[4..].to_vec(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((chunks, table_end))
}

fn le_u32(buf: &[u8], at: usize) -> Option<u32> {
    buf.get(at..at + 4)?.try_into().ok().map(u32::from_le_bytes)
}

fn le_u64(buf: &[u8], at: usize) -> Option<u64> {
    buf.get(at..at + 8)?.try_into().ok().map(u64::from_le_bytes)
}

fn hex_bytes<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes))
}
