//! Whole-file digests, for comparing a download against a published hash
//! when no chunklist exists.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::chunklist::ChunkMethod;

const BUF_SIZE: usize = 64 * 1024;

/// Digest of the whole file with `method`, as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn file_digest(path: &Path, method: ChunkMethod) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = method.hasher();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_path(path: &Path) -> Result<String> {
    file_digest(path, ChunkMethod::Sha256)
}
