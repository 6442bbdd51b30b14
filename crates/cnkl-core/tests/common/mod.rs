#![allow(dead_code)]

pub mod http_server;

use cnkl_core::{ChunkMethod, ChunklistManifest};
use std::io::Write;
use tempfile::NamedTempFile;

/// Deterministic pseudo-random payload.
pub fn payload(len: usize) -> Vec<u8> {
    let mut x = 0x9e37_79b9_u32;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect()
}

pub fn write_temp(data: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(data).unwrap();
    f.flush().unwrap();
    f
}

/// Payload split into equal chunks (last one shorter) and its chunklist bytes.
pub fn fixture(len: usize, chunk: u32) -> (Vec<u8>, Vec<u8>) {
    let data = payload(len);
    let mut sizes = Vec::new();
    let mut left = len as u32;
    while left > 0 {
        let s = left.min(chunk);
        sizes.push(s);
        left -= s;
    }
    let chunklist = ChunklistManifest::for_data(ChunkMethod::Sha256, &data, &sizes).encode();
    (data, chunklist)
}
