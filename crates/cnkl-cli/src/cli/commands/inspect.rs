//! `cnkl inspect` – decode a chunklist and print what it declares.

use anyhow::{Context, Result};
use cnkl_core::ChunklistManifest;
use std::path::Path;

pub fn run_inspect(path: &Path, list_chunks: bool, json: bool) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let manifest = ChunklistManifest::parse(&bytes)
        .with_context(|| format!("decode {}", path.display()))?;

    if json {
        let mut value = serde_json::json!({
            "path": path,
            "header": manifest.header(),
            "chunk_method": manifest.chunk_method(),
            "total_chunks": manifest.total_chunks(),
            "total_size": manifest.total_size(),
            "signature_len": manifest.signature().map(|s| s.len()),
        });
        if list_chunks {
            value["chunks"] = serde_json::to_value(manifest.chunks())?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print!("{}", summary(&manifest));
    if list_chunks {
        println!("{:<8} {:<14} {:<12} {}", "CHUNK", "OFFSET", "SIZE", "CHECKSUM");
        let mut offset = 0u64;
        for c in manifest.chunks() {
            println!(
                "{:<8} {:<14} {:<12} {}",
                c.index,
                offset,
                c.size,
                hex::encode(&c.checksum)
            );
            offset += c.size as u64;
        }
    }
    Ok(())
}

fn summary(m: &ChunklistManifest) -> String {
    let h = m.header();
    let sizes = m.chunks().iter().map(|c| c.size);
    let min = sizes.clone().min().unwrap_or(0);
    let max = sizes.max().unwrap_or(0);
    let mut out = String::new();
    out.push_str(&format!("file version:     {}\n", h.file_version));
    out.push_str(&format!(
        "chunk method:     {} ({:?})\n",
        h.chunk_method,
        m.chunk_method()
    ));
    out.push_str(&format!("signature method: {}\n", h.signature_method));
    out.push_str(&format!("chunks:           {}\n", m.total_chunks()));
    out.push_str(&format!("covered bytes:    {}\n", m.total_size()));
    out.push_str(&format!("chunk size:       {}..={}\n", min, max));
    match m.signature() {
        Some(sig) => out.push_str(&format!("signature:        {} bytes\n", sig.len())),
        None => out.push_str("signature:        none\n"),
    }
    out
}
