//! Chunk-by-chunk integrity verification of a downloaded file.
//!
//! `ChunklistVerification` walks the chunk table of a parsed chunklist,
//! streams each chunk of the target file through the declared digest and
//! compares the raw digest bytes. It stops at the first bad chunk: a single
//! mismatch already makes the download unusable.
//!
//! The run is `Pending -> InProgress -> {Success | Failure | Cancelled}`.
//! Progress is published through a `ProgressHandle` that a separate thread
//! (e.g. a UI loop) polls; the engine never calls back into the caller.

mod error;
mod task;

pub use error::VerifyError;
pub use task::ValidationTask;

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crate::chunklist::{ChunkMethod, ChunkRecord, ChunklistManifest};
use crate::control::CancelToken;
use crate::progress::{ProgressHandle, ProgressSnapshot, ProgressState, ValidationStatus};

const READ_BUF_SIZE: usize = 64 * 1024;

/// One validation run of `path` against a chunklist. Single use: build a new
/// instance to validate again.
pub struct ChunklistVerification {
    path: PathBuf,
    manifest: ChunklistManifest,
    state: Arc<ProgressState>,
}

impl ChunklistVerification {
    pub fn new(path: impl Into<PathBuf>, manifest: ChunklistManifest) -> Self {
        let state = Arc::new(ProgressState::new(
            manifest.total_chunks(),
            manifest.total_size(),
        ));
        Self {
            path: path.into(),
            manifest,
            state,
        }
    }

    /// Parse `chunklist` and prepare a run. Parse errors surface here, before
    /// any file access.
    pub fn from_bytes(path: impl Into<PathBuf>, chunklist: &[u8]) -> Result<Self, VerifyError> {
        let manifest = ChunklistManifest::parse(chunklist)?;
        Ok(Self::new(path, manifest))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &ChunklistManifest {
        &self.manifest
    }

    pub fn total_chunks(&self) -> u32 {
        self.manifest.total_chunks()
    }

    pub fn progress(&self) -> ProgressHandle {
        ProgressHandle::new(Arc::clone(&self.state))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }

    /// Validate the target file on the current thread.
    pub fn validate(&self, cancel: &CancelToken) -> Result<(), VerifyError> {
        if !self.state.begin() {
            return Err(VerifyError::AlreadyStarted);
        }
        self.run_file(cancel)
    }

    /// Validate bytes from `reader` instead of opening the target path.
    /// The reader is consumed sequentially from chunk 1.
    pub fn validate_reader<R: Read>(
        &self,
        reader: R,
        cancel: &CancelToken,
    ) -> Result<(), VerifyError> {
        if !self.state.begin() {
            return Err(VerifyError::AlreadyStarted);
        }
        self.run(reader, cancel)
    }

    /// Run `validate` on a background thread. The run is already `InProgress`
    /// when this returns, so the first poll reflects real state.
    pub fn spawn(self, cancel: CancelToken) -> Result<ValidationTask, VerifyError> {
        if !self.state.begin() {
            return Err(VerifyError::AlreadyStarted);
        }
        let progress = self.progress();
        let state = Arc::clone(&self.state);
        let worker_cancel = cancel.clone();
        let handle = thread::Builder::new()
            .name("cnkl-verify".to_string())
            .spawn(move || self.run_file(&worker_cancel))
            .map_err(|source| {
                state.finish(ValidationStatus::Failure, None);
                VerifyError::Io {
                    chunk: None,
                    source,
                }
            })?;
        Ok(ValidationTask::new(handle, progress, cancel))
    }

    fn run_file(&self, cancel: &CancelToken) -> Result<(), VerifyError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(source) => {
                tracing::error!(path = %self.path.display(), error = %source, "cannot open target file");
                self.state.finish(ValidationStatus::Failure, None);
                return Err(VerifyError::Io {
                    chunk: None,
                    source,
                });
            }
        };
        self.run(file, cancel)
    }

    fn run<R: Read>(&self, mut reader: R, cancel: &CancelToken) -> Result<(), VerifyError> {
        let total = self.manifest.total_chunks();
        let method = self.manifest.chunk_method();
        tracing::info!(
            path = %self.path.display(),
            total,
            bytes = self.manifest.total_size(),
            ?method,
            "validating chunklist"
        );

        let mut buf = vec![0u8; READ_BUF_SIZE];
        for chunk in self.manifest.chunks() {
            if cancel.is_cancelled() {
                tracing::info!(chunk = chunk.index, total, "validation cancelled");
                self.state.finish(ValidationStatus::Cancelled, None);
                return Err(VerifyError::Cancelled { chunk: chunk.index });
            }
            self.state.enter_chunk(chunk.index);

            if let Err(e) = check_chunk(&mut reader, method, chunk, &mut buf) {
                tracing::error!(chunk = chunk.index, total, error = %e, "chunk validation failed");
                self.state.finish(ValidationStatus::Failure, Some(chunk.index));
                return Err(e);
            }
            self.state.add_bytes(chunk.size as u64);
            tracing::trace!(chunk = chunk.index, total, "chunk ok");
        }

        self.state.finish(ValidationStatus::Success, None);
        tracing::info!(path = %self.path.display(), total, "chunklist validation passed");
        Ok(())
    }
}

/// Hash exactly `chunk.size` bytes from `reader` and compare with the record.
/// Never reads past the end of the chunk.
fn check_chunk<R: Read>(
    reader: &mut R,
    method: ChunkMethod,
    chunk: &ChunkRecord,
    buf: &mut [u8],
) -> Result<(), VerifyError> {
    let mut hasher = method.hasher();
    let mut remaining = chunk.size as usize;
    let mut read = 0u64;
    while remaining > 0 {
        let want = remaining.min(buf.len());
        let n = match reader.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(VerifyError::Io {
                    chunk: Some(chunk.index),
                    source,
                })
            }
        };
        hasher.update(&buf[..n]);
        remaining -= n;
        read += n as u64;
    }

    if remaining > 0 {
        return Err(VerifyError::Truncated {
            chunk: chunk.index,
            expected: chunk.size,
            read,
        });
    }

    let actual = hasher.finalize();
    if actual != chunk.checksum {
        return Err(VerifyError::ChunkMismatch {
            chunk: chunk.index,
            expected: chunk.checksum.clone(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
