//! Error taxonomy for chunklist verification.

use std::io;
use thiserror::Error;

use crate::chunklist::ManifestError;

/// Why a verification run did not succeed. Every variant is terminal for the
/// run that produced it; callers retry by re-downloading and starting over.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed chunklist: {0}")]
    MalformedManifest(ManifestError),

    #[error("chunklist uses unsupported chunk method {0}")]
    UnsupportedAlgorithm(u8),

    #[error("chunk {chunk} checksum mismatch: expected {}, calculated {}", hex::encode(.expected), hex::encode(.actual))]
    ChunkMismatch {
        chunk: u32,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("file ends inside chunk {chunk}: expected {expected} bytes, read {read}")]
    Truncated { chunk: u32, expected: u32, read: u64 },

    #[error("{}", io_message(.chunk))]
    Io {
        chunk: Option<u32>,
        #[source]
        source: io::Error,
    },

    #[error("verification cancelled before chunk {chunk}")]
    Cancelled { chunk: u32 },

    #[error("verification already started for this instance")]
    AlreadyStarted,

    #[error("no chunklist available and one is required")]
    ManifestMissing,

    #[error("verification worker panicked")]
    WorkerPanicked,
}

fn io_message(chunk: &Option<u32>) -> String {
    match chunk {
        Some(c) => format!("I/O error while reading chunk {c}"),
        None => "I/O error opening target file".to_string(),
    }
}

impl From<ManifestError> for VerifyError {
    fn from(e: ManifestError) -> Self {
        match e {
            ManifestError::UnsupportedAlgorithm(id) => VerifyError::UnsupportedAlgorithm(id),
            other => VerifyError::MalformedManifest(other),
        }
    }
}

impl VerifyError {
    /// The 1-based chunk the run stopped on, when the error belongs to one.
    pub fn chunk(&self) -> Option<u32> {
        match self {
            VerifyError::ChunkMismatch { chunk, .. }
            | VerifyError::Truncated { chunk, .. }
            | VerifyError::Cancelled { chunk } => Some(*chunk),
            VerifyError::Io { chunk, .. } => *chunk,
            _ => None,
        }
    }

    /// True when the downloaded file should be treated as corrupt and fetched again.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            VerifyError::MalformedManifest(_)
                | VerifyError::UnsupportedAlgorithm(_)
                | VerifyError::ChunkMismatch { .. }
                | VerifyError::Truncated { .. }
        )
    }

    /// Guidance suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            VerifyError::ChunkMismatch { chunk, .. } | VerifyError::Truncated { chunk, .. } => {
                format!(
                    "Chunklist validation failed: hash mismatch on chunk {chunk}.\n\n\
                     This generally happens when downloading on unstable connections such as \
                     Wi-Fi or cellular.\n\nPlease try redownloading on a stable connection \
                     (e.g. Ethernet)."
                )
            }
            VerifyError::MalformedManifest(_) | VerifyError::UnsupportedAlgorithm(_) => {
                "The installer could not be verified and may be corrupted.\n\n\
                 Please try redownloading on a stable connection (e.g. Ethernet)."
                    .to_string()
            }
            VerifyError::Cancelled { .. } => "Verification was cancelled.".to_string(),
            VerifyError::ManifestMissing => {
                "No chunklist is available for this installer, so it cannot be verified."
                    .to_string()
            }
            VerifyError::Io { .. } | VerifyError::AlreadyStarted | VerifyError::WorkerPanicked => {
                format!("Failed to verify the installer: {self}")
            }
        }
    }
}
