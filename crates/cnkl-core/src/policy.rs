//! When to verify a download, and the end-to-end verify flow.
//!
//! Apple does not publish a chunklist for every installer. When none is
//! available the download is trusted as-is unless `require_chunklist` is set.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::chunklist::ChunklistManifest;
use crate::control::CancelToken;
use crate::progress::ProgressSnapshot;
use crate::verify::{ChunklistVerification, ValidationTask, VerifyError};

/// Verification policy. Loaded from config, overridable per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPolicy {
    /// Verify whenever a chunklist is available. `false` skips verification entirely.
    pub verify_if_present: bool,
    /// Fail instead of trusting the file when no chunklist is available.
    pub require_chunklist: bool,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            verify_if_present: true,
            require_chunklist: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `verify_if_present` is off.
    Disabled,
    /// No chunklist bytes were available (absent or empty response).
    NoChunklist,
    /// The chunklist parsed but lists no chunks.
    EmptyChunklist,
}

/// What to do with a download, decided before any file I/O.
#[derive(Debug)]
pub enum Plan {
    Skip(SkipReason),
    Verify(ChunklistManifest),
}

/// Result of a completed verify flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Skipped { reason: SkipReason },
    Verified { progress: ProgressSnapshot },
}

impl VerifyPolicy {
    /// Decide whether and how to verify given the (possibly absent) chunklist bytes.
    pub fn plan(&self, chunklist: Option<&[u8]>) -> Result<Plan, VerifyError> {
        if !self.verify_if_present {
            return Ok(Plan::Skip(SkipReason::Disabled));
        }
        let bytes = match chunklist {
            Some(b) if !b.is_empty() => b,
            _ if self.require_chunklist => return Err(VerifyError::ManifestMissing),
            _ => {
                tracing::warn!("no chunklist available, skipping verification");
                return Ok(Plan::Skip(SkipReason::NoChunklist));
            }
        };
        let manifest = ChunklistManifest::parse(bytes)?;
        if manifest.total_chunks() == 0 {
            tracing::warn!("chunklist lists no chunks, skipping verification");
            return Ok(Plan::Skip(SkipReason::EmptyChunklist));
        }
        Ok(Plan::Verify(manifest))
    }
}

/// A verify flow after planning: skipped outright, or running on a worker.
pub enum Launch {
    Skipped(SkipReason),
    Running(ValidationTask),
}

impl VerifyPolicy {
    /// Plan the flow and, if there is something to verify, start the worker.
    /// The caller polls `Launch::Running`'s progress however it likes and then
    /// calls `finish`.
    pub fn launch(
        &self,
        path: &Path,
        chunklist: Option<&[u8]>,
        cancel: &CancelToken,
    ) -> Result<Launch, VerifyError> {
        match self.plan(chunklist)? {
            Plan::Skip(reason) => Ok(Launch::Skipped(reason)),
            Plan::Verify(manifest) => {
                tracing::info!(
                    path = %path.display(),
                    chunks = manifest.total_chunks(),
                    "starting verification"
                );
                let task = ChunklistVerification::new(path, manifest).spawn(cancel.clone())?;
                Ok(Launch::Running(task))
            }
        }
    }
}

impl Launch {
    /// Block until the worker exits. The reported progress is the final,
    /// terminal snapshot.
    pub fn finish(self) -> Result<Outcome, VerifyError> {
        match self {
            Launch::Skipped(reason) => Ok(Outcome::Skipped { reason }),
            Launch::Running(task) => {
                let progress = task.progress();
                task.join()?;
                Ok(Outcome::Verified {
                    progress: progress.snapshot(),
                })
            }
        }
    }
}

/// Verify `path` on a worker thread while polling it from the calling thread
/// every `poll_interval`, passing each snapshot to `on_poll`.
pub fn verify_download<F>(
    path: &Path,
    chunklist: Option<&[u8]>,
    policy: &VerifyPolicy,
    cancel: &CancelToken,
    poll_interval: Duration,
    on_poll: F,
) -> Result<Outcome, VerifyError>
where
    F: FnMut(&ProgressSnapshot),
{
    let launch = policy.launch(path, chunklist, cancel)?;
    if let Launch::Running(task) = &launch {
        task.progress().wait_with(poll_interval, on_poll);
    }
    launch.finish()
}

impl Outcome {
    pub fn user_message(&self) -> String {
        match self {
            Outcome::Skipped {
                reason: SkipReason::Disabled,
            } => "Verification disabled; installer not checked.".to_string(),
            Outcome::Skipped { .. } => {
                "No chunklist available; installer accepted without verification.".to_string()
            }
            Outcome::Verified { progress } => format!(
                "Installer verified ({} chunks, {} bytes).",
                progress.total_chunks, progress.bytes_verified
            ),
        }
    }
}
