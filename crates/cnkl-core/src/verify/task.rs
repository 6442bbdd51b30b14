//! Handle to a validation run executing on a worker thread.

use std::thread::JoinHandle;

use super::VerifyError;
use crate::control::CancelToken;
use crate::progress::{ProgressHandle, ProgressSnapshot};

/// Returned by `ChunklistVerification::spawn`. Dropping it detaches the worker;
/// call `cancel` first to stop it at the next chunk boundary.
pub struct ValidationTask {
    handle: JoinHandle<Result<(), VerifyError>>,
    progress: ProgressHandle,
    cancel: CancelToken,
}

impl ValidationTask {
    pub(super) fn new(
        handle: JoinHandle<Result<(), VerifyError>>,
        progress: ProgressHandle,
        cancel: CancelToken,
    ) -> Self {
        Self {
            handle,
            progress,
            cancel,
        }
    }

    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker exits and return its result.
    pub fn join(self) -> Result<(), VerifyError> {
        self.handle.join().map_err(|_| VerifyError::WorkerPanicked)?
    }
}
