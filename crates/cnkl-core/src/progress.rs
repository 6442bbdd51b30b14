//! Progress and status surface for a validation run.
//!
//! The worker thread writes through `ProgressState`; any number of pollers
//! read through cloned `ProgressHandle`s. Nothing is pushed to the reader:
//! consumers call `snapshot()` at whatever cadence suits them.
//!
//! Every counter is written before the terminal status is published with
//! `Release`, and `snapshot()` loads the status with `Acquire` first, so a
//! poller never sees `Success`/`Failure` paired with a stale `current_chunk`.

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Lifecycle of one validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ValidationStatus {
    Pending = 0,
    InProgress = 1,
    Success = 2,
    Failure = 3,
    /// Stopped through a `CancelToken` between two chunks.
    Cancelled = 4,
}

impl ValidationStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ValidationStatus::Pending,
            1 => ValidationStatus::InProgress,
            2 => ValidationStatus::Success,
            4 => ValidationStatus::Cancelled,
            _ => ValidationStatus::Failure,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ValidationStatus::Success | ValidationStatus::Failure | ValidationStatus::Cancelled
        )
    }
}

/// Point-in-time view of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub status: ValidationStatus,
    /// 1-based index of the chunk being (or last) processed; 0 before the first chunk.
    pub current_chunk: u32,
    pub total_chunks: u32,
    /// Set only when `status` is `Failure` and the failure belongs to a chunk.
    pub failure_chunk_index: Option<u32>,
    /// Bytes of chunks whose digest matched.
    pub bytes_verified: u64,
    pub total_bytes: u64,
}

impl ProgressSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fraction of bytes verified in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return if self.status == ValidationStatus::Success { 1.0 } else { 0.0 };
        }
        (self.bytes_verified as f64 / self.total_bytes as f64).min(1.0)
    }

    /// "Validating chunk X of Y"
    pub fn label(&self) -> String {
        format!(
            "Validating chunk {} of {}",
            self.current_chunk, self.total_chunks
        )
    }
}

/// Shared state written by the validation worker.
pub(crate) struct ProgressState {
    status: AtomicU8,
    current_chunk: AtomicU32,
    /// 0 = no failing chunk (indices are 1-based).
    failure_chunk: AtomicU32,
    bytes_verified: AtomicU64,
    total_chunks: u32,
    total_bytes: u64,
}

impl ProgressState {
    pub(crate) fn new(total_chunks: u32, total_bytes: u64) -> Self {
        Self {
            status: AtomicU8::new(ValidationStatus::Pending as u8),
            current_chunk: AtomicU32::new(0),
            failure_chunk: AtomicU32::new(0),
            bytes_verified: AtomicU64::new(0),
            total_chunks,
            total_bytes,
        }
    }

    /// `Pending -> InProgress`. Returns false if the run was already started.
    pub(crate) fn begin(&self) -> bool {
        self.status
            .compare_exchange(
                ValidationStatus::Pending as u8,
                ValidationStatus::InProgress as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn enter_chunk(&self, index: u32) {
        // never lowers the counter
        self.current_chunk.fetch_max(index, Ordering::Release);
    }

    pub(crate) fn add_bytes(&self, n: u64) {
        self.bytes_verified.fetch_add(n, Ordering::Release);
    }

    /// Publish a terminal status. `failure_chunk` is recorded first so it is
    /// visible to anyone who observes the status.
    pub(crate) fn finish(&self, status: ValidationStatus, failure_chunk: Option<u32>) {
        debug_assert!(status.is_terminal());
        if let Some(idx) = failure_chunk {
            self.failure_chunk.store(idx, Ordering::Relaxed);
        }
        self.status.store(status as u8, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        let status = ValidationStatus::from_u8(self.status.load(Ordering::Acquire));
        let failure = self.failure_chunk.load(Ordering::Relaxed);
        ProgressSnapshot {
            status,
            current_chunk: self.current_chunk.load(Ordering::Acquire),
            total_chunks: self.total_chunks,
            failure_chunk_index: (status == ValidationStatus::Failure && failure != 0)
                .then_some(failure),
            bytes_verified: self.bytes_verified.load(Ordering::Acquire),
            total_bytes: self.total_bytes,
        }
    }
}

/// Cloneable read-only view of a validation run.
#[derive(Clone)]
pub struct ProgressHandle {
    state: Arc<ProgressState>,
}

impl ProgressHandle {
    pub(crate) fn new(state: Arc<ProgressState>) -> Self {
        Self { state }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.snapshot()
    }

    /// Poll every `interval` until the run is terminal and return the final snapshot.
    pub fn wait(&self, interval: Duration) -> ProgressSnapshot {
        self.wait_with(interval, |_| {})
    }

    /// Like `wait`, calling `on_poll` with every snapshot taken (including the last).
    pub fn wait_with<F>(&self, interval: Duration, mut on_poll: F) -> ProgressSnapshot
    where
        F: FnMut(&ProgressSnapshot),
    {
        loop {
            let snap = self.snapshot();
            on_poll(&snap);
            if snap.is_terminal() {
                return snap;
            }
            thread::sleep(interval);
        }
    }
}

impl std::fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProgressHandle").field(&self.snapshot()).finish()
    }
}
