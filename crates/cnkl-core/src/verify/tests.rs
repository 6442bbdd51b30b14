use super::*;
use crate::chunklist::{ChunkMethod, ChunklistManifest};
use std::io::{Cursor, Write};
use std::time::Duration;

/// Reader that counts how many bytes were handed out.
struct CountingReader<R> {
    inner: R,
    consumed: Arc<std::sync::atomic::AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed
            .fetch_add(n as u64, std::sync::atomic::Ordering::Relaxed);
        Ok(n)
    }
}

fn synthetic(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn scenario() -> (Vec<u8>, ChunklistManifest) {
    let data = synthetic(2560);
    let m = ChunklistManifest::for_data(ChunkMethod::Sha256, &data, &[1024, 1024, 512]);
    (data, m)
}

#[test]
fn intact_data_succeeds() {
    let (data, m) = scenario();
    let v = ChunklistVerification::new("mem", m);
    v.validate_reader(Cursor::new(data), &CancelToken::new())
        .unwrap();
    let snap = v.snapshot();
    assert_eq!(snap.status, ValidationStatus::Success);
    assert_eq!(snap.current_chunk, 3);
    assert_eq!(snap.total_chunks, 3);
    assert_eq!(snap.bytes_verified, 2560);
    assert_eq!(snap.failure_chunk_index, None);
}

#[test]
fn flipped_byte_fails_fast_on_that_chunk() {
    let (mut data, m) = scenario();
    data[1500] ^= 0x01;
    let consumed = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let reader = CountingReader {
        inner: Cursor::new(data),
        consumed: Arc::clone(&consumed),
    };
    let v = ChunklistVerification::new("mem", m);
    let err = v.validate_reader(reader, &CancelToken::new()).unwrap_err();
    match &err {
        VerifyError::ChunkMismatch {
            chunk,
            expected,
            actual,
        } => {
            assert_eq!(*chunk, 2);
            assert_eq!(expected.len(), 32);
            assert_ne!(expected, actual);
        }
        other => panic!("expected ChunkMismatch, got {other:?}"),
    }
    assert!(err.is_corruption());
    let snap = v.snapshot();
    assert_eq!(snap.status, ValidationStatus::Failure);
    assert_eq!(snap.failure_chunk_index, Some(2));
    assert_eq!(snap.current_chunk, 2);
    assert_eq!(snap.bytes_verified, 1024);
    // chunk 3 was never read
    assert_eq!(consumed.load(std::sync::atomic::Ordering::Relaxed), 2048);
}

#[test]
fn first_chunk_corruption_reports_index_one() {
    let (mut data, m) = scenario();
    data[0] ^= 0xff;
    let v = ChunklistVerification::new("mem", m);
    let err = v
        .validate_reader(Cursor::new(data), &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.chunk(), Some(1));
    assert_eq!(v.snapshot().failure_chunk_index, Some(1));
    assert_eq!(v.snapshot().bytes_verified, 0);
}

#[test]
fn trailing_bytes_are_ignored() {
    let (mut data, m) = scenario();
    data.extend_from_slice(b"trailer");
    let v = ChunklistVerification::new("mem", m);
    assert!(v
        .validate_reader(Cursor::new(data), &CancelToken::new())
        .is_ok());
}

#[test]
fn short_file_reports_truncated_chunk() {
    let (data, m) = scenario();
    let v = ChunklistVerification::new("mem", m);
    let err = v
        .validate_reader(Cursor::new(&data[..2100]), &CancelToken::new())
        .unwrap_err();
    match err {
        VerifyError::Truncated {
            chunk,
            expected,
            read,
        } => {
            assert_eq!(chunk, 3);
            assert_eq!(expected, 512);
            assert_eq!(read, 52);
        }
        other => panic!("expected Truncated, got {other:?}"),
    }
    assert_eq!(v.snapshot().failure_chunk_index, Some(3));
}

#[test]
fn cancelled_before_start_does_no_work() {
    let (data, m) = scenario();
    let cancel = CancelToken::new();
    cancel.cancel();
    let v = ChunklistVerification::new("mem", m);
    let err = v.validate_reader(Cursor::new(data), &cancel).unwrap_err();
    assert!(matches!(err, VerifyError::Cancelled { chunk: 1 }));
    let snap = v.snapshot();
    assert_eq!(snap.status, ValidationStatus::Cancelled);
    assert_eq!(snap.current_chunk, 0);
    assert_eq!(snap.bytes_verified, 0);
    assert_eq!(snap.failure_chunk_index, None);
}

/// Reader that trips the cancel token once `after` bytes have been handed out.
struct CancelAfter<R> {
    inner: R,
    after: u64,
    seen: u64,
    cancel: CancelToken,
}

impl<R: Read> Read for CancelAfter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.seen += n as u64;
        if self.seen >= self.after {
            self.cancel.cancel();
        }
        Ok(n)
    }
}

#[test]
fn cancel_mid_run_leaves_current_chunk_at_last_verified() {
    let (data, m) = scenario();
    let cancel = CancelToken::new();
    let reader = CancelAfter {
        inner: Cursor::new(data),
        after: 1024,
        seen: 0,
        cancel: cancel.clone(),
    };
    let v = ChunklistVerification::new("mem", m);
    let err = v.validate_reader(reader, &cancel).unwrap_err();
    assert!(matches!(err, VerifyError::Cancelled { chunk: 2 }));
    let snap = v.snapshot();
    assert_eq!(snap.status, ValidationStatus::Cancelled);
    assert_eq!(snap.current_chunk, 1);
    assert_eq!(snap.bytes_verified, 1024);
    assert_eq!(snap.failure_chunk_index, None);
}

#[test]
fn second_validate_is_rejected_without_touching_state() {
    let (data, m) = scenario();
    let v = ChunklistVerification::new("mem", m);
    v.validate_reader(Cursor::new(data.clone()), &CancelToken::new())
        .unwrap();
    let before = v.snapshot();
    let err = v
        .validate_reader(Cursor::new(data), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, VerifyError::AlreadyStarted));
    assert_eq!(v.snapshot(), before);
}

#[test]
fn empty_chunklist_succeeds_immediately() {
    let m = ChunklistManifest::from_records(ChunkMethod::Sha256, Vec::new());
    let v = ChunklistVerification::new("mem", m);
    v.validate_reader(io::empty(), &CancelToken::new()).unwrap();
    let snap = v.snapshot();
    assert_eq!(snap.status, ValidationStatus::Success);
    assert_eq!(snap.current_chunk, 0);
    assert_eq!(snap.total_chunks, 0);
}

#[test]
fn sha1_chunklist_validates() {
    let data = synthetic(300);
    let m = ChunklistManifest::for_data(ChunkMethod::Sha1, &data, &[100, 100, 100]);
    let v = ChunklistVerification::new("mem", m);
    v.validate_reader(Cursor::new(data), &CancelToken::new())
        .unwrap();
    assert_eq!(v.snapshot().status, ValidationStatus::Success);
}

#[test]
fn from_bytes_maps_parse_errors() {
    let err = ChunklistVerification::from_bytes("x", b"CNKL").err().unwrap();
    assert!(matches!(err, VerifyError::MalformedManifest(_)));

    let (_, m) = scenario();
    let mut bytes = m.encode();
    bytes[9] = 42;
    let err = ChunklistVerification::from_bytes("x", &bytes).err().unwrap();
    assert!(matches!(err, VerifyError::UnsupportedAlgorithm(42)));
}

#[test]
fn missing_file_is_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (_, m) = scenario();
    let v = ChunklistVerification::new(dir.path().join("absent.pkg"), m);
    let err = v.validate(&CancelToken::new()).unwrap_err();
    assert!(matches!(err, VerifyError::Io { chunk: None, .. }));
    assert!(!err.is_corruption());
    let snap = v.snapshot();
    assert_eq!(snap.status, ValidationStatus::Failure);
    assert_eq!(snap.failure_chunk_index, None);
}

#[test]
fn spawned_run_is_in_progress_before_worker_starts() {
    let (data, m) = scenario();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(&data).unwrap();
    f.flush().unwrap();

    let v = ChunklistVerification::new(f.path(), m);
    let task = v.spawn(CancelToken::new()).unwrap();
    let first = task.snapshot();
    assert_ne!(first.status, ValidationStatus::Pending);

    let mut last_chunk = 0;
    let last = task.progress().wait_with(Duration::from_millis(1), |s| {
        assert!(s.current_chunk >= last_chunk);
        assert!(s.current_chunk <= s.total_chunks);
        last_chunk = s.current_chunk;
    });
    task.join().unwrap();
    assert_eq!(last.status, ValidationStatus::Success);
    assert_eq!(last.current_chunk, 3);
}

#[test]
fn user_messages_point_at_chunk() {
    let err = VerifyError::ChunkMismatch {
        chunk: 7,
        expected: vec![0; 32],
        actual: vec![1; 32],
    };
    assert!(err.user_message().contains("chunk 7"));
    assert!(err.user_message().contains("stable connection"));
    assert!(err.to_string().contains(&"00".repeat(32)));
}
