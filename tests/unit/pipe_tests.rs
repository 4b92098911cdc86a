use std::os::unix::fs::FileTypeExt;

use fifoline::pipes::{ensure_fifo, open_duplex};
use fifoline::AppError;

#[test]
fn creates_fifo_when_absent() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("a.pipe");

    ensure_fifo(&path).expect("fifo created");

    let meta = std::fs::metadata(&path).expect("metadata");
    assert!(meta.file_type().is_fifo(), "entry should be a fifo");
}

#[test]
fn is_idempotent() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("a.pipe");

    ensure_fifo(&path).expect("first call");
    ensure_fifo(&path).expect("second call is a no-op");

    let meta = std::fs::metadata(&path).expect("metadata");
    assert!(meta.file_type().is_fifo());
}

#[test]
fn leaves_existing_regular_file_untouched() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("already-here");
    std::fs::write(&path, b"keep me").expect("write file");

    ensure_fifo(&path).expect("existing entry is left alone");

    let meta = std::fs::metadata(&path).expect("metadata");
    assert!(meta.file_type().is_file(), "entry should still be a file");
    assert_eq!(std::fs::read(&path).expect("read back"), b"keep me");
}

#[test]
fn surfaces_creation_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("missing-dir").join("a.pipe");

    match ensure_fifo(&path) {
        Err(AppError::Pipe(msg)) => assert!(msg.contains("failed to create")),
        other => panic!("expected pipe error, got {other:?}"),
    }
}

#[test]
fn duplex_open_does_not_block_without_peer() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("a.pipe");
    ensure_fifo(&path).expect("fifo created");

    // A read-only open would block here until a writer appears; the
    // duplex open must return immediately.
    let handle = open_duplex(&path).expect("duplex open succeeds");
    drop(handle);
}

#[test]
fn duplex_open_surfaces_missing_path() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("never-created");

    match open_duplex(&path) {
        Err(AppError::Pipe(msg)) => assert!(msg.contains("failed to open")),
        other => panic!("expected pipe error, got {other:?}"),
    }
}
