mod common;

use assert_matches::assert_matches;

use cocotext_inspect::error::CocoError;
use cocotext_inspect::fs_util::extract_zip;
use cocotext_inspect::progress::ProgressEvent;

use common::{RecordingSink, zip_bytes};

#[test]
fn extracts_nested_entries_with_identical_content() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("data.zip");
    std::fs::write(
        &archive,
        zip_bytes(&[("a.txt", &b"alpha"[..]), ("sub/", &b""[..]), ("sub/b.txt", &b"beta\n"[..])]),
    )
    .unwrap();
    let out = temp.path().join("out");

    let sink = RecordingSink::default();
    let entries = extract_zip(&archive, &out, &sink).unwrap();

    assert_eq!(entries, 3);
    assert_eq!(std::fs::read(out.join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(out.join("sub/b.txt")).unwrap(), b"beta\n");

    let events = sink.events.lock().unwrap();
    assert_matches!(
        events.first(),
        Some(ProgressEvent::Started { total: Some(3), .. })
    );
    drop(events);
    assert_eq!(sink.advanced_total(), 3);
}

#[test]
fn overwrites_existing_files() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("data.zip");
    std::fs::write(&archive, zip_bytes(&[("a.txt", &b"fresh"[..])])).unwrap();
    std::fs::write(temp.path().join("a.txt"), b"stale contents").unwrap();

    extract_zip(&archive, temp.path(), &RecordingSink::default()).unwrap();
    assert_eq!(std::fs::read(temp.path().join("a.txt")).unwrap(), b"fresh");
}

#[test]
fn missing_or_corrupt_archive_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("absent.zip");
    assert_matches!(
        extract_zip(&missing, temp.path(), &RecordingSink::default()),
        Err(CocoError::Archive(_))
    );

    let corrupt = temp.path().join("corrupt.zip");
    std::fs::write(&corrupt, b"definitely not a zip").unwrap();
    assert_matches!(
        extract_zip(&corrupt, temp.path(), &RecordingSink::default()),
        Err(CocoError::Archive(_))
    );
}
