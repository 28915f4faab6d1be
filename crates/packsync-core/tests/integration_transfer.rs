//! Integration test: single-file transfers against a local HTTP server.
//!
//! Covers mirror fallback, digest verification, and same-URL retries.

mod common;

use common::file_server::{FileServer, Route};
use packsync_core::checksum::{digest, HashAlgorithm};
use packsync_core::error::TransferError;
use packsync_core::manifest::FileEntry;
use packsync_core::retry::RetryPolicy;
use packsync_core::transfer::{transfer, DownloadTask, TransferOptions};
use std::time::Duration;
use tempfile::tempdir;

const BODY: &[u8] = b"hello";
const BODY_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
const BODY_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

fn opts() -> TransferOptions {
    TransferOptions {
        connect_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(10),
        ..TransferOptions::default()
    }
}

#[test]
fn primary_failure_falls_back_to_mirror() {
    let server = FileServer::start(vec![("/primary/a.jar", Route::status(500)), ("/mirror/a.jar", Route::ok(BODY))]);
    let dir = tempdir().unwrap();
    let entry = FileEntry::new("a.jar", "mods", server.url("/primary/a.jar"))
        .with_mirrors([server.url("/mirror/a.jar")])
        .with_hash(HashAlgorithm::Sha1, BODY_SHA1);
    let task = DownloadTask::for_install(dir.path(), entry).unwrap();

    let outcome = transfer(&task, &opts()).unwrap();

    assert_eq!(outcome.url, server.url("/mirror/a.jar"));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.bytes, BODY.len() as u64);
    assert_eq!(std::fs::read(dir.path().join("mods/a.jar")).unwrap(), BODY);
    assert_eq!(server.hits("/primary/a.jar"), 1);
}

#[test]
fn corrupt_primary_recovers_from_mirror() {
    let server = FileServer::start(vec![
        ("/primary/a.jar", Route::ok(b"hellp".to_vec())),
        ("/mirror/a.jar", Route::ok(BODY)),
    ]);
    let dir = tempdir().unwrap();
    let entry = FileEntry::new("a.jar", "mods", server.url("/primary/a.jar"))
        .with_mirrors([server.url("/mirror/a.jar")])
        .with_hash(HashAlgorithm::Sha1, BODY_SHA1);
    let task = DownloadTask::for_install(dir.path(), entry).unwrap();

    let outcome = transfer(&task, &opts()).unwrap();

    assert_eq!(outcome.url, server.url("/mirror/a.jar"));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(server.hits("/primary/a.jar"), 1);
    let on_disk = dir.path().join("mods/a.jar");
    assert_eq!(std::fs::read(&on_disk).unwrap(), BODY);
    assert_eq!(digest(&on_disk, HashAlgorithm::Sha1).unwrap(), BODY_SHA1);
}

#[test]
fn corrupt_body_on_every_url_leaves_nothing_behind() {
    let server = FileServer::start(vec![
        ("/primary/a.jar", Route::ok(b"corrupt".to_vec())),
        ("/mirror/a.jar", Route::ok(b"also corrupt".to_vec())),
    ]);
    let dir = tempdir().unwrap();
    let entry = FileEntry::new("a.jar", "mods", server.url("/primary/a.jar"))
        .with_mirrors([server.url("/mirror/a.jar")])
        .with_hash(HashAlgorithm::Sha1, BODY_SHA1);
    let task = DownloadTask::for_install(dir.path(), entry).unwrap();

    let err = transfer(&task, &opts()).unwrap_err();

    match err {
        TransferError::ExhaustedMirrors {
            file,
            attempted_urls,
            last_error,
        } => {
            assert_eq!(file, "mods/a.jar");
            assert_eq!(attempted_urls.len(), 2);
            assert!(last_error.contains("mismatch"), "{}", last_error);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!dir.path().join("mods/a.jar").exists());
}

#[test]
fn sha256_entries_verify() {
    let server = FileServer::start(vec![("/a.cfg", Route::ok(BODY))]);
    let dir = tempdir().unwrap();
    let entry = FileEntry::new("a.cfg", "config", server.url("/a.cfg")).with_hash(HashAlgorithm::Sha256, BODY_SHA256);
    let task = DownloadTask::for_install(dir.path(), entry).unwrap();

    transfer(&task, &opts()).unwrap();

    let on_disk = digest(&dir.path().join("config/a.cfg"), HashAlgorithm::Sha256).unwrap();
    assert_eq!(on_disk, BODY_SHA256);
}

#[test]
fn unhashed_entry_is_written_as_served() {
    let server = FileServer::start(vec![("/notes.txt", Route::ok(b"anything".to_vec()))]);
    let dir = tempdir().unwrap();
    let task = DownloadTask::for_install(dir.path(), FileEntry::new("notes.txt", "", server.url("/notes.txt"))).unwrap();

    transfer(&task, &opts()).unwrap();

    assert_eq!(std::fs::read(dir.path().join("notes.txt")).unwrap(), b"anything");
}

#[test]
fn transient_errors_retry_same_url_when_configured() {
    let server = FileServer::start(vec![("/flaky", Route::status(503)), ("/mirror", Route::ok(BODY))]);
    let dir = tempdir().unwrap();
    let entry = FileEntry::new("f.bin", "", server.url("/flaky"))
        .with_mirrors([server.url("/mirror")])
        .with_hash(HashAlgorithm::Sha1, BODY_SHA1);
    let task = DownloadTask::for_install(dir.path(), entry).unwrap();
    let opts = TransferOptions {
        retry: RetryPolicy::new(3),
        ..opts()
    };

    let outcome = transfer(&task, &opts).unwrap();

    assert_eq!(server.hits("/flaky"), 3);
    assert_eq!(outcome.attempts, 4);
}

#[test]
fn not_found_is_not_repeated() {
    let server = FileServer::start(vec![("/mirror", Route::ok(BODY))]);
    let dir = tempdir().unwrap();
    let entry = FileEntry::new("f.bin", "", server.url("/missing"))
        .with_mirrors([server.url("/mirror")])
        .with_hash(HashAlgorithm::Sha1, BODY_SHA1);
    let task = DownloadTask::for_install(dir.path(), entry).unwrap();
    let opts = TransferOptions {
        retry: RetryPolicy::new(3),
        ..opts()
    };

    transfer(&task, &opts).unwrap();

    assert_eq!(server.hits("/missing"), 1);
}

#[test]
fn existing_file_is_replaced() {
    let server = FileServer::start(vec![("/a.jar", Route::ok(BODY))]);
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("mods")).unwrap();
    std::fs::write(dir.path().join("mods/a.jar"), b"an older and much longer body").unwrap();
    let entry = FileEntry::new("a.jar", "mods", server.url("/a.jar")).with_hash(HashAlgorithm::Sha1, BODY_SHA1);
    let task = DownloadTask::for_install(dir.path(), entry).unwrap();

    transfer(&task, &opts()).unwrap();

    assert_eq!(std::fs::read(dir.path().join("mods/a.jar")).unwrap(), BODY);
}
