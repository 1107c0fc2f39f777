#![cfg(feature = "async")]
//! Async helpers: mapping and syncing on tokio's blocking pool.

use mmap_region::{MappedRegion, MmapMode};
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "mmap_region_async_test_{}_{}",
        name,
        std::process::id()
    ));
    p
}

#[tokio::test(flavor = "multi_thread")]
async fn open_async_then_sync_async() {
    let path = tmp_path("open_async_then_sync_async");
    fs::write(&path, vec![0u8; 1024]).expect("write");

    let mut region = MappedRegion::open_async(&path, 128, 11, MmapMode::ReadWrite)
        .await
        .expect("open_async");
    region.write_at(0, b"ASYNC-SYNCD").expect("write");

    let (region, result) = region.sync_async().await.expect("join");
    result.expect("sync");
    assert_eq!(region.as_slice(), b"ASYNC-SYNCD");

    let on_disk = fs::read(&path).expect("read");
    assert_eq!(&on_disk[128..139], b"ASYNC-SYNCD");

    let _ = fs::remove_file(&path);
}

#[tokio::test(flavor = "multi_thread")]
async fn open_async_propagates_errors() {
    let path = tmp_path("open_async_propagates_errors");
    fs::write(&path, b"short").expect("write");

    let err = MappedRegion::open_async(&path, 0, 100, MmapMode::ReadOnly)
        .await
        .expect_err("past end");
    assert_eq!(err.kind(), mmap_region::ErrorKind::InvalidArgument);

    let _ = fs::remove_file(&path);
}
