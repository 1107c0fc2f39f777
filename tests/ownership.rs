//! Move, swap, equality and handle-ownership behaviour.

use mmap_region::{MappedRegion, MmapMode};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mmap_region_own_test_{}_{}", name, std::process::id()));
    p
}

#[test]
fn take_leaves_source_unmapped() {
    let path = tmp_path("take_leaves_source_unmapped");
    fs::write(&path, b"moved bytes").expect("write");

    let mut a = MappedRegion::open(&path, MmapMode::ReadOnly).expect("map");
    let before = a.as_slice().to_vec();

    let b = std::mem::take(&mut a);
    assert!(!a.is_open());
    assert!(a.as_ptr().is_null());
    assert_eq!(b.as_slice(), &before[..]);
    assert_eq!(b.len(), before.len());

    drop(a);
    assert_eq!(b.as_slice(), b"moved bytes");

    let _ = fs::remove_file(&path);
}

#[test]
fn assignment_releases_previous_region() {
    let path_a = tmp_path("assignment_a");
    let path_b = tmp_path("assignment_b");
    fs::write(&path_a, b"AAAA").expect("write a");
    fs::write(&path_b, b"BBBBBB").expect("write b");

    let mut a = MappedRegion::open(&path_a, MmapMode::ReadOnly).expect("map a");
    let mut b = MappedRegion::open(&path_b, MmapMode::ReadOnly).expect("map b");
    assert_eq!(b.len(), 6);

    b = std::mem::take(&mut a);
    assert_eq!(b.as_slice(), b"AAAA");
    assert!(!a.is_mapped());

    let _ = fs::remove_file(&path_a);
    let _ = fs::remove_file(&path_b);
}

#[test]
fn swap_exchanges_regions() {
    let path = tmp_path("swap_exchanges_regions");
    fs::write(&path, b"0123456789").expect("write");

    let mut a = MappedRegion::open_range(&path, 0, 4, MmapMode::ReadOnly).expect("map a");
    let mut b = MappedRegion::new();

    a.swap(&mut b);
    assert!(!a.is_mapped());
    assert_eq!(b.as_slice(), b"0123");

    let mut c = MappedRegion::open_range(&path, 5, 5, MmapMode::ReadWrite).expect("map c");
    b.swap(&mut c);
    assert_eq!(b.as_slice(), b"56789");
    assert!(!b.is_read_only());
    assert_eq!(c.as_slice(), b"0123");
    assert!(c.is_read_only());

    let _ = fs::remove_file(&path);
}

#[test]
fn equality_rules() {
    let path = tmp_path("equality_rules");
    fs::write(&path, b"abcabcabc").expect("write");

    let first = MappedRegion::open_range(&path, 0, 3, MmapMode::ReadOnly).expect("first");
    let same_range = MappedRegion::open_range(&path, 0, 3, MmapMode::ReadOnly).expect("same");
    let same_bytes = MappedRegion::open_range(&path, 3, 3, MmapMode::ReadOnly).expect("bytes");
    let longer = MappedRegion::open_range(&path, 0, 4, MmapMode::ReadOnly).expect("longer");
    let different = MappedRegion::open_range(&path, 1, 3, MmapMode::ReadOnly).expect("diff");

    assert_eq!(first, same_range);
    assert_eq!(first, same_bytes);
    assert_ne!(first, longer);
    assert_ne!(first, different);

    assert_eq!(MappedRegion::new(), MappedRegion::default());
    assert_ne!(first, MappedRegion::new());
    assert_ne!(MappedRegion::new(), first);

    let _ = fs::remove_file(&path);
}

#[test]
fn external_file_stays_usable_after_drop() {
    let path = tmp_path("external_file_stays_usable");
    fs::write(&path, b"external handle").expect("write");

    let mut file = File::open(&path).expect("open");
    {
        let region = MappedRegion::from_file(&file, 0, 8, MmapMode::ReadOnly).expect("map");
        assert_eq!(region.as_slice(), b"external");
    }

    file.seek(SeekFrom::Start(9)).expect("seek");
    let mut rest = String::new();
    file.read_to_string(&mut rest).expect("read after drop");
    assert_eq!(rest, "handle");

    let _ = fs::remove_file(&path);
}

#[test]
fn file_handle_and_mapping_handle_accessors() {
    let path = tmp_path("handle_accessors");
    fs::write(&path, b"handles").expect("write");

    let file = File::open(&path).expect("open");
    let mut region = MappedRegion::from_file(&file, 0, 0, MmapMode::ReadOnly).expect("map");
    assert!(region.is_mapped());
    assert_ne!(region.file_handle(), mmap_region::INVALID_HANDLE);
    assert_ne!(region.mapping_handle(), mmap_region::INVALID_HANDLE);

    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        assert_eq!(region.file_handle(), file.as_raw_fd());
        assert_eq!(region.mapping_handle(), file.as_raw_fd());
    }

    region.unmap();
    assert_eq!(region.file_handle(), mmap_region::INVALID_HANDLE);
    assert_eq!(region.mapping_handle(), mmap_region::INVALID_HANDLE);

    let _ = fs::remove_file(&path);
}

#[test]
fn regions_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MappedRegion>();

    let path = tmp_path("regions_are_send_and_sync");
    fs::write(&path, b"threaded").expect("write");

    let region = MappedRegion::open(&path, MmapMode::ReadOnly).expect("map");
    let handle = std::thread::spawn(move || region.as_slice().to_vec());
    assert_eq!(handle.join().expect("join"), b"threaded");

    let _ = fs::remove_file(&path);
}
