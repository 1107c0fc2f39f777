//! Native mapping primitives.
//!
//! Both backends export the same set of functions so the mapping algorithm in
//! [`crate::mmap`] is written once:
//!
//! | operation        | Unix        | Windows                                   |
//! |------------------|-------------|-------------------------------------------|
//! | open file        | `open`      | `CreateFile`                              |
//! | query size       | `fstat`     | `GetFileSizeEx`                           |
//! | create mapping   | `mmap`      | `CreateFileMappingW` + `MapViewOfFile`    |
//! | flush            | `msync`     | `FlushViewOfFile` + `FlushFileBuffers`    |
//! | remove mapping   | `munmap`    | `UnmapViewOfFile` + `CloseHandle`         |
//! | close file       | `close`     | `CloseHandle`                             |
//! | granularity      | `sysconf`   | `GetSystemInfo`                           |
//!
//! On Windows a mapping owns a second OS object (the file-mapping handle);
//! [`RawMapping`] carries it there and nowhere else.

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod windows;
        pub use self::windows::{RawFileHandle, INVALID_HANDLE};
        pub(crate) use self::windows::{
            allocation_granularity, close, file_size, flush, is_valid_handle, map, open_file,
            raw_handle_of, unmap, RawMapping,
        };
    } else {
        mod unix;
        pub use self::unix::{RawFileHandle, INVALID_HANDLE};
        pub(crate) use self::unix::{
            allocation_granularity, close, file_size, flush, is_valid_handle, map, open_file,
            raw_handle_of, unmap, RawMapping,
        };
    }
}
