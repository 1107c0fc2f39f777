//! Windows backend: `CreateFileMappingW`, `MapViewOfFile`, `FlushViewOfFile`.

use std::fs::{File, OpenOptions};
use std::io;
use std::mem::MaybeUninit;
use std::os::windows::io::{AsRawHandle, IntoRawHandle, RawHandle};
use std::path::Path;
use std::ptr::{self, NonNull};

use crate::errors::{report_teardown, TeardownStep};
use crate::mmap::MmapMode;

/// Raw OS file handle type (a `HANDLE` on Windows).
pub type RawFileHandle = RawHandle;

/// Sentinel for "no file handle" (`INVALID_HANDLE_VALUE`).
pub const INVALID_HANDLE: RawFileHandle = -1isize as RawFileHandle;

const PAGE_READONLY: u32 = 0x02;
const PAGE_READWRITE: u32 = 0x04;
const FILE_MAP_WRITE: u32 = 0x0002;
const FILE_MAP_READ: u32 = 0x0004;

#[allow(non_snake_case)]
#[repr(C)]
struct SYSTEM_INFO {
    wProcessorArchitecture: u16,
    wReserved: u16,
    dwPageSize: u32,
    lpMinimumApplicationAddress: *mut core::ffi::c_void,
    lpMaximumApplicationAddress: *mut core::ffi::c_void,
    dwActiveProcessorMask: usize,
    dwNumberOfProcessors: u32,
    dwProcessorType: u32,
    dwAllocationGranularity: u32,
    wProcessorLevel: u16,
    wProcessorRevision: u16,
}

#[allow(non_snake_case)]
extern "system" {
    fn GetSystemInfo(lpSystemInfo: *mut SYSTEM_INFO);
    fn GetFileSizeEx(hFile: RawHandle, lpFileSize: *mut i64) -> i32;
    fn CreateFileMappingW(
        hFile: RawHandle,
        lpFileMappingAttributes: *mut core::ffi::c_void,
        flProtect: u32,
        dwMaximumSizeHigh: u32,
        dwMaximumSizeLow: u32,
        lpName: *const u16,
    ) -> RawHandle;
    fn MapViewOfFile(
        hFileMappingObject: RawHandle,
        dwDesiredAccess: u32,
        dwFileOffsetHigh: u32,
        dwFileOffsetLow: u32,
        dwNumberOfBytesToMap: usize,
    ) -> *mut core::ffi::c_void;
    fn FlushViewOfFile(lpBaseAddress: *const core::ffi::c_void, dwNumberOfBytesToFlush: usize)
        -> i32;
    fn FlushFileBuffers(hFile: RawHandle) -> i32;
    fn UnmapViewOfFile(lpBaseAddress: *const core::ffi::c_void) -> i32;
    fn CloseHandle(hObject: RawHandle) -> i32;
}

/// A mapped view together with the file-mapping object backing it.
#[derive(Debug)]
pub(crate) struct RawMapping {
    base: NonNull<u8>,
    len: usize,
    mapping: RawHandle,
}

impl RawMapping {
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn mapping_handle(&self, _file: RawFileHandle) -> RawFileHandle {
        self.mapping
    }
}

pub(crate) fn allocation_granularity() -> usize {
    let mut sysinfo = MaybeUninit::<SYSTEM_INFO>::uninit();
    // SAFETY: GetSystemInfo always fills the provided struct.
    unsafe {
        GetSystemInfo(sysinfo.as_mut_ptr());
        sysinfo.assume_init().dwAllocationGranularity as usize
    }
}

pub(crate) fn is_valid_handle(handle: RawFileHandle) -> bool {
    !handle.is_null() && handle != INVALID_HANDLE
}

pub(crate) fn raw_handle_of(file: &File) -> RawFileHandle {
    file.as_raw_handle()
}

pub(crate) fn open_file(path: &Path, mode: MmapMode) -> io::Result<RawFileHandle> {
    let file = OpenOptions::new()
        .read(true)
        .write(mode == MmapMode::ReadWrite)
        .open(path)?;
    Ok(file.into_raw_handle())
}

#[allow(clippy::cast_sign_loss)]
pub(crate) fn file_size(handle: RawFileHandle) -> io::Result<u64> {
    let mut size: i64 = 0;
    // SAFETY: GetFileSizeEx only writes the out parameter.
    if unsafe { GetFileSizeEx(handle, &mut size) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(size.max(0) as u64)
}

#[allow(clippy::cast_possible_truncation)]
fn split_u64(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

/// Map `len` bytes of `handle` starting at `offset`.
///
/// # Safety
///
/// `offset` must be a multiple of [`allocation_granularity`] and `len` non-zero.
/// The returned view stays valid until passed to [`unmap`].
pub(crate) unsafe fn map(
    handle: RawFileHandle,
    offset: u64,
    len: usize,
    mode: MmapMode,
) -> io::Result<RawMapping> {
    let (protect, access) = match mode {
        MmapMode::ReadOnly => (PAGE_READONLY, FILE_MAP_READ),
        MmapMode::ReadWrite => (PAGE_READWRITE, FILE_MAP_WRITE),
    };
    let (max_high, max_low) = split_u64(offset + len as u64);
    let mapping = CreateFileMappingW(
        handle,
        ptr::null_mut(),
        protect,
        max_high,
        max_low,
        ptr::null(),
    );
    if mapping.is_null() {
        return Err(io::Error::last_os_error());
    }

    let (off_high, off_low) = split_u64(offset);
    let view = MapViewOfFile(mapping, access, off_high, off_low, len);
    let Some(base) = NonNull::new(view.cast::<u8>()) else {
        let err = io::Error::last_os_error();
        CloseHandle(mapping);
        return Err(err);
    };
    Ok(RawMapping { base, len, mapping })
}

/// Flush the view and then the file's buffers.
///
/// # Safety
///
/// `mapping` must be live (not yet passed to [`unmap`]).
pub(crate) unsafe fn flush(handle: RawFileHandle, mapping: &RawMapping) -> io::Result<()> {
    if FlushViewOfFile(mapping.base.as_ptr().cast(), mapping.len) == 0 {
        return Err(io::Error::last_os_error());
    }
    if FlushFileBuffers(handle) == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Unmap the view and close the mapping object. Failures are reported, not returned.
///
/// # Safety
///
/// No references into the view may outlive this call.
pub(crate) unsafe fn unmap(mapping: RawMapping) {
    if UnmapViewOfFile(mapping.base.as_ptr().cast()) == 0 {
        report_teardown(TeardownStep::Unmap, io::Error::last_os_error());
    }
    if CloseHandle(mapping.mapping) == 0 {
        report_teardown(TeardownStep::CloseMapping, io::Error::last_os_error());
    }
}

pub(crate) fn close(handle: RawFileHandle) -> io::Result<()> {
    // SAFETY: closing a handle this crate owns.
    if unsafe { CloseHandle(handle) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
