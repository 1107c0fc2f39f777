//! POSIX backend: `mmap`, `msync`, `munmap`.

use std::fs::{File, OpenOptions};
use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::path::Path;
use std::ptr::{self, NonNull};

use crate::errors::{report_teardown, TeardownStep};
use crate::mmap::MmapMode;

/// Raw OS file handle type (a file descriptor on Unix).
pub type RawFileHandle = RawFd;

/// Sentinel for "no file handle".
pub const INVALID_HANDLE: RawFileHandle = -1;

/// An established `mmap` region. The file descriptor doubles as the mapping
/// handle, so nothing else is owned.
#[derive(Debug)]
pub(crate) struct RawMapping {
    base: NonNull<u8>,
    len: usize,
}

impl RawMapping {
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn mapping_handle(&self, file: RawFileHandle) -> RawFileHandle {
        file
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn allocation_granularity() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE is safe to call.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    // sysconf only fails for unknown names; fall back to the common size anyway
    if page_size <= 0 {
        4096
    } else {
        page_size as usize
    }
}

pub(crate) fn is_valid_handle(handle: RawFileHandle) -> bool {
    handle >= 0
}

pub(crate) fn raw_handle_of(file: &File) -> RawFileHandle {
    file.as_raw_fd()
}

pub(crate) fn open_file(path: &Path, mode: MmapMode) -> io::Result<RawFileHandle> {
    let file = OpenOptions::new()
        .read(true)
        .write(mode == MmapMode::ReadWrite)
        .open(path)?;
    Ok(file.into_raw_fd())
}

#[allow(clippy::cast_sign_loss)]
pub(crate) fn file_size(handle: RawFileHandle) -> io::Result<u64> {
    let mut st = MaybeUninit::<libc::stat>::uninit();
    // SAFETY: fstat only writes into the provided buffer; an invalid fd yields EBADF.
    let rc = unsafe { libc::fstat(handle, st.as_mut_ptr()) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: fstat succeeded and initialised the struct.
    let st = unsafe { st.assume_init() };
    Ok(st.st_size.max(0) as u64)
}

/// Map `len` bytes of `handle` starting at `offset` as a shared mapping.
///
/// # Safety
///
/// `offset` must be a multiple of [`allocation_granularity`] and `len` non-zero.
/// The returned memory stays valid until passed to [`unmap`].
pub(crate) unsafe fn map(
    handle: RawFileHandle,
    offset: u64,
    len: usize,
    mode: MmapMode,
) -> io::Result<RawMapping> {
    let prot = match mode {
        MmapMode::ReadOnly => libc::PROT_READ,
        MmapMode::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
    };
    let offset = libc::off_t::try_from(offset)
        .map_err(|_| io::Error::from_raw_os_error(libc::EOVERFLOW))?;
    let ptr = libc::mmap(ptr::null_mut(), len, prot, libc::MAP_SHARED, handle, offset);
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    let base = NonNull::new(ptr.cast::<u8>())
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned a null mapping"))?;
    Ok(RawMapping { base, len })
}

/// Write dirty pages of the mapping back to the file and wait for completion.
///
/// # Safety
///
/// `mapping` must be live (not yet passed to [`unmap`]).
pub(crate) unsafe fn flush(_handle: RawFileHandle, mapping: &RawMapping) -> io::Result<()> {
    let rc = libc::msync(mapping.base.as_ptr().cast(), mapping.len, libc::MS_SYNC);
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Remove the mapping. Failures are reported, not returned.
///
/// # Safety
///
/// No references into the mapping may outlive this call.
pub(crate) unsafe fn unmap(mapping: RawMapping) {
    if libc::munmap(mapping.base.as_ptr().cast(), mapping.len) != 0 {
        report_teardown(TeardownStep::Unmap, io::Error::last_os_error());
    }
}

pub(crate) fn close(handle: RawFileHandle) -> io::Result<()> {
    // SAFETY: closing a descriptor this crate owns; an invalid fd yields EBADF.
    if unsafe { libc::close(handle) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
