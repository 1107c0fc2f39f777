//! The mapped-region handle: owns a file-backed byte window and its OS resources.

use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::slice;

use crate::builder::MapOptions;
use crate::errors::{report_teardown, MmapError, Result, TeardownStep};
use crate::platform::{self, RawFileHandle, RawMapping, INVALID_HANDLE};
use crate::utils::{ensure_in_bounds, make_offset_page_aligned, slice_range};

/// Pass as `len` to map everything from `offset` to the end of the file.
pub const MAP_ENTIRE_FILE: usize = 0;

// Error message constants
const ERR_EMPTY_PATH: &str = "path must not be empty";
const ERR_EMPTY_REGION: &str = "cannot map an empty region";
const ERR_REGION_TOO_LARGE: &str = "region does not fit in the address space";

/// Access mode for a memory-mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MmapMode {
    /// Read-only mapping.
    #[default]
    ReadOnly,
    /// Read-write shared mapping; writes reach the file.
    ReadWrite,
}

/// A region of a file mapped into memory.
///
/// The visible window starts exactly at the requested file offset even though
/// the OS mapping itself starts at the page-aligned offset below it. Dropping
/// the value (or assigning over it) unmaps the region and closes the file
/// handle if this value opened it. Handles supplied by the caller are never
/// closed.
///
/// # Examples
///
/// ```no_run
/// use mmap_region::{MappedRegion, MmapMode};
///
/// let mut region = MappedRegion::open_range("data.bin", 100, 13, MmapMode::ReadWrite)?;
/// region.as_mut_slice()?.copy_from_slice(b"Hello, world!");
/// region.sync()?;
///
/// let ro = MappedRegion::open("data.bin", MmapMode::ReadOnly)?;
/// assert_eq!(&ro[100..113], b"Hello, world!");
/// # Ok::<(), mmap_region::MmapError>(())
/// ```
pub struct MappedRegion {
    data: Option<NonNull<u8>>,
    length: usize,
    mapping: Option<RawMapping>,
    file_handle: RawFileHandle,
    owns_handle: bool,
    mode: MmapMode,
}

// SAFETY: the region exclusively owns its mapping; shared access only reads
// through `&[u8]` and mutation requires `&mut self`.
unsafe impl Send for MappedRegion {}
// SAFETY: see above.
unsafe impl Sync for MappedRegion {}

impl MappedRegion {
    /// Create an unmapped region.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: None,
            length: 0,
            mapping: None,
            file_handle: INVALID_HANDLE,
            owns_handle: false,
            mode: MmapMode::ReadOnly,
        }
    }

    /// Start building a mapping with explicit offset, length and mode.
    #[must_use]
    pub fn options() -> MapOptions {
        MapOptions::new()
    }

    /// Open `path` and map the whole file.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_path`].
    pub fn open<P: AsRef<Path>>(path: P, mode: MmapMode) -> Result<Self> {
        Self::open_range(path, 0, MAP_ENTIRE_FILE, mode)
    }

    /// Open `path` and map `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_path`].
    pub fn open_range<P: AsRef<Path>>(
        path: P,
        offset: u64,
        len: usize,
        mode: MmapMode,
    ) -> Result<Self> {
        let mut region = Self::new();
        region.map_path(path, offset, len, mode)?;
        Ok(region)
    }

    /// Map the whole file behind a caller-owned handle.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_handle`].
    pub fn from_handle(handle: RawFileHandle, mode: MmapMode) -> Result<Self> {
        Self::from_handle_range(handle, 0, MAP_ENTIRE_FILE, mode)
    }

    /// Map `len` bytes at `offset` of the file behind a caller-owned handle.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_handle`].
    pub fn from_handle_range(
        handle: RawFileHandle,
        offset: u64,
        len: usize,
        mode: MmapMode,
    ) -> Result<Self> {
        let mut region = Self::new();
        region.map_handle(handle, offset, len, mode)?;
        Ok(region)
    }

    /// Map a region of an open [`File`]. The file stays owned by the caller
    /// and must outlive the region.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_handle`].
    pub fn from_file(file: &File, offset: u64, len: usize, mode: MmapMode) -> Result<Self> {
        Self::from_handle_range(platform::raw_handle_of(file), offset, len, mode)
    }

    /// Open `path` and map `len` bytes at `offset` (`MAP_ENTIRE_FILE` maps to
    /// the end of the file). The opened handle is owned by this region.
    ///
    /// Any existing mapping is released first, so on failure the region is
    /// left unmapped.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidArgument` if `path` is empty or the region is empty.
    /// Returns `MmapError::OutOfBounds` if the range reaches past end of file.
    /// Returns `MmapError::Io` if opening, sizing or mapping the file fails.
    pub fn map_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        offset: u64,
        len: usize,
        mode: MmapMode,
    ) -> Result<()> {
        self.unmap();
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(MmapError::InvalidArgument(ERR_EMPTY_PATH));
        }
        let handle = platform::open_file(path, mode).map_err(MmapError::from_os)?;
        self.attach(handle, true, offset, len, mode)
    }

    /// Map `len` bytes at `offset` of the file behind `handle`. The handle
    /// stays owned by the caller and is not closed by [`unmap`](Self::unmap).
    ///
    /// Any existing mapping is released first, so on failure the region is
    /// left unmapped.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::BadFileDescriptor` if `handle` is invalid or closed.
    /// Returns `MmapError::InvalidArgument` if the region is empty.
    /// Returns `MmapError::OutOfBounds` if the range reaches past end of file.
    /// Returns `MmapError::Io` if sizing or mapping the file fails.
    pub fn map_handle(
        &mut self,
        handle: RawFileHandle,
        offset: u64,
        len: usize,
        mode: MmapMode,
    ) -> Result<()> {
        self.unmap();
        if !platform::is_valid_handle(handle) {
            return Err(MmapError::BadFileDescriptor);
        }
        self.attach(handle, false, offset, len, mode)
    }

    /// Map a region of an open [`File`] owned by the caller.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_handle`].
    pub fn map_file(&mut self, file: &File, offset: u64, len: usize, mode: MmapMode) -> Result<()> {
        self.map_handle(platform::raw_handle_of(file), offset, len, mode)
    }

    fn attach(
        &mut self,
        handle: RawFileHandle,
        owns_handle: bool,
        offset: u64,
        len: usize,
        mode: MmapMode,
    ) -> Result<()> {
        self.file_handle = handle;
        self.owns_handle = owns_handle;
        self.mode = mode;
        let result = self.map_region(offset, len);
        if result.is_err() {
            self.unmap();
        }
        result
    }

    #[allow(clippy::cast_possible_truncation)]
    fn map_region(&mut self, offset: u64, len: usize) -> Result<()> {
        let file_size = platform::file_size(self.file_handle).map_err(MmapError::from_os)?;
        let length = if len == MAP_ENTIRE_FILE {
            ensure_in_bounds(offset, 0, file_size)?;
            usize::try_from(file_size - offset)
                .map_err(|_| MmapError::InvalidArgument(ERR_REGION_TOO_LARGE))?
        } else {
            ensure_in_bounds(offset, len as u64, file_size)?;
            len
        };
        if length == 0 {
            return Err(MmapError::InvalidArgument(ERR_EMPTY_REGION));
        }

        let aligned_offset = make_offset_page_aligned(offset);
        // less than one page, always fits
        let padding = (offset - aligned_offset) as usize;
        let length_to_map = padding
            .checked_add(length)
            .ok_or(MmapError::InvalidArgument(ERR_REGION_TOO_LARGE))?;

        // SAFETY: aligned_offset is granularity-aligned and length_to_map is non-zero.
        let mapping =
            unsafe { platform::map(self.file_handle, aligned_offset, length_to_map, self.mode) }
                .map_err(MmapError::from_os)?;
        // SAFETY: padding < length_to_map, so the pointer stays inside the mapping.
        let data = unsafe { NonNull::new_unchecked(mapping.base().as_ptr().add(padding)) };

        log::debug!(
            "mapped {length} bytes at offset {offset} (aligned {aligned_offset}, mapped {length_to_map}, {:?})",
            self.mode
        );
        self.data = Some(data);
        self.length = length;
        self.mapping = Some(mapping);
        Ok(())
    }

    /// Flush dirty pages of a read-write mapping to the file and wait for the
    /// write to complete. For read-only mappings, this is a no-op.
    ///
    /// A failed flush leaves the mapping intact.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::BadFileDescriptor` if the region is not open.
    /// Returns `MmapError::Io` if the flush fails.
    pub fn sync(&self) -> Result<()> {
        if !self.is_open() {
            return Err(MmapError::BadFileDescriptor);
        }
        if let Some(mapping) = &self.mapping {
            if self.mode == MmapMode::ReadWrite {
                // SAFETY: the mapping is live while it is stored in self.
                unsafe { platform::flush(self.file_handle, mapping) }
                    .map_err(MmapError::from_os)?;
                log::trace!("synced {} mapped bytes", mapping.len());
            }
        }
        Ok(())
    }

    /// Release the mapping and close the file handle if this region opened it.
    ///
    /// Does nothing if the region is not open. Never fails: errors from the
    /// native unmap/close calls are logged and passed to the teardown hook
    /// (see [`crate::errors::set_teardown_hook`]).
    pub fn unmap(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Some(mapping) = self.mapping.take() {
            let mapped = mapping.len();
            // SAFETY: `data` is cleared below and `&mut self` rules out outstanding borrows.
            unsafe { platform::unmap(mapping) };
            log::debug!("unmapped {mapped} bytes");
        }
        if self.owns_handle {
            if let Err(e) = platform::close(self.file_handle) {
                report_teardown(TeardownStep::CloseFile, e);
            }
        }
        self.data = None;
        self.length = 0;
        self.file_handle = INVALID_HANDLE;
        self.owns_handle = false;
        self.mode = MmapMode::ReadOnly;
    }

    /// Exchange the contents of two regions.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    /// Whether a file handle is held.
    #[must_use]
    pub fn is_open(&self) -> bool {
        platform::is_valid_handle(self.file_handle)
    }

    /// Whether an OS mapping is active.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Whether the region was mapped read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.mode == MmapMode::ReadOnly
    }

    /// Current mapping mode.
    #[must_use]
    pub fn mode(&self) -> MmapMode {
        self.mode
    }

    /// Length of the visible window in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the visible window is empty (always true when unmapped).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Length of the OS mapping: the visible window plus the alignment padding in front of it.
    #[must_use]
    pub fn mapped_len(&self) -> usize {
        self.mapping.as_ref().map_or(0, RawMapping::len)
    }

    /// The file handle, or [`INVALID_HANDLE`] when not open.
    #[must_use]
    pub fn file_handle(&self) -> RawFileHandle {
        self.file_handle
    }

    /// The OS mapping handle, or [`INVALID_HANDLE`] when not mapped.
    ///
    /// On Unix this is the file descriptor; on Windows it is the file-mapping object.
    #[must_use]
    pub fn mapping_handle(&self) -> RawFileHandle {
        self.mapping
            .as_ref()
            .map_or(INVALID_HANDLE, |m| m.mapping_handle(self.file_handle))
    }

    /// Pointer to the first visible byte, or null when unmapped.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.data.map_or(ptr::null(), |p| p.as_ptr().cast_const())
    }

    /// The visible bytes. Empty when unmapped.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match self.data {
            // SAFETY: data..data+length lies inside the live mapping.
            Some(p) => unsafe { slice::from_raw_parts(p.as_ptr(), self.length) },
            None => &[],
        }
    }

    /// Mutable access to the visible bytes. Empty when unmapped.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidMode` for read-only mappings.
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        let Some(p) = self.data else {
            return Ok(&mut []);
        };
        if self.mode != MmapMode::ReadWrite {
            return Err(MmapError::InvalidMode("mutable access on read-only mapping"));
        }
        // SAFETY: writable mapping, exclusive borrow, range inside the mapping.
        Ok(unsafe { slice::from_raw_parts_mut(p.as_ptr(), self.length) })
    }

    /// Copy bytes starting at `offset` (relative to the visible window) into `buf`.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::OutOfBounds` if the range exceeds the window.
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (start, end) = slice_range(offset, buf.len() as u64, self.length as u64)?;
        buf.copy_from_slice(&self.as_slice()[start..end]);
        Ok(())
    }

    /// Copy `data` into the window at `offset`. Call [`sync`](Self::sync) to persist.
    ///
    /// # Errors
    ///
    /// Returns `MmapError::InvalidMode` for read-only mappings.
    /// Returns `MmapError::OutOfBounds` if the range exceeds the window.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if self.mode != MmapMode::ReadWrite {
            return Err(MmapError::InvalidMode("write requires ReadWrite mode"));
        }
        let (start, end) = slice_range(offset, data.len() as u64, self.length as u64)?;
        self.as_mut_slice()?[start..end].copy_from_slice(data);
        Ok(())
    }
}

impl Default for MappedRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        self.unmap();
    }
}

impl Deref for MappedRegion {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for MappedRegion {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<'a> IntoIterator for &'a MappedRegion {
    type Item = &'a u8;
    type IntoIter = slice::Iter<'a, u8>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

/// Two regions are equal when both are unmapped, or both are mapped with
/// the same visible bytes.
impl PartialEq for MappedRegion {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_mapped(), other.is_mapped()) {
            (false, false) => true,
            (true, true) => self.as_slice() == other.as_slice(),
            _ => false,
        }
    }
}

impl Eq for MappedRegion {}

impl fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegion")
            .field("mode", &self.mode)
            .field("len", &self.length)
            .field("mapped_len", &self.mapped_len())
            .field("is_open", &self.is_open())
            .field("is_mapped", &self.is_mapped())
            .field("owns_handle", &self.owns_handle)
            .finish()
    }
}

#[cfg(feature = "async")]
impl MappedRegion {
    /// Open and map a file on tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// Same as [`MappedRegion::open_range`]; a panicked or cancelled blocking
    /// task is reported as `MmapError::Io`.
    pub async fn open_async<P: AsRef<Path>>(
        path: P,
        offset: u64,
        len: usize,
        mode: MmapMode,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::open_range(path, offset, len, mode))
            .await
            .map_err(|e| MmapError::Io(e.into()))?
    }

    /// Run [`sync`](Self::sync) on tokio's blocking pool. The region is moved
    /// onto the pool and handed back together with the result.
    ///
    /// # Errors
    ///
    /// A panicked or cancelled blocking task is reported as `MmapError::Io`;
    /// the region is lost in that case.
    pub async fn sync_async(self) -> Result<(Self, Result<()>)> {
        tokio::task::spawn_blocking(move || {
            let result = self.sync();
            (self, result)
        })
        .await
        .map_err(|e| MmapError::Io(e.into()))
    }
}
