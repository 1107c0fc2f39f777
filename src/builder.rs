//! Builder for configuring a mapping before it is established.

use std::fs::File;
use std::path::Path;

use crate::errors::Result;
use crate::mmap::{MappedRegion, MmapMode, MAP_ENTIRE_FILE};
use crate::platform::RawFileHandle;

/// Offset, length and mode for a new [`MappedRegion`].
///
/// Defaults: offset 0, the entire file, read-only.
///
/// # Examples
///
/// ```no_run
/// use mmap_region::MappedRegion;
///
/// let region = MappedRegion::options()
///     .offset(4096)
///     .len(512)
///     .read_write()
///     .open("data.bin")?;
/// assert_eq!(region.len(), 512);
/// # Ok::<(), mmap_region::MmapError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    offset: u64,
    len: usize,
    mode: MmapMode,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl MapOptions {
    /// Options mapping the whole file read-only.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            offset: 0,
            len: MAP_ENTIRE_FILE,
            mode: MmapMode::ReadOnly,
        }
    }

    /// File offset of the first visible byte. Need not be page-aligned.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Number of bytes to map; `MAP_ENTIRE_FILE` (0) maps to end of file.
    #[must_use]
    pub const fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Access mode.
    #[must_use]
    pub const fn mode(mut self, mode: MmapMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `.mode(MmapMode::ReadOnly)`.
    #[must_use]
    pub const fn read_only(self) -> Self {
        self.mode(MmapMode::ReadOnly)
    }

    /// Shorthand for `.mode(MmapMode::ReadWrite)`.
    #[must_use]
    pub const fn read_write(self) -> Self {
        self.mode(MmapMode::ReadWrite)
    }

    /// Open `path` and map it; the region owns the opened handle.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_path`].
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<MappedRegion> {
        MappedRegion::open_range(path, self.offset, self.len, self.mode)
    }

    /// Map a file the caller keeps open.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_handle`].
    pub fn map_file(&self, file: &File) -> Result<MappedRegion> {
        MappedRegion::from_file(file, self.offset, self.len, self.mode)
    }

    /// Map the file behind a raw caller-owned handle.
    ///
    /// # Errors
    ///
    /// See [`MappedRegion::map_handle`].
    pub fn map_handle(&self, handle: RawFileHandle) -> Result<MappedRegion> {
        MappedRegion::from_handle_range(handle, self.offset, self.len, self.mode)
    }
}
