//! # mmap-region: owned memory-mapped file regions for Rust
//!
//! This crate maps a window of a file into the address space and releases it
//! deterministically. One type, [`MappedRegion`], hides the differences
//! between POSIX (`mmap`/`msync`/`munmap`) and Windows
//! (`CreateFileMappingW`/`MapViewOfFile`/`FlushViewOfFile`).
//!
//! ## Features
//!
//! - **Arbitrary offsets**: the OS mapping is page-aligned internally, the
//!   visible window starts exactly where you asked
//! - **Explicit handle ownership**: handles the region opened are closed on
//!   drop, handles you pass in are left alone
//! - **Safe failure**: a failed map always leaves the region unmapped
//! - **Quiet teardown**: unmap never fails; problems are logged and can be
//!   observed through a hook
//! - **Async support**: optional Tokio helpers that keep blocking calls off the runtime
//!
//! ## Quick Start
//!
//! ```no_run
//! use mmap_region::{MappedRegion, MmapMode};
//!
//! // Map 16 bytes starting at an unaligned offset
//! let mut region = MappedRegion::open_range("data.bin", 1000, 16, MmapMode::ReadWrite)?;
//! region.write_at(0, b"Hello, mmap!")?;
//!
//! // Ensure data is persisted
//! region.sync()?;
//! # Ok::<(), mmap_region::MmapError>(())
//! ```
//!
//! ## Modules
//!
//! - [`errors`]: Error types and the teardown hook
//! - [`utils`]: Page size and alignment helpers
//! - [`mmap`]: Core `MappedRegion` implementation
//! - [`builder`]: `MapOptions` builder
//!
//! ## Feature Flags
//!
//! - `async`: Enables Tokio-based async helpers

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![deny(missing_docs)]

pub mod builder;
pub mod errors;
pub mod mmap;
mod platform;
pub mod utils;

pub use builder::MapOptions;
pub use errors::{
    clear_teardown_hook, set_teardown_hook, ErrorKind, MmapError, TeardownError, TeardownStep,
};
pub use mmap::{MappedRegion, MmapMode, MAP_ENTIRE_FILE};
pub use platform::{RawFileHandle, INVALID_HANDLE};
