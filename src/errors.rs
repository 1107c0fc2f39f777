//! Crate-specific error types for mmap-region.

use std::fmt;
use std::io;

use parking_lot::RwLock;
use thiserror::Error;

/// Result alias for mmap-region operations.
pub type Result<T> = std::result::Result<T, MmapError>;

/// Error type covering argument validation, handle state and OS failures.
#[derive(Debug, Error)]
pub enum MmapError {
    /// A caller-supplied argument was rejected before reaching the OS.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The requested offset/length pair reaches past the end of the file.
    #[error("range out of bounds: offset={offset}, len={len}, total={total}")]
    OutOfBounds {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Size of the file (or visible window) the range was checked against.
        total: u64,
    },

    /// The operation needs an open file handle and there is none.
    #[error("bad file descriptor")]
    BadFileDescriptor,

    /// Error returned when attempting an operation in an incompatible mode.
    #[error("invalid access mode: {0}")]
    InvalidMode(&'static str),

    /// Wrapper for an OS-reported `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Portable classification of an [`MmapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty path, empty region or a range past end of file.
    InvalidArgument,
    /// Invalid or closed file handle.
    BadFileDescriptor,
    /// Access mode forbids the operation, either locally or as reported by the OS.
    PermissionDenied,
    /// Any other OS-reported failure.
    Os,
}

impl MmapError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::OutOfBounds { .. } => ErrorKind::InvalidArgument,
            Self::BadFileDescriptor => ErrorKind::BadFileDescriptor,
            Self::InvalidMode(_) => ErrorKind::PermissionDenied,
            Self::Io(e) => match e.kind() {
                io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
                _ if is_bad_descriptor(e) => ErrorKind::BadFileDescriptor,
                _ => ErrorKind::Os,
            },
        }
    }

    /// Wrap an OS error, folding "bad descriptor" codes into `BadFileDescriptor`.
    pub(crate) fn from_os(err: io::Error) -> Self {
        if is_bad_descriptor(&err) {
            Self::BadFileDescriptor
        } else {
            Self::Io(err)
        }
    }

    /// Native error code, when the failure came from the OS.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

fn is_bad_descriptor(e: &io::Error) -> bool {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            // ERROR_INVALID_HANDLE
            e.raw_os_error() == Some(6)
        } else {
            e.raw_os_error() == Some(libc::EBADF)
        }
    }
}

impl From<MmapError> for io::Error {
    fn from(err: MmapError) -> Self {
        match err {
            MmapError::Io(e) => e,
            other => {
                let kind = match other.kind() {
                    ErrorKind::InvalidArgument => io::ErrorKind::InvalidInput,
                    ErrorKind::PermissionDenied => io::ErrorKind::PermissionDenied,
                    ErrorKind::BadFileDescriptor | ErrorKind::Os => io::ErrorKind::Other,
                };
                io::Error::new(kind, other)
            }
        }
    }
}

/// Native call that failed while tearing a mapping down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    /// `munmap` / `UnmapViewOfFile`.
    Unmap,
    /// `CloseHandle` on the Windows file-mapping object.
    CloseMapping,
    /// `close` / `CloseHandle` on an internally owned file handle.
    CloseFile,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unmap => "unmap view",
            Self::CloseMapping => "close mapping handle",
            Self::CloseFile => "close file handle",
        };
        f.write_str(s)
    }
}

/// A failure swallowed by `unmap` or `Drop`, handed to the teardown hook.
#[derive(Debug, Error)]
#[error("teardown failed ({step}): {source}")]
pub struct TeardownError {
    /// Which native call failed.
    pub step: TeardownStep,
    /// The OS error it returned.
    #[source]
    pub source: io::Error,
}

/// Callback type for [`set_teardown_hook`].
pub type TeardownHook = fn(&TeardownError);

static TEARDOWN_HOOK: RwLock<Option<TeardownHook>> = parking_lot::const_rwlock(None);

/// Install a process-wide callback for teardown failures.
///
/// Unmapping never returns an error to the caller; failures are logged at
/// `warn` level and, if a hook is installed, passed to it. Replaces any
/// previously installed hook.
pub fn set_teardown_hook(hook: TeardownHook) {
    *TEARDOWN_HOOK.write() = Some(hook);
}

/// Remove the teardown hook, if any.
pub fn clear_teardown_hook() {
    *TEARDOWN_HOOK.write() = None;
}

pub(crate) fn report_teardown(step: TeardownStep, source: io::Error) {
    let err = TeardownError { step, source };
    log::warn!("{err}");
    let hook = *TEARDOWN_HOOK.read();
    if let Some(hook) = hook {
        hook(&err);
    }
}
