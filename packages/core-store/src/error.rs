//! Error types for the projection.
//!
//! Each variant corresponds to one class of failure a filesystem request can
//! hit. `Error::errno` turns them into the codes the host service expects.

use std::path::PathBuf;

use crate::format::Format;
use crate::path::PathError;

/// Errors raised while projecting the document onto the filesystem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path validation error.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Resolution failed for a read-only operation.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Tried to descend through a scalar, or to make a directory where a
    /// mapping already exists.
    #[error("not a directory: {path}")]
    NotDirectory { path: String },

    /// A file operation was attempted on a mapping.
    #[error("is a directory: {path}")]
    IsDirectory { path: String },

    /// Invalid path for an operation (bad sequence index and similar).
    #[error("invalid path: {message}")]
    InvalidPath { message: String },

    /// A sequence index or file offset beyond what a write may grow to.
    #[error("too large: {message}")]
    TooLarge { message: String },

    /// The operation has no meaning in the projection.
    #[error("operation not permitted: {message}")]
    NotPermitted { message: String },

    /// Codec failed to decode bytes.
    #[error("decode error ({format}): {message}")]
    Decode { format: Format, message: String },

    /// Codec failed to encode value.
    #[error("encode error ({format}): {message}")]
    Encode { format: Format, message: String },

    /// Format not supported by codec.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(Format),

    /// Writing the backing document failed. The tree stays dirty.
    #[error("failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Not-found error for a path.
    pub fn not_found(path: impl ToString) -> Self {
        Error::NotFound {
            path: path.to_string(),
        }
    }

    /// Structural-conflict error for a path.
    pub fn not_directory(path: impl ToString) -> Self {
        Error::NotDirectory {
            path: path.to_string(),
        }
    }

    /// Decode error for a format.
    pub fn decode(format: Format, message: impl Into<String>) -> Self {
        Error::Decode {
            format,
            message: message.into(),
        }
    }

    /// Encode error for a format.
    pub fn encode(format: Format, message: impl Into<String>) -> Self {
        Error::Encode {
            format,
            message: message.into(),
        }
    }

    /// The errno reported to the host filesystem service.
    pub fn errno(&self) -> libc::c_int {
        match self {
            Error::NotFound { .. } => libc::ENOENT,
            Error::NotDirectory { .. } => libc::ENOTDIR,
            Error::IsDirectory { .. } => libc::EISDIR,
            Error::Path(_) | Error::InvalidPath { .. } => libc::EINVAL,
            Error::NotPermitted { .. } => libc::EPERM,
            Error::TooLarge { .. } => libc::EFBIG,
            Error::Decode { .. }
            | Error::Encode { .. }
            | Error::UnsupportedFormat(_)
            | Error::Persist { .. } => libc::EIO,
            Error::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}
