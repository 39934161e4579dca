//! Reader error types.

use std::fmt;
use std::path::PathBuf;

use arrow::datatypes::DataType as ArrowType;
use thiserror::Error;

/// Classification of reader errors.
///
/// The gRPC layer maps each kind onto one status code; nothing below the
/// service boundary knows about transport codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad group id, out-of-range window or unknown channel id.
    InvalidArgument,
    /// Request shape or source type this reader does not support.
    Unimplemented,
    /// Locator does not resolve to an openable regular file.
    NotAccessible,
    /// Handle unknown or already closed.
    NotFound,
    /// Unexpected failure while encoding an open table.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid_argument"),
            ErrorKind::Unimplemented => write!(f, "unimplemented"),
            ErrorKind::NotAccessible => write!(f, "not_accessible"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Reader errors.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Group id other than 0.
    #[error("Invalid group id {0}!")]
    InvalidGroup(i64),

    /// Window start outside `[0, number_of_rows)`.
    #[error("Channel start index {start} out of range!")]
    StartOutOfRange {
        /// Requested start row.
        start: i64,
        /// Rows in the table.
        number_of_rows: usize,
    },

    /// Negative window length.
    #[error("Invalid limit {0}!")]
    InvalidLimit(i64),

    /// Channel id outside `[0, total_channels)`.
    #[error("Invalid channel id {0}!")]
    InvalidChannel(i64),

    /// A method or request option this reader does not implement.
    #[error("{0} not implemented!")]
    Unimplemented(&'static str),

    /// Source column type with no destination mapping.
    #[error("Unknown type {0}!")]
    UnsupportedType(ArrowType),

    /// Path missing, not a regular file, or not a readable table.
    #[error("file \"{url}\" not accessible: {reason}")]
    NotAccessible {
        /// Locator as given by the caller.
        url: String,
        /// Why the open failed.
        reason: String,
    },

    /// Locator scheme that does not name a local file.
    #[error("unsupported locator scheme \"{scheme}\" in \"{url}\"")]
    UnsupportedScheme {
        /// Scheme found in the locator.
        scheme: String,
        /// Locator as given by the caller.
        url: String,
    },

    /// Handle not issued by this registry or already closed.
    #[error("unknown handle \"{0}\"")]
    UnknownHandle(String),

    /// Request arrived without a handle.
    #[error("request carries no handle")]
    MissingHandle,

    /// Arrow kernel failure on an already open table.
    #[error("failed to encode channel {channel} ({path}): {source}")]
    Encode {
        /// Channel id being encoded.
        channel: usize,
        /// Canonical path of the source.
        path: PathBuf,
        /// Underlying Arrow error.
        #[source]
        source: arrow::error::ArrowError,
    },
}

impl ReaderError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReaderError::InvalidGroup(_)
            | ReaderError::StartOutOfRange { .. }
            | ReaderError::InvalidLimit(_)
            | ReaderError::InvalidChannel(_)
            | ReaderError::MissingHandle => ErrorKind::InvalidArgument,
            ReaderError::Unimplemented(_) | ReaderError::UnsupportedType(_) => {
                ErrorKind::Unimplemented
            }
            ReaderError::NotAccessible { .. } | ReaderError::UnsupportedScheme { .. } => {
                ErrorKind::NotAccessible
            }
            ReaderError::UnknownHandle(_) => ErrorKind::NotFound,
            ReaderError::Encode { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_accessible(url: &str, reason: impl fmt::Display) -> Self {
        ReaderError::NotAccessible {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Reader result type.
pub type ReaderResult<T> = Result<T, ReaderError>;
