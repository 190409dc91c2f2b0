use std::io;
use thiserror::Error;

use crate::upload::UploadStatus;

/// Result alias used by every fallible operation of this crate.
pub type Result<T, E = MessageError> = std::result::Result<T, E>;

/// Errors raised by the message value types.
///
/// Validation errors are raised before any value is built, so the receiver of a failed
/// `with_*` call is always left untouched. I/O errors carry a short description of the
/// operation that failed next to the system level cause.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("unable to parse uri: {uri:?}")]
    InvalidUri { uri: String },

    #[error("invalid port: {port}, must be between 0 and 65535")]
    InvalidPort { port: u32 },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("cannot retrieve stream due to upload error: {status}")]
    UploadError { status: UploadStatus },

    #[error("cannot retrieve stream after it has already been moved")]
    AlreadyMoved,

    #[error("stream is detached")]
    Detached,

    #[error("cannot read from non-readable stream")]
    NotReadable,

    #[error("cannot write to a non-writable stream")]
    NotWritable,

    #[error("stream is not seekable")]
    NotSeekable,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl MessageError {
    pub fn invalid_argument<S: ToString>(str: S) -> Self {
        Self::InvalidArgument { reason: str.to_string() }
    }

    pub fn invalid_uri<S: ToString>(uri: S) -> Self {
        Self::InvalidUri { uri: uri.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn io<S: ToString, E: Into<io::Error>>(context: S, e: E) -> Self {
        Self::Io { context: context.to_string(), source: e.into() }
    }

    /// Returns true for the argument validation failures: malformed uri text, port range,
    /// header grammar and plain invalid arguments.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::InvalidUri { .. } | Self::InvalidPort { .. } | Self::InvalidHeader { .. }
        )
    }

    /// Returns true when a stream operation was refused because the stream is detached
    /// or lacks the needed capability.
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Detached | Self::NotReadable | Self::NotWritable | Self::NotSeekable)
    }
}
