//! Error taxonomy shared by every file operation.

use std::io;

use thiserror::Error;

/// Errors that can occur while resolving, listing, serving or storing files.
///
/// Variants never carry server-side absolute paths: their `Display` output is
/// safe to hand back to clients.
#[derive(Debug, Error)]
pub enum FileError {
    /// The requested path escapes the shared root or is malformed.
    #[error("path rejected")]
    Rejected,

    /// The target does not exist.
    #[error("not found")]
    NotFound,

    /// A directory was expected but the target is something else.
    #[error("not a directory")]
    NotADirectory,

    /// The operating system refused access.
    #[error("permission denied")]
    PermissionDenied,

    /// The upload exceeded the configured size limit.
    #[error("payload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// The destination exists and overwriting is disabled.
    #[error("file already exists: {0}")]
    AlreadyExists(String),

    /// The client payload could not be read.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Any other read or write failure.
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for FileError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound,
            io::ErrorKind::PermissionDenied => FileError::PermissionDenied,
            io::ErrorKind::NotADirectory => FileError::NotADirectory,
            _ => FileError::Io(err),
        }
    }
}
