//! File access under the shared root.
//!
//! This module provides:
//! - Lexical path resolution with component-wise containment
//! - Flat directory listings
//! - Streaming downloads and size-limited uploads with atomic rename
//!
//! # Security
//!
//! Every client-supplied path is resolved by [`ServerRoot`] before the
//! filesystem is touched. A path that would leave the root is rejected with
//! [`FileError::Rejected`], which carries no path information.

pub mod browser;
pub mod error;
pub mod resolver;
pub mod transfer;

pub use browser::{list_directory, list_entries, DirectoryEntry, EntryKind};
pub use error::FileError;
pub use resolver::{is_within, resolve_lexical, ResolvedPath, ServerRoot};
pub use transfer::{
    open_download, Download, FileDownload, FileTransfer, UploadPolicy, DEFAULT_MAX_UPLOAD_SIZE,
};
