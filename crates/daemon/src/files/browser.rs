//! Directory listing for resolved paths.
//!
//! Listings are flat: only the immediate children of a directory are
//! returned, and no ordering is imposed. Callers that need a stable order
//! sort the result themselves.

use std::fs::FileType;

use super::error::FileError;
use super::resolver::ResolvedPath;

/// The kind of a directory entry, as reported without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// A single child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    pub kind: EntryKind,
}

/// List the names of the immediate children of `dir`.
pub async fn list_directory(dir: &ResolvedPath) -> Result<Vec<String>, FileError> {
    let entries = list_entries(dir).await?;
    Ok(entries.into_iter().map(|entry| entry.name).collect())
}

/// List the immediate children of `dir` along with their kinds.
///
/// Names that are not valid UTF-8 are converted lossily.
pub async fn list_entries(dir: &ResolvedPath) -> Result<Vec<DirectoryEntry>, FileError> {
    let metadata = tokio::fs::metadata(dir.as_path()).await?;
    if !metadata.is_dir() {
        return Err(FileError::NotADirectory);
    }

    let mut read_dir = tokio::fs::read_dir(dir.as_path()).await?;
    let mut entries = Vec::new();
    let (mut files, mut dirs, mut symlinks, mut other) = (0usize, 0usize, 0usize, 0usize);

    while let Some(entry) = read_dir.next_entry().await? {
        let kind = match entry.file_type().await {
            Ok(file_type) => EntryKind::from(file_type),
            Err(e) => {
                tracing::debug!(error = %e, "could not determine entry type");
                EntryKind::Other
            }
        };

        match kind {
            EntryKind::File => files += 1,
            EntryKind::Directory => dirs += 1,
            EntryKind::Symlink => symlinks += 1,
            EntryKind::Other => other += 1,
        }

        entries.push(DirectoryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }

    tracing::debug!(
        count = entries.len(),
        files,
        dirs,
        symlinks,
        other,
        "listed directory"
    );
    Ok(entries)
}
