//! Path resolution against the shared root.
//!
//! Every path a client supplies goes through [`ServerRoot::resolve`] (or
//! [`ServerRoot::resolve_file_name`] for upload names) before anything touches
//! the filesystem. Resolution is purely lexical: the raw fragment is
//! percent-decoded exactly once, split on both `/` and `\`, joined onto the
//! root and normalized. A `..` that would climb above the root is rejected
//! where it occurs, and the result is accepted only if it is the root itself
//! or lies below it, compared component by component.
//!
//! Symlinks are not followed by the lexical check. A symlink inside the root
//! that points elsewhere is reachable unless [`ServerRoot::with_symlink_check`]
//! is enabled, in which case [`ServerRoot::resolve_checked`] canonicalizes the
//! deepest existing ancestor after the lexical check passes.

use std::io;
use std::path::{Component, Path, PathBuf};

use super::error::FileError;

/// The directory a running instance is allowed to read and write.
///
/// Canonicalized once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServerRoot {
    path: PathBuf,
    verify_symlinks: bool,
}

/// An absolute path proven to be the root or one of its descendants.
///
/// Only the resolver can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
}

impl ResolvedPath {
    /// Borrow the underlying path.
    pub fn as_path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl ServerRoot {
    /// Canonicalize `path` and use it as the root.
    ///
    /// Fails if the path does not exist or is not a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let canonical = std::fs::canonicalize(path.as_ref())?;
        if !std::fs::metadata(&canonical)?.is_dir() {
            return Err(FileError::NotADirectory);
        }

        Ok(Self {
            path: canonical,
            verify_symlinks: false,
        })
    }

    /// Also reject resolved paths whose existing ancestors resolve, through
    /// symlinks, to somewhere outside the root.
    pub fn with_symlink_check(mut self, verify: bool) -> Self {
        self.verify_symlinks = verify;
        self
    }

    /// The canonical root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`resolve_checked`](Self::resolve_checked) inspects symlinks.
    pub fn verifies_symlinks(&self) -> bool {
        self.verify_symlinks
    }

    /// Resolve a raw, still percent-encoded request fragment.
    ///
    /// An empty fragment resolves to the root itself.
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath, FileError> {
        resolve_lexical(&self.path, requested).map(|path| ResolvedPath { path })
    }

    /// Resolve an upload destination name.
    ///
    /// The name must be exactly one plain path segment. Separators, `.` and
    /// `..` are rejected rather than stripped.
    pub fn resolve_file_name(&self, name: &str) -> Result<ResolvedPath, FileError> {
        if !is_plain_segment(name) {
            return Err(FileError::Rejected);
        }

        let path = self.path.join(name);
        if !is_within(&self.path, &path) {
            return Err(FileError::Rejected);
        }
        Ok(ResolvedPath { path })
    }

    /// Lexical resolution followed by the symlink check, when enabled.
    pub async fn resolve_checked(&self, requested: &str) -> Result<ResolvedPath, FileError> {
        let resolved = self.resolve(requested)?;
        self.check_symlinks(&resolved).await?;
        Ok(resolved)
    }

    /// Apply the symlink policy to an already resolved path.
    pub async fn check_symlinks(&self, resolved: &ResolvedPath) -> Result<(), FileError> {
        if !self.verify_symlinks {
            return Ok(());
        }

        let mut ancestor = resolved.path.clone();
        loop {
            match tokio::fs::canonicalize(&ancestor).await {
                Ok(canonical) => {
                    return if is_within(&self.path, &canonical) {
                        Ok(())
                    } else {
                        tracing::warn!(root = %self.path.display(), "symlink escapes shared root");
                        Err(FileError::Rejected)
                    };
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Not created yet; the ancestors decide.
                    if !ancestor.pop() {
                        return Err(FileError::Rejected);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Decode, join and normalize `requested` onto `root` without touching the
/// filesystem, then enforce containment.
pub fn resolve_lexical(root: &Path, requested: &str) -> Result<PathBuf, FileError> {
    let decoded = urlencoding::decode(requested).map_err(|_| FileError::Rejected)?;

    if decoded.chars().any(char::is_control) {
        return Err(FileError::Rejected);
    }

    let mut normalized = PathBuf::new();
    for component in root.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(FileError::Rejected);
                }
            }
            other => normalized.push(other),
        }
    }

    // Segments pushed below the root. A `..` at depth zero would leave the
    // root, even if later segments come back in.
    let mut depth = 0usize;
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if depth == 0 {
                    return Err(FileError::Rejected);
                }
                normalized.pop();
                depth -= 1;
            }
            name if is_plain_segment(name) => {
                normalized.push(name);
                depth += 1;
            }
            _ => return Err(FileError::Rejected),
        }
    }

    if !is_within(root, &normalized) {
        return Err(FileError::Rejected);
    }
    Ok(normalized)
}

/// Component-wise containment: `candidate` equals `root` or lies below it.
///
/// `/srv/share-other` is not within `/srv/share`.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    let mut root_components = root.components().filter(|c| *c != Component::CurDir);
    let mut candidate_components = candidate.components().filter(|c| *c != Component::CurDir);

    loop {
        match (root_components.next(), candidate_components.next()) {
            (None, _) => return true,
            (Some(r), Some(c)) if r == c => continue,
            _ => return false,
        }
    }
}

/// A single normal segment with no separators or control characters.
fn is_plain_segment(name: &str) -> bool {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control)
    {
        return false;
    }

    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
