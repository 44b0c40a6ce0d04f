//! Streaming downloads and uploads under the shared root.
//!
//! Downloads hand the open file back to the caller as a byte stream so the
//! HTTP layer never buffers whole files. Uploads are written chunk by chunk
//! into a temporary sibling of the destination and renamed into place only
//! once the payload has been fully received within the size limit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, Take};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::browser::list_directory;
use super::error::FileError;
use super::resolver::{ResolvedPath, ServerRoot};

/// Default upload size limit (100 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

const TEMP_PREFIX: &str = ".lanshare-upload-";
const TEMP_SUFFIX: &str = ".part";

/// What a download request resolved to.
#[derive(Debug)]
pub enum Download {
    /// A regular file, ready to stream.
    File(FileDownload),
    /// A directory, answered with the names of its children.
    Directory(Vec<String>),
}

/// An open regular file together with the headers needed to serve it.
#[derive(Debug)]
pub struct FileDownload {
    file: File,
    /// Size in bytes at the time the file was opened.
    pub len: u64,
    /// Best-effort MIME type from the file extension.
    pub content_type: String,
}

impl FileDownload {
    /// Stream exactly `len` bytes of the file.
    ///
    /// Bytes appended after the file was opened are not sent, so the body
    /// always matches the advertised `Content-Length`.
    pub fn into_stream(self) -> ReaderStream<Take<File>> {
        ReaderStream::new(self.file.take(self.len))
    }
}

/// Open `path` for download.
///
/// Directories yield their listing. Anything that is neither a regular file
/// nor a directory is reported as missing.
pub async fn open_download(path: &ResolvedPath) -> Result<Download, FileError> {
    let metadata = fs::metadata(path.as_path()).await?;

    if metadata.is_dir() {
        return list_directory(path).await.map(Download::Directory);
    }
    if !metadata.is_file() {
        return Err(FileError::NotFound);
    }

    let file = File::open(path.as_path()).await?;
    let content_type = mime_guess::from_path(path.as_path())
        .first_or_octet_stream()
        .to_string();

    Ok(Download::File(FileDownload {
        file,
        len: metadata.len(),
        content_type,
    }))
}

/// Limits applied to every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Maximum accepted payload size in bytes.
    pub max_size: u64,
    /// Replace an existing file with the same name.
    pub allow_overwrite: bool,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_UPLOAD_SIZE,
            allow_overwrite: true,
        }
    }
}

/// Stores uploaded payloads under the shared root.
#[derive(Debug, Clone)]
pub struct FileTransfer {
    root: Arc<ServerRoot>,
    policy: UploadPolicy,
}

impl FileTransfer {
    pub fn new(root: Arc<ServerRoot>, policy: UploadPolicy) -> Self {
        Self { root, policy }
    }

    /// Stream `payload` into the root as `name` and return the stored name.
    ///
    /// The destination is only replaced after the whole payload was received
    /// within the size limit. On any failure the temporary file is removed and
    /// the destination is left untouched.
    pub async fn store<S, E>(&self, name: &str, payload: S) -> Result<String, FileError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let destination = self.root.resolve_file_name(name)?;
        self.root.check_symlinks(&destination).await?;

        match fs::symlink_metadata(destination.as_path()).await {
            Ok(existing) if existing.is_dir() => {
                return Err(FileError::AlreadyExists(name.to_string()));
            }
            Ok(_) if !self.policy.allow_overwrite => {
                return Err(FileError::AlreadyExists(name.to_string()));
            }
            Ok(_) => debug!(file = %name, "replacing existing file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let temp_path = temp_path_for(destination.as_path())?;
        let result = self
            .write_then_rename(&temp_path, destination.as_path(), payload)
            .await;

        match result {
            Ok(written) => {
                info!(file = %name, bytes = written, "upload stored");
                Ok(name.to_string())
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&temp_path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(file = %name, error = %cleanup, "Failed to cleanup temp file after failed upload");
                    }
                }
                warn!(file = %name, error = %e, "upload failed");
                Err(e)
            }
        }
    }

    async fn write_then_rename<S, E>(
        &self,
        temp_path: &Path,
        destination: &Path,
        payload: S,
    ) -> Result<u64, FileError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp_path)
            .await?;

        let mut payload = std::pin::pin!(payload);
        let mut written: u64 = 0;

        while let Some(chunk) = payload.next().await {
            let chunk = chunk.map_err(|e| FileError::InvalidPayload(e.to_string()))?;

            written += chunk.len() as u64;
            if written > self.policy.max_size {
                return Err(FileError::PayloadTooLarge {
                    limit: self.policy.max_size,
                });
            }

            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(temp_path, destination).await?;
        Ok(written)
    }

    /// Remove temporary upload files left behind by an interrupted process.
    ///
    /// Returns the number of files removed.
    pub async fn sweep_partial_uploads(&self) -> Result<usize, FileError> {
        let mut read_dir = fs::read_dir(self.root.path()).await?;
        let mut removed = 0;

        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !(name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)) {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %name, error = %e, "Failed to cleanup stale temp file"),
            }
        }

        if removed > 0 {
            info!(count = removed, "removed stale partial uploads");
        }
        Ok(removed)
    }
}

/// A unique temporary path next to `destination`, so the final rename never
/// crosses filesystems.
fn temp_path_for(destination: &Path) -> Result<PathBuf, FileError> {
    let parent = destination.parent().ok_or(FileError::Rejected)?;
    Ok(parent.join(format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", uuid::Uuid::new_v4())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::fs as std_fs;
    use std::io;
    use tempfile::TempDir;

    fn setup(policy: UploadPolicy) -> (TempDir, Arc<ServerRoot>, FileTransfer) {
        let temp_dir = TempDir::new().unwrap();
        let root = Arc::new(ServerRoot::new(temp_dir.path()).unwrap());
        let transfer = FileTransfer::new(root.clone(), policy);
        (temp_dir, root, transfer)
    }

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std_fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    async fn read_download(download: Download) -> Vec<u8> {
        let Download::File(file) = download else {
            panic!("expected a file download");
        };
        let mut stream = file.into_stream();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        body
    }

    #[tokio::test]
    async fn test_store_then_download_round_trip() {
        let (_temp_dir, root, transfer) = setup(UploadPolicy::default());

        let stored = transfer
            .store("f.txt", chunks(&[b"hello ", b"world"]))
            .await
            .unwrap();
        assert_eq!(stored, "f.txt");

        let download = open_download(&root.resolve("f.txt").unwrap()).await.unwrap();
        assert_eq!(read_download(download).await, b"hello world");
    }

    #[tokio::test]
    async fn test_store_empty_payload() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy::default());

        transfer.store("empty.bin", chunks(&[])).await.unwrap();
        assert_eq!(std_fs::read(temp_dir.path().join("empty.bin")).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_store_oversized_payload_leaves_nothing() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy {
            max_size: 8,
            allow_overwrite: true,
        });

        let result = transfer.store("big.bin", chunks(&[b"12345", b"67890"])).await;
        assert!(matches!(result, Err(FileError::PayloadTooLarge { limit: 8 })));
        assert!(dir_names(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_store_exactly_at_limit() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy {
            max_size: 10,
            allow_overwrite: true,
        });

        transfer.store("ok.bin", chunks(&[b"12345", b"67890"])).await.unwrap();
        assert_eq!(std_fs::read(temp_dir.path().join("ok.bin")).unwrap(), b"1234567890");
    }

    #[tokio::test]
    async fn test_store_rejects_escaping_name() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy::default());

        let result = transfer.store("../escape.txt", chunks(&[b"nope"])).await;
        assert!(matches!(result, Err(FileError::Rejected)));
        assert!(dir_names(temp_dir.path()).is_empty());
        assert!(!temp_dir.path().parent().unwrap().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_store_stream_error_cleans_up() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy::default());

        let payload = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("connection reset")),
        ]);
        let result = transfer.store("broken.txt", payload).await;

        assert!(matches!(result, Err(FileError::InvalidPayload(_))));
        assert!(dir_names(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_store_overwrites_by_default() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy::default());
        std_fs::write(temp_dir.path().join("f.txt"), "old").unwrap();

        transfer.store("f.txt", chunks(&[b"new"])).await.unwrap();
        assert_eq!(std_fs::read(temp_dir.path().join("f.txt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_store_refuses_overwrite_when_disabled() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy {
            max_size: DEFAULT_MAX_UPLOAD_SIZE,
            allow_overwrite: false,
        });
        std_fs::write(temp_dir.path().join("f.txt"), "old").unwrap();

        let result = transfer.store("f.txt", chunks(&[b"new"])).await;
        assert!(matches!(result, Err(FileError::AlreadyExists(_))));
        assert_eq!(std_fs::read(temp_dir.path().join("f.txt")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_store_never_replaces_directory() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy::default());
        std_fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let result = transfer.store("sub", chunks(&[b"data"])).await;
        assert!(matches!(result, Err(FileError::AlreadyExists(_))));
        assert!(temp_dir.path().join("sub").is_dir());
    }

    #[tokio::test]
    async fn test_open_download_directory_lists_children() {
        let (temp_dir, root, _transfer) = setup(UploadPolicy::default());
        std_fs::create_dir(temp_dir.path().join("sub")).unwrap();
        std_fs::write(temp_dir.path().join("sub/a.txt"), "a").unwrap();

        let download = open_download(&root.resolve("sub").unwrap()).await.unwrap();
        match download {
            Download::Directory(names) => assert_eq!(names, vec!["a.txt".to_string()]),
            Download::File(_) => panic!("expected a directory listing"),
        }
    }

    #[tokio::test]
    async fn test_open_download_missing() {
        let (_temp_dir, root, _transfer) = setup(UploadPolicy::default());

        let result = open_download(&root.resolve("missing.txt").unwrap()).await;
        assert!(matches!(result, Err(FileError::NotFound)));
    }

    #[tokio::test]
    async fn test_open_download_content_type() {
        let (temp_dir, root, _transfer) = setup(UploadPolicy::default());
        std_fs::write(temp_dir.path().join("page.html"), "<p>").unwrap();
        std_fs::write(temp_dir.path().join("blob"), [0u8, 1, 2]).unwrap();

        let Download::File(html) = open_download(&root.resolve("page.html").unwrap()).await.unwrap()
        else {
            panic!("expected a file");
        };
        assert_eq!(html.content_type, "text/html");
        assert_eq!(html.len, 3);

        let Download::File(blob) = open_download(&root.resolve("blob").unwrap()).await.unwrap()
        else {
            panic!("expected a file");
        };
        assert_eq!(blob.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_sweep_partial_uploads() {
        let (temp_dir, _root, transfer) = setup(UploadPolicy::default());
        std_fs::write(temp_dir.path().join(".lanshare-upload-abc.part"), "x").unwrap();
        std_fs::write(temp_dir.path().join("keep.part"), "y").unwrap();

        let removed = transfer.sweep_partial_uploads().await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(dir_names(temp_dir.path()), vec!["keep.part".to_string()]);
    }
}
