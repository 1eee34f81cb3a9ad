//! Output writing: the file-store trait, the links-only sink, and cleanup of
//! previous runs.
//!
//! The store is a trait so pipelines can be exercised against an in-memory
//! implementation in tests; the real one writes through `tokio::fs`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::sniff;

/// Error writing an output file.
#[derive(Debug, Error)]
#[error("error writing {path}: {source}")]
pub struct StoreError {
    /// The file path where the error occurred.
    pub path: PathBuf,
    /// The underlying IO error.
    #[source]
    pub source: std::io::Error,
}

/// Write capability for pipeline output.
#[async_trait]
pub trait Store: Send + Sync {
    /// Writes `bytes` to `dir/filename`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] with the full path on any IO failure.
    async fn write(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Filesystem-backed store.
#[derive(Debug, Default, Clone)]
pub struct FsStore;

impl FsStore {
    /// Creates a filesystem store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Store for FsStore {
    async fn write(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = dir.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError { path, source })
    }
}

/// Links-only output: resolved URLs are appended here instead of being
/// fetched and written as files.
///
/// Multiple pipelines resolve links concurrently, so each append (file write
/// plus in-memory list push) happens under one lock. Append order is
/// completion order, not config order.
#[derive(Debug)]
pub struct LinkSink {
    inner: Mutex<LinkSinkInner>,
}

#[derive(Debug)]
struct LinkSinkInner {
    file: Option<std::fs::File>,
    urls: Vec<String>,
}

impl LinkSink {
    /// Creates a sink that appends each URL as a line to `path` (truncating
    /// any existing file) and keeps the in-memory list.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file cannot be created.
    pub fn to_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            inner: Mutex::new(LinkSinkInner {
                file: Some(file),
                urls: Vec::new(),
            }),
        })
    }

    /// Creates a sink that only collects URLs in memory. Used by tests.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(LinkSinkInner {
                file: None,
                urls: Vec::new(),
            }),
        }
    }

    /// Appends one resolved URL.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file write fails; the in-memory list is
    /// not updated in that case.
    pub fn append(&self, url: &str) -> std::io::Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = &mut inner.file {
            use std::io::Write;
            writeln!(file, "{url}")?;
        }
        inner.urls.push(url.to_string());
        Ok(())
    }

    /// Returns a copy of the collected URLs in append order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .urls
            .clone()
    }
}

/// Removes previously fetched files from `dir`.
///
/// Only files whose extension this tool produces (images, `.xxx`, debug
/// `.html`) are deleted; anything else is left in place with a warning.
///
/// # Errors
///
/// Returns the IO error if the directory cannot be read or a file cannot be
/// removed.
pub fn clean_directory(dir: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            warn!(path = %path.display(), "not cleaning non-file entry");
            continue;
        }
        let owned = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(sniff::is_owned_extension);
        if owned {
            std::fs::remove_file(&path)?;
        } else {
            warn!(path = %path.display(), "not cleaning unrecognized file");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new();
        store
            .write(dir.path(), "strip.png", b"pngbytes")
            .await
            .unwrap();
        let written = std::fs::read(dir.path().join("strip.png")).unwrap();
        assert_eq!(written, b"pngbytes");
    }

    #[tokio::test]
    async fn test_fs_store_error_carries_path() {
        let store = FsStore::new();
        let err = store
            .write(Path::new("/nonexistent-dir-for-test"), "x.gif", b"data")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("x.gif"));
    }

    #[test]
    fn test_link_sink_appends_in_order() {
        let sink = LinkSink::in_memory();
        sink.append("http://a.com/1.gif").unwrap();
        sink.append("http://b.com/2.png").unwrap();
        assert_eq!(
            sink.urls(),
            vec!["http://a.com/1.gif".to_string(), "http://b.com/2.png".to_string()]
        );
    }

    #[test]
    fn test_link_sink_writes_one_url_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        let sink = LinkSink::to_file(&path).unwrap();
        sink.append("http://a.com/1.gif").unwrap();
        sink.append("http://b.com/2.png").unwrap();
        drop(sink);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "http://a.com/1.gif\nhttp://b.com/2.png\n");
    }

    #[test]
    fn test_clean_directory_removes_only_owned_extensions() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.gif", "b.png", "c.jpg", "d.tif", "e.xxx", "f.html"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(dir.path().join("keep.json"), b"x").unwrap();
        std::fs::write(dir.path().join("noext"), b"x").unwrap();

        clean_directory(dir.path()).unwrap();

        let mut remaining: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["keep.json".to_string(), "noext".to_string()]);
    }
}
