//! Static file lookup under the public root

use std::path::{Component, Path, PathBuf};

use tokio::fs::File;

use crate::error::{Error, Result};

/// A resolved static file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full path under the public root
    pub name: PathBuf,
    /// Extension including the dot (`".html"`), empty if there is none
    pub kind: String,
}

impl FileInfo {
    /// MIME type for this file's extension
    pub fn content_type(&self) -> &'static str {
        content_type(&self.kind)
    }
}

/// MIME type for an extension such as `".html"`
pub fn content_type(kind: &str) -> &'static str {
    match kind.to_ascii_lowercase().as_str() {
        ".html" | ".htm" => "text/html",
        ".css" => "text/css",
        ".js" | ".mjs" => "text/javascript",
        ".json" => "application/json",
        ".svg" => "image/svg+xml",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".ico" => "image/x-icon",
        ".mp3" => "audio/mpeg",
        ".ogg" => "audio/ogg",
        ".wav" => "audio/wav",
        ".txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Serves files from a single directory tree
#[derive(Debug, Clone)]
pub struct PublicFiles {
    root: PathBuf,
}

impl PublicFiles {
    /// Create a lookup rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the public root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a request path onto the root
    ///
    /// Leading slashes are ignored; paths that climb out of the root with
    /// `..` do not resolve.
    pub fn resolve(&self, file: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();

        for component in Path::new(file).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => return None,
            }
        }

        Some(resolved)
    }

    /// Resolve `file` and check that it exists
    pub async fn file_info(&self, file: &str) -> Result<FileInfo> {
        let name = self
            .resolve(file)
            .ok_or_else(|| Error::NotFound(PathBuf::from(file)))?;

        match tokio::fs::metadata(&name).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(Error::NotFound(name)),
        }

        let kind = name
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Ok(FileInfo { name, kind })
    }

    /// Resolve and open `file` for streaming
    pub async fn open(&self, file: &str) -> Result<(File, FileInfo)> {
        let info = self.file_info(file).await?;
        let stream = File::open(&info.name).await?;
        Ok((stream, info))
    }
}
