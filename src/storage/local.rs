//! Local filesystem adapter

use crate::error::{IoResultExt, PathmanError, Result};
use std::path::{Path, PathBuf};

/// Local filesystem backend
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new local adapter
    pub fn new() -> Self {
        Self
    }

    /// Check if the path exists
    pub async fn exists(&self, path: &Path) -> Result<bool> {
        tokio::fs::try_exists(path).await.with_path(path)
    }

    /// Check if the path is an existing directory
    pub async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
    }

    /// Check if the path is an existing regular file
    pub async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
    }

    /// Read a whole file
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| not_found_or_io(path, e))
    }

    /// Write a whole file, replacing existing contents
    pub async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tokio::fs::write(path, data).await.with_path(path)
    }

    /// Create a directory and its parents. Succeeds if it already exists.
    pub async fn mkdir_all(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(path).await.with_path(path)
    }

    /// Create an empty file or update the modification time of an existing one
    pub async fn touch(&self, path: &Path) -> Result<()> {
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_path(path)?;
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(path, now).with_path(path)
    }

    /// Remove a file
    pub async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await.map_err(|e| not_found_or_io(path, e))
    }

    /// Remove a directory; with `recursive` its contents are removed too
    pub async fn remove_dir(&self, path: &Path, recursive: bool) -> Result<()> {
        let result = if recursive {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_dir(path).await
        };
        result.map_err(|e| not_found_or_io(path, e))
    }

    /// Immediate children of a directory, sorted by name
    pub async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| not_found_or_io(path, e))?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.with_path(path)? {
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }

    /// All regular files below a directory
    pub async fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let path = e.path().unwrap_or(&root).to_path_buf();
                    match e.into_io_error() {
                        Some(io) => PathmanError::io(path, io),
                        None => PathmanError::InvalidPath(format!("filesystem loop at {}", path.display())),
                    }
                })?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            Ok(files)
        })
        .await
        .map_err(|e| PathmanError::Join(e.to_string()))?
    }
}

fn not_found_or_io(path: &Path, err: std::io::Error) -> PathmanError {
    if err.kind() == std::io::ErrorKind::NotFound {
        PathmanError::NotFound(path.display().to_string())
    } else {
        PathmanError::io(path, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mkdir_all_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let nested = dir.path().join("a/b/c");

        fs.mkdir_all(&nested).await.unwrap();
        fs.mkdir_all(&nested).await.unwrap();
        assert!(fs.is_dir(&nested).await);
    }

    #[tokio::test]
    async fn test_read_write_touch_remove() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let file = dir.path().join("data.bin");

        fs.write(&file, b"hello").await.unwrap();
        assert_eq!(fs.read(&file).await.unwrap(), b"hello");
        assert!(fs.is_file(&file).await);

        fs.touch(&file).await.unwrap();
        assert_eq!(fs.read(&file).await.unwrap(), b"hello");

        fs.remove_file(&file).await.unwrap();
        assert!(!fs.exists(&file).await.unwrap());
        assert!(fs.read(&file).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_walk_and_list() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        fs.mkdir_all(&dir.path().join("sub")).await.unwrap();
        fs.write(&dir.path().join("a.txt"), b"a").await.unwrap();
        fs.write(&dir.path().join("sub/b.txt"), b"b").await.unwrap();

        let files = fs.walk(dir.path()).await.unwrap();
        assert_eq!(files, vec![dir.path().join("a.txt"), dir.path().join("sub/b.txt")]);

        let children = fs.list_dir(dir.path()).await.unwrap();
        assert_eq!(children, vec![dir.path().join("a.txt"), dir.path().join("sub")]);
    }

    #[tokio::test]
    async fn test_remove_dir() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new();
        let tree = dir.path().join("tree");
        fs.mkdir_all(&tree.join("leaf")).await.unwrap();

        assert!(fs.remove_dir(&tree, false).await.is_err());
        fs.remove_dir(&tree, true).await.unwrap();
        assert!(!fs.exists(&tree).await.unwrap());
    }
}
