//! Backend-agnostic storage facade
//!
//! [`Storage`] holds the injected adapters and routes each
//! [`PathHandle`] to the right one. Object-store handles go to the
//! configured [`ObjectStore`]; everything else to [`LocalFs`].

use crate::error::{PathmanError, Result};
use crate::path::{BackendTag, PathHandle, SEPARATOR};
use crate::copy::{listing_prefix, Paginator};
use crate::storage::{LocalFs, ObjectStore, PutOptions};
use globset::Glob;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Adapter chosen for a handle
pub(crate) enum Route<'a> {
    Local(&'a LocalFs),
    Object {
        store: &'a Arc<dyn ObjectStore>,
        bucket: &'a str,
        key: &'a str,
    },
}

/// Storage adapters shared by path operations and the copy engine
#[derive(Clone)]
pub struct Storage {
    local: LocalFs,
    object_store: Option<Arc<dyn ObjectStore>>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::local_only()
    }
}

impl Storage {
    /// Storage with only the local backend
    pub fn local_only() -> Self {
        Self {
            local: LocalFs::new(),
            object_store: None,
        }
    }

    /// Storage with local and object-store backends
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            local: LocalFs::new(),
            object_store: Some(object_store),
        }
    }

    /// Local adapter
    pub fn local(&self) -> &LocalFs {
        &self.local
    }

    /// Object-store adapter, or an error naming the path that needed it
    pub fn object_store(&self, path: &PathHandle) -> Result<&Arc<dyn ObjectStore>> {
        self.object_store.as_ref().ok_or_else(|| {
            PathmanError::unsupported_path(path.as_str(), "no object-store backend is configured")
        })
    }

    pub(crate) fn route<'a>(&'a self, path: &'a PathHandle) -> Result<Route<'a>> {
        match path.backend() {
            BackendTag::Local => Ok(Route::Local(&self.local)),
            BackendTag::ObjectStore => {
                let store = self.object_store(path)?;
                let (bucket, key) = path.location()?;
                Ok(Route::Object { store, bucket, key })
            }
        }
    }

    /// Check if the path exists
    pub async fn exists(&self, path: &PathHandle) -> Result<bool> {
        match self.route(path)? {
            Route::Local(fs) => fs.exists(&path.to_local_path()).await,
            Route::Object { store, bucket, key } => store.exists(bucket, key).await,
        }
    }

    /// Check if the path is a directory.
    ///
    /// Object-store paths are directories when something exists under them
    /// and they are not file-shaped.
    pub async fn is_dir(&self, path: &PathHandle) -> Result<bool> {
        match self.route(path)? {
            Route::Local(fs) => Ok(fs.is_dir(&path.to_local_path()).await),
            Route::Object { store, bucket, key } => {
                Ok(path.is_directory_shaped() && store.exists(bucket, key).await?)
            }
        }
    }

    /// Check if the path is a file (object store: exists and file-shaped)
    pub async fn is_file(&self, path: &PathHandle) -> Result<bool> {
        match self.route(path)? {
            Route::Local(fs) => Ok(fs.is_file(&path.to_local_path()).await),
            Route::Object { store, bucket, key } => {
                Ok(path.is_file_shaped() && store.exists(bucket, key).await?)
            }
        }
    }

    /// Read the whole file
    pub async fn read_bytes(&self, path: &PathHandle) -> Result<Vec<u8>> {
        match self.route(path)? {
            Route::Local(fs) => fs.read(&path.to_local_path()).await,
            Route::Object { store, bucket, key } => store.get(bucket, key).await,
        }
    }

    /// Read the whole file as UTF-8
    pub async fn read_text(&self, path: &PathHandle) -> Result<String> {
        let bytes = self.read_bytes(path).await?;
        String::from_utf8(bytes)
            .map_err(|e| PathmanError::InvalidPath(format!("{} is not valid UTF-8: {}", path, e)))
    }

    /// Write the whole file, returning the number of bytes written
    pub async fn write_bytes(&self, path: &PathHandle, data: &[u8]) -> Result<usize> {
        match self.route(path)? {
            Route::Local(fs) => fs.write(&path.to_local_path(), data).await?,
            Route::Object { store, bucket, key } => {
                store.put(bucket, key, data.to_vec(), &PutOptions::default()).await?
            }
        }
        Ok(data.len())
    }

    /// Write text, returning the number of characters written
    pub async fn write_text(&self, path: &PathHandle, text: &str) -> Result<usize> {
        self.write_bytes(path, text.as_bytes()).await?;
        Ok(text.chars().count())
    }

    /// Create an empty file, or refresh the timestamp of a local one
    pub async fn touch(&self, path: &PathHandle) -> Result<()> {
        match self.route(path)? {
            Route::Local(fs) => fs.touch(&path.to_local_path()).await,
            Route::Object { store, bucket, key } => {
                if store.exists(bucket, key).await? {
                    return Ok(());
                }
                store.put(bucket, key, Vec::new(), &PutOptions::default()).await
            }
        }
    }

    /// Create a directory with its parents; object-store prefixes need no
    /// creation, so this is a no-op there
    pub async fn mkdir(&self, path: &PathHandle) -> Result<()> {
        match self.route(path)? {
            Route::Local(fs) => fs.mkdir_all(&path.to_local_path()).await,
            Route::Object { .. } => Ok(()),
        }
    }

    /// Remove a file
    pub async fn remove(&self, path: &PathHandle) -> Result<()> {
        match self.route(path)? {
            Route::Local(fs) => fs.remove_file(&path.to_local_path()).await,
            Route::Object { store, bucket, key } => store.delete(bucket, key).await,
        }
    }

    /// Remove a directory. Without `recursive` it must be empty.
    pub async fn rmdir(&self, path: &PathHandle, recursive: bool) -> Result<()> {
        match self.route(path)? {
            Route::Local(fs) => fs.remove_dir(&path.to_local_path(), recursive).await,
            Route::Object { store, bucket, key } => {
                let prefix = listing_prefix(key);
                let mut pages = Paginator::new(store.as_ref(), bucket, &prefix);
                while let Some(page) = pages.next_page().await? {
                    if !page.keys.is_empty() && !recursive {
                        return Err(PathmanError::InvalidPath(format!("{} is not empty", path)));
                    }
                    for object_key in &page.keys {
                        store.delete(bucket, object_key).await?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Immediate children of a directory
    pub async fn ls(&self, path: &PathHandle) -> Result<Vec<PathHandle>> {
        match self.route(path)? {
            Route::Local(fs) => {
                let children = fs.list_dir(&path.to_local_path()).await?;
                Ok(children
                    .into_iter()
                    .map(|p| PathHandle::new(p.to_string_lossy().into_owned()))
                    .collect())
            }
            Route::Object { store, bucket, key } => {
                let prefix = listing_prefix(key);
                let mut children = BTreeSet::new();
                let mut pages = Paginator::new(store.as_ref(), bucket, &prefix);
                while let Some(page) = pages.next_page().await? {
                    for object_key in page.keys {
                        let rest = &object_key[prefix.len()..];
                        if let Some(child) = rest.split(SEPARATOR).find(|s| !s.is_empty()) {
                            children.insert(format!("s3://{}/{}{}", bucket, prefix, child));
                        }
                    }
                }
                Ok(children.into_iter().map(PathHandle::new).collect())
            }
        }
    }

    /// Every file below a directory
    pub async fn walk(&self, path: &PathHandle) -> Result<Vec<PathHandle>> {
        match self.route(path)? {
            Route::Local(fs) => {
                let files = fs.walk(&path.to_local_path()).await?;
                Ok(files
                    .into_iter()
                    .map(|p| PathHandle::new(p.to_string_lossy().into_owned()))
                    .collect())
            }
            Route::Object { store, bucket, key } => {
                let prefix = listing_prefix(key);
                let mut files = Vec::new();
                let mut pages = Paginator::new(store.as_ref(), bucket, &prefix);
                while let Some(page) = pages.next_page().await? {
                    files.extend(
                        page.keys
                            .into_iter()
                            .filter(|k| !k.ends_with(SEPARATOR))
                            .map(|k| PathHandle::new(format!("s3://{}/{}", bucket, k))),
                    );
                }
                Ok(files)
            }
        }
    }

    /// Files below `path` whose path relative to it matches `pattern`
    pub async fn glob(&self, path: &PathHandle, pattern: &str) -> Result<Vec<PathHandle>> {
        let matcher = Glob::new(pattern)
            .map_err(|e| PathmanError::InvalidPath(format!("bad glob {:?}: {}", pattern, e)))?
            .compile_matcher();

        let base_len = path.as_str().trim_end_matches(SEPARATOR).len();
        let files = self.walk(path).await?;
        Ok(files
            .into_iter()
            .filter(|f| {
                let relative = f.as_str()[base_len..].trim_start_matches(SEPARATOR);
                matcher.is_match(relative)
            })
            .collect())
    }
}
