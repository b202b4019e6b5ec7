//! Object-store capability interface
//!
//! Every object-store adapter implements [`ObjectStore`]. The copy engine
//! only talks to this trait, so an adapter can be swapped for an in-memory
//! fake in tests.

use crate::error::{IoResultExt, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Object keys in backend order
    pub keys: Vec<String>,
    /// Token for the next page; `None` on the last page
    pub next_token: Option<String>,
}

impl ListPage {
    /// Check if this is the final page
    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

/// Extra arguments forwarded to object uploads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOptions {
    /// Storage class (STANDARD, GLACIER, ...)
    pub storage_class: Option<String>,
    /// Content type
    pub content_type: Option<String>,
}

/// Capabilities the core needs from an object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys under `prefix`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage>;

    /// Check whether an object or any object under the prefix exists
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Fetch the contents of an object
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Store an object, replacing any existing one
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>, options: &PutOptions) -> Result<()>;

    /// Delete an object
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;

    /// Copy an object inside the store without moving data through the caller
    async fn server_side_copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()>;

    /// Upload a local file. Returns the number of bytes uploaded.
    async fn upload_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        options: &PutOptions,
    ) -> Result<u64> {
        let data = tokio::fs::read(local_path).await.with_path(local_path)?;
        let len = data.len() as u64;
        self.put(bucket, key, data, options).await?;
        Ok(len)
    }

    /// Download an object to a local file, overwriting it. Returns bytes written.
    ///
    /// The parent directory must already exist.
    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64> {
        let data = self.get(bucket, key).await?;
        let len = data.len() as u64;
        tokio::fs::write(local_path, &data).await.with_path(local_path)?;
        Ok(len)
    }
}
