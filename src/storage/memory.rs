//! In-memory object store
//!
//! Keeps objects in a sorted map and pages listings like S3 does. It
//! records every list call and can be told to fail reads or writes of
//! specific keys, which makes it the fake backend for copy-engine tests.

use crate::error::{PathmanError, Result};
use crate::storage::{ListPage, ObjectStore, PutOptions};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Default number of keys per listing page (S3 returns up to 1000)
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// A recorded list call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCall {
    /// Bucket listed
    pub bucket: String,
    /// Prefix listed
    pub prefix: String,
    /// Continuation token passed in
    pub token: Option<String>,
}

/// In-memory [`ObjectStore`]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    page_size: usize,
    get_delay: Option<Duration>,
    failing_keys: Mutex<HashSet<String>>,
    list_calls: Mutex<Vec<ListCall>>,
    gets_started: AtomicUsize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            get_delay: None,
            failing_keys: Mutex::new(HashSet::new()),
            list_calls: Mutex::new(Vec::new()),
            gets_started: AtomicUsize::new(0),
        }
    }

    /// Set the number of keys returned per listing page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every `get` by a fixed duration
    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    /// Insert an object
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        lock(&self.objects).insert((bucket.to_string(), key.to_string()), data.into());
    }

    /// Get a copy of an object's contents
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys stored in a bucket
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.objects)
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Make every read or write of `key` fail
    pub fn fail_key(&self, key: &str) {
        lock(&self.failing_keys).insert(key.to_string());
    }

    /// List calls made so far, in order
    pub fn list_calls(&self) -> Vec<ListCall> {
        lock(&self.list_calls).clone()
    }

    /// Number of `get` calls started so far
    pub fn gets_started(&self) -> usize {
        self.gets_started.load(Ordering::SeqCst)
    }

    fn check_failure(&self, operation: &str, key: &str) -> Result<()> {
        if lock(&self.failing_keys).contains(key) {
            return Err(PathmanError::backend(operation, format!("injected failure for {}", key)));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        lock(&self.list_calls).push(ListCall {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            token: continuation_token.clone(),
        });

        // the token is the last key of the previous page
        let objects = lock(&self.objects);
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .filter(|(_, k)| continuation_token.as_deref().map_or(true, |t| k.as_str() > t))
            .map(|(_, k)| k.clone())
            .take(self.page_size + 1)
            .collect();

        let next_token = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let objects = lock(&self.objects);
        let dir_prefix = format!("{}/", key.trim_end_matches('/'));
        Ok(objects.keys().any(|(b, k)| {
            b == bucket && (key.is_empty() || k == key || k.starts_with(&dir_prefix))
        }))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.gets_started.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure("get", key)?;
        self.object(bucket, key)
            .ok_or_else(|| PathmanError::NotFound(format!("s3://{}/{}", bucket, key)))
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>, _options: &PutOptions) -> Result<()> {
        self.check_failure("put", key)?;
        self.insert(bucket, key, data);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        lock(&self.objects).remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn server_side_copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        self.check_failure("copy", src_key)?;
        let data = self
            .object(src_bucket, src_key)
            .ok_or_else(|| PathmanError::NotFound(format!("s3://{}/{}", src_bucket, src_key)))?;
        self.insert(dst_bucket, dst_key, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paging_uses_last_key_as_token() {
        let store = MemoryObjectStore::new().with_page_size(2);
        for key in ["p/a", "p/b", "p/c", "q/d"] {
            store.insert("bucket", key, "x");
        }

        let first = store.list_page("bucket", "p/", None).await.unwrap();
        assert_eq!(first.keys, vec!["p/a", "p/b"]);
        assert_eq!(first.next_token.as_deref(), Some("p/b"));

        let second = store.list_page("bucket", "p/", first.next_token).await.unwrap();
        assert_eq!(second.keys, vec!["p/c"]);
        assert!(second.is_last());
        assert_eq!(store.list_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_exists_covers_prefixes() {
        let store = MemoryObjectStore::new();
        store.insert("bucket", "pfx/sub/a.txt", "x");

        assert!(store.exists("bucket", "pfx").await.unwrap());
        assert!(store.exists("bucket", "pfx/").await.unwrap());
        assert!(store.exists("bucket", "pfx/sub/a.txt").await.unwrap());
        assert!(!store.exists("bucket", "pf").await.unwrap());
        assert!(!store.exists("other", "pfx").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_matches_whole_segments() {
        let store = MemoryObjectStore::new();
        store.insert("bucket", "pfxother/c.txt", "x");
        store.insert("bucket", "a.txt.bak", "x");

        assert!(!store.exists("bucket", "pfx").await.unwrap());
        assert!(!store.exists("bucket", "a.txt").await.unwrap());
        assert!(store.exists("bucket", "a.txt.bak").await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryObjectStore::new();
        store.insert("bucket", "k", "x");
        store.fail_key("k");

        assert!(store.get("bucket", "k").await.is_err());
        assert_eq!(store.gets_started(), 1);
    }
}
