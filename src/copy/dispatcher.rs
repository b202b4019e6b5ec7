//! Copy dispatcher
//!
//! Routes a (source backend, destination backend) pair to a transfer
//! strategy:
//!
//! | source       | destination  | strategy                               |
//! |--------------|--------------|----------------------------------------|
//! | local        | object store | single-object upload                   |
//! | object store | object store | server-side copy                       |
//! | object store | local        | planner + paginator + parallel workers |
//!
//! Local to local copies are not handled here.

use crate::config::CopyOptions;
use crate::copy::{
    plan, plan_page, single_destination, Download, ParallelExecutor, Paginator, Transfer, TransferShape,
    TransferTask,
};
use crate::error::{PathmanError, Result};
use crate::path::{BackendTag, PathHandle};
use crate::storage::Storage;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Transfer strategy for a backend pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// Local file to object store
    Upload,
    /// Object store to object store, inside the store
    ServerSideCopy,
    /// Object store to local filesystem
    Download,
}

impl CopyStrategy {
    /// Select the strategy for a backend pair
    pub fn select(source: BackendTag, destination: BackendTag) -> Result<Self> {
        match (source, destination) {
            (BackendTag::Local, BackendTag::ObjectStore) => Ok(Self::Upload),
            (BackendTag::ObjectStore, BackendTag::ObjectStore) => Ok(Self::ServerSideCopy),
            (BackendTag::ObjectStore, BackendTag::Local) => Ok(Self::Download),
            (src, dst) => Err(PathmanError::UnsupportedCopyOperation(format!(
                "{} -> {} is not supported; only local -> object-store, object-store -> object-store \
                 and object-store -> local are",
                src, dst
            ))),
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::ServerSideCopy => "server-side copy",
            Self::Download => "download",
        }
    }
}

impl fmt::Display for CopyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a completed copy
#[derive(Debug, Clone)]
pub struct CopyReport {
    /// Strategy used
    pub strategy: CopyStrategy,
    /// Objects transferred
    pub objects: u64,
    /// Bytes transferred (0 for server-side copies)
    pub bytes: u64,
    /// Listing pages processed
    pub pages: usize,
    /// Total duration
    pub duration: Duration,
}

impl CopyReport {
    fn new(strategy: CopyStrategy) -> Self {
        Self {
            strategy,
            objects: 0,
            bytes: 0,
            pages: 0,
            duration: Duration::ZERO,
        }
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\n=== Copy Summary ===");
        println!("Strategy:        {}", self.strategy);
        println!("Objects:         {}", self.objects);
        println!("Bytes:           {}", humansize::format_size(self.bytes, humansize::BINARY));
        if self.pages > 0 {
            println!("Listing pages:   {}", self.pages);
        }
        println!("Duration:        {:.2?}", self.duration);
    }
}

/// Copies between backends using the adapters held by a [`Storage`]
#[derive(Clone)]
pub struct Copier {
    storage: Storage,
    options: CopyOptions,
}

impl Copier {
    /// Create a copier with default options
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            options: CopyOptions::default(),
        }
    }

    /// Set copy options
    pub fn with_options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    /// Storage adapters in use
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Copy `source` to `dest`.
    ///
    /// On error an unspecified subset of the objects may already be at the
    /// destination; copies overwrite, so re-running is safe.
    pub async fn copy(&self, source: &PathHandle, dest: &PathHandle) -> Result<CopyReport> {
        let start = Instant::now();
        let strategy = CopyStrategy::select(source.backend(), dest.backend())?;
        tracing::debug!("Copying {} -> {} ({})", source, dest, strategy);

        let mut report = match strategy {
            CopyStrategy::Upload => self.upload(source, dest).await?,
            CopyStrategy::ServerSideCopy => self.server_side_copy(source, dest).await?,
            CopyStrategy::Download => self.download(source, dest).await?,
        };

        report.duration = start.elapsed();
        tracing::info!(
            "Copied {} -> {}: {} objects, {} bytes in {:.2?}",
            source,
            dest,
            report.objects,
            report.bytes,
            report.duration
        );
        Ok(report)
    }

    async fn upload(&self, source: &PathHandle, dest: &PathHandle) -> Result<CopyReport> {
        if !self.storage.local().is_file(&source.to_local_path()).await {
            return Err(PathmanError::UnsupportedCopyOperation(format!(
                "upload source must be an existing file: {}",
                source
            )));
        }

        let destination = single_destination(&self.storage, source, dest).await?;
        let (bucket, key) = destination.location()?;
        let store = self.storage.object_store(&destination)?;

        let bytes = store
            .upload_file(&source.to_local_path(), bucket, key, &self.options.put)
            .await
            .map_err(|e| PathmanError::transfer(source.as_str(), destination.as_str(), e))?;

        let mut report = CopyReport::new(CopyStrategy::Upload);
        report.objects = 1;
        report.bytes = bytes;
        Ok(report)
    }

    async fn server_side_copy(&self, source: &PathHandle, dest: &PathHandle) -> Result<CopyReport> {
        if source.is_directory_shaped() {
            return Err(PathmanError::UnsupportedCopyOperation(format!(
                "server-side copy needs a single object, got prefix {}",
                source
            )));
        }

        let destination = single_destination(&self.storage, source, dest).await?;
        let (src_bucket, src_key) = source.location()?;
        let (dst_bucket, dst_key) = destination.location()?;
        let store = self.storage.object_store(source)?;

        store
            .server_side_copy(src_bucket, src_key, dst_bucket, dst_key)
            .await
            .map_err(|e| PathmanError::transfer(source.as_str(), destination.as_str(), e))?;

        let mut report = CopyReport::new(CopyStrategy::ServerSideCopy);
        report.objects = 1;
        Ok(report)
    }

    async fn download(&self, source: &PathHandle, dest: &PathHandle) -> Result<CopyReport> {
        let store = Arc::clone(self.storage.object_store(source)?);
        let transfer: Arc<dyn Transfer> = Arc::new(Download::new(Arc::clone(&store), *self.storage.local()));
        let mut report = CopyReport::new(CopyStrategy::Download);

        match plan(&self.storage, source, dest).await? {
            TransferShape::Single { destination } => {
                let task = TransferTask::new(source.clone(), destination);
                let outcome = ParallelExecutor::new(1).execute(vec![task], transfer).await?;
                report.objects = outcome.objects;
                report.bytes = outcome.bytes;
            }
            TransferShape::Recursive { prefix } => {
                let (bucket, _) = source.location()?;
                let executor = ParallelExecutor::new(self.options.effective_concurrency());
                let mut pages = Paginator::new(store.as_ref(), bucket, &prefix);

                // the next page is listed only after this page's workers are joined
                while let Some(page) = pages.next_page().await? {
                    let tasks = plan_page(&page.keys, bucket, &prefix, dest);
                    tracing::debug!("Page {}: {} transfers", pages.pages_fetched(), tasks.len());

                    let outcome = executor.execute(tasks, Arc::clone(&transfer)).await?;
                    report.objects += outcome.objects;
                    report.bytes += outcome.bytes;
                }
                report.pages = pages.pages_fetched();
            }
        }

        Ok(report)
    }
}

/// Copy `source` to `dest` with the given storage and options
pub async fn copy(storage: &Storage, source: &PathHandle, dest: &PathHandle, options: CopyOptions) -> Result<CopyReport> {
    Copier::new(storage.clone())
        .with_options(options)
        .copy(source, dest)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;
    use tempfile::TempDir;

    fn local(path: &std::path::Path) -> PathHandle {
        PathHandle::new(path.to_string_lossy().into_owned())
    }

    fn files_under(root: &std::path::Path) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_routing_table() {
        use BackendTag::*;
        assert_eq!(CopyStrategy::select(Local, ObjectStore).unwrap(), CopyStrategy::Upload);
        assert_eq!(CopyStrategy::select(ObjectStore, ObjectStore).unwrap(), CopyStrategy::ServerSideCopy);
        assert_eq!(CopyStrategy::select(ObjectStore, Local).unwrap(), CopyStrategy::Download);
        assert!(matches!(
            CopyStrategy::select(Local, Local),
            Err(PathmanError::UnsupportedCopyOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_recursive_download() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("bucket", "pfx/a.txt", "alpha");
        store.insert("bucket", "pfx/sub/b.txt", "beta");
        store.insert("bucket", "pfxother/c.txt", "gamma");
        let storage = Storage::new(store.clone());

        let dest = local(&dir.path().join("D"));
        let report = copy(&storage, &"s3://bucket/pfx".into(), &dest, CopyOptions::default())
            .await
            .unwrap();

        assert_eq!(report.strategy, CopyStrategy::Download);
        assert_eq!(report.objects, 2);
        assert_eq!(report.bytes, 9);
        assert_eq!(files_under(dir.path()), vec!["D/a.txt", "D/sub/b.txt"]);
        assert_eq!(std::fs::read(dir.path().join("D/a.txt")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(dir.path().join("D/sub/b.txt")).unwrap(), b"beta");
    }

    #[tokio::test]
    async fn test_recursive_download_over_three_pages() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new().with_page_size(3));
        for i in 0..8 {
            store.insert("bucket", &format!("data/f{}.txt", i), format!("{}", i));
        }
        let storage = Storage::new(store.clone());

        let report = Copier::new(storage)
            .with_options(CopyOptions::default().with_max_concurrency(2))
            .copy(&"s3://bucket/data".into(), &local(dir.path()))
            .await
            .unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.objects, 8);
        let pages: Vec<Option<String>> = store
            .list_calls()
            .into_iter()
            .filter(|c| c.prefix == "data/")
            .map(|c| c.token)
            .collect();
        assert_eq!(
            pages,
            vec![None, Some("data/f2.txt".to_string()), Some("data/f5.txt".to_string())]
        );
        assert_eq!(files_under(dir.path()).len(), 8);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_listing() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new().with_page_size(5));
        for i in 0..10 {
            store.insert("bucket", &format!("data/f{}.txt", i), "x");
        }
        store.fail_key("data/f1.txt");
        let storage = Storage::new(store.clone());

        let err = copy(
            &storage,
            &"s3://bucket/data".into(),
            &local(dir.path()),
            CopyOptions::default().with_max_concurrency(5),
        )
        .await
        .unwrap_err();

        match &err {
            PathmanError::TransferFailure {
                source_id,
                destination_id,
                source,
            } => {
                assert_eq!(source_id, "s3://bucket/data/f1.txt");
                assert_eq!(destination_id, &dir.path().join("f1.txt").to_string_lossy());
                assert!(matches!(
                    source.as_ref(),
                    PathmanError::Backend { operation, message }
                        if operation == "get" && message.contains("data/f1.txt")
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        let page_calls = store.list_calls().into_iter().filter(|c| c.prefix == "data/").count();
        assert_eq!(page_calls, 1);

        // only first-page objects were fetched or written
        let gets = store.gets_started();
        assert!((2..=5).contains(&gets), "gets started: {gets}");
        let written = files_under(dir.path());
        assert!(written.len() < 5);
        for name in ["f5.txt", "f6.txt", "f7.txt", "f8.txt", "f9.txt", "f1.txt"] {
            assert!(!written.iter().any(|w| w == name), "{name} was written");
        }
    }

    #[tokio::test]
    async fn test_sibling_prefix_is_not_a_source_directory() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("bucket", "pfxother/c.txt", "c");
        store.insert("bucket", "a.txt.bak", "bak");
        let storage = Storage::new(store);

        for source in ["s3://bucket/pfx", "s3://bucket/a.txt"] {
            let err = copy(&storage, &source.into(), &local(dir.path()), CopyOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, PathmanError::UnsupportedCopyOperation(_)), "{source}: {err}");
        }
        assert!(files_under(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_download_single_object_into_directory() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("bucket", "pfx/report.csv", "a,b");
        let storage = Storage::new(store);

        copy(&storage, &"s3://bucket/pfx/report.csv".into(), &local(dir.path()), CopyOptions::default())
            .await
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("report.csv")).unwrap(), b"a,b");

        let renamed = local(&dir.path().join("renamed.csv"));
        copy(&storage, &"s3://bucket/pfx/report.csv".into(), &renamed, CopyOptions::default())
            .await
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("renamed.csv")).unwrap(), b"a,b");
    }

    #[tokio::test]
    async fn test_upload_into_directory_shaped_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("report.csv");
        std::fs::write(&source, "1,2,3").unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        let storage = Storage::new(store.clone());

        let report = copy(&storage, &local(&source), &"s3://bucket/out/".into(), CopyOptions::default())
            .await
            .unwrap();

        assert_eq!(report.strategy, CopyStrategy::Upload);
        assert_eq!(report.bytes, 5);
        assert_eq!(store.keys("bucket"), vec!["out/report.csv"]);
    }

    #[tokio::test]
    async fn test_upload_rejects_directory_and_missing_source() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(Arc::new(MemoryObjectStore::new()));

        for source in [local(dir.path()), local(&dir.path().join("missing.txt"))] {
            let err = copy(&storage, &source, &"s3://bucket/out/".into(), CopyOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, PathmanError::UnsupportedCopyOperation(_)));
        }
    }

    #[tokio::test]
    async fn test_server_side_copy() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("src", "a/report.csv", "data");
        let storage = Storage::new(store.clone());

        let report = copy(&storage, &"s3://src/a/report.csv".into(), &"s3://dst/b/".into(), CopyOptions::default())
            .await
            .unwrap();
        assert_eq!(report.strategy, CopyStrategy::ServerSideCopy);
        assert_eq!(store.object("dst", "b/report.csv"), Some(b"data".to_vec()));

        let err = copy(&storage, &"s3://src/a".into(), &"s3://dst/b/".into(), CopyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PathmanError::UnsupportedCopyOperation(_)));
    }

    #[tokio::test]
    async fn test_local_to_local_is_rejected() {
        let storage = Storage::local_only();
        let err = copy(&storage, &"/a/x.txt".into(), &"/b/x.txt".into(), CopyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PathmanError::UnsupportedCopyOperation(_)));
    }

    #[tokio::test]
    async fn test_rerun_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("bucket", "pfx/a.txt", "first");
        store.insert("bucket", "pfx/sub/b.txt", "b");
        let storage = Storage::new(store.clone());
        let dest = local(dir.path());

        copy(&storage, &"s3://bucket/pfx".into(), &dest, CopyOptions::default()).await.unwrap();
        let before = files_under(dir.path());
        copy(&storage, &"s3://bucket/pfx".into(), &dest, CopyOptions::default()).await.unwrap();
        assert_eq!(files_under(dir.path()), before);

        store.insert("bucket", "pfx/a.txt", "2nd");
        copy(&storage, &"s3://bucket/pfx".into(), &dest, CopyOptions::default()).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"2nd");
        assert_eq!(files_under(dir.path()), before);
    }
}
