//! # Pathman - One Path Type for Local Files and S3
//!
//! Pathman gives local filesystem paths and S3 object paths a single
//! handle type, routes file operations to the right backend, and copies
//! files or whole prefixes between backends.
//!
//! ## Features
//!
//! - **Path Handles**: `s3://bucket/key` and local paths behind one type
//! - **Shape Heuristics**: file vs directory classification for object keys
//! - **Storage Facade**: read, write, list, walk and glob on either backend
//! - **Copy Engine**: upload, server-side copy and parallel recursive download
//! - **Lazy Pagination**: one listing page in memory at a time
//!
//! ## Quick Start
//!
//! ```no_run
//! use pathman::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> pathman::Result<()> {
//! let store = Arc::new(MemoryObjectStore::new());
//! store.insert("bucket", "reports/2024.csv", "a,b\n1,2\n");
//! let storage = Storage::new(store);
//!
//! let report = Copier::new(storage)
//!     .copy(&"s3://bucket/reports".into(), &"/tmp/reports".into())
//!     .await?;
//! report.print_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Path Decomposition
//!
//! ```
//! use pathman::PathHandle;
//!
//! let path = PathHandle::new("s3://bucket/data/file.txt");
//! assert_eq!(path.bucket(), Some("bucket"));
//! assert_eq!(path.key(), Some("data/file.txt"));
//! assert_eq!(path.parts(), vec!["bucket", "data", "file.txt"]);
//! assert!(path.is_file_shaped());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod copy;
pub mod error;
pub mod path;
pub mod storage;

// Re-export commonly used types
pub use config::{CopyOptions, ObjectStoreConfig};
pub use copy::{copy, CopyReport, CopyStrategy, Copier};
pub use error::{PathmanError, Result};
pub use path::{BackendTag, PathHandle};
pub use storage::{ObjectStore, Storage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use pathman::prelude::*;
    //! ```

    pub use crate::config::{CopyOptions, ObjectStoreConfig};
    pub use crate::copy::{copy, Copier, CopyReport, CopyStrategy};
    pub use crate::error::{PathmanError, Result};
    pub use crate::path::{BackendTag, PathHandle};
    pub use crate::storage::{LocalFs, MemoryObjectStore, ObjectStore, PutOptions, Storage};
    #[cfg(feature = "native_s3")]
    pub use crate::storage::NativeS3Store;
}
