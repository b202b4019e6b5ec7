//! Transfer planning
//!
//! Decides whether a copy moves one object or a whole prefix, and derives
//! the destination path of every source object.

use crate::error::{PathmanError, Result};
use crate::path::{BackendTag, PathHandle, SEPARATOR};
use crate::storage::Storage;

/// Shape of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferShape {
    /// One object to one destination path
    Single {
        /// Full destination path
        destination: PathHandle,
    },
    /// Every object under a key prefix, mirrored below the destination
    Recursive {
        /// Listing prefix; its segments are stripped from each key
        prefix: String,
    },
}

/// One object-level copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    /// Source object or file
    pub source: PathHandle,
    /// Destination object or file
    pub destination: PathHandle,
}

impl TransferTask {
    /// Create a task
    pub fn new(source: PathHandle, destination: PathHandle) -> Self {
        Self { source, destination }
    }
}

/// Decide the shape of a copy from `source` to `dest`.
///
/// Directories (per [`Storage::is_dir`]) are copied recursively, files as a
/// single object. Anything else, including a missing source, is rejected.
pub async fn plan(storage: &Storage, source: &PathHandle, dest: &PathHandle) -> Result<TransferShape> {
    if storage.is_dir(source).await? {
        let key = source.key().unwrap_or(source.as_str());
        return Ok(TransferShape::Recursive {
            prefix: listing_prefix(key),
        });
    }

    if storage.is_file(source).await? {
        let destination = single_destination(storage, source, dest).await?;
        return Ok(TransferShape::Single { destination });
    }

    Err(PathmanError::UnsupportedCopyOperation(format!(
        "source is neither a directory nor a file: {}",
        source
    )))
}

/// Destination of a single-object copy.
///
/// If `dest` names a directory the source's final segment is appended,
/// otherwise `dest` is used verbatim.
pub async fn single_destination(storage: &Storage, source: &PathHandle, dest: &PathHandle) -> Result<PathHandle> {
    if !is_directory_destination(storage, dest).await? {
        return Ok(dest.clone());
    }

    let name = source
        .parts()
        .last()
        .copied()
        .ok_or_else(|| PathmanError::InvalidPath(format!("source has no final segment: {}", source)))?;
    Ok(dest.join([name]))
}

/// Whether `dest` is treated as a directory.
///
/// Object-store destinations need not exist, so only the shape heuristic
/// applies. Local destinations are directories if they exist as one or
/// end with a separator.
pub async fn is_directory_destination(storage: &Storage, dest: &PathHandle) -> Result<bool> {
    match dest.backend() {
        BackendTag::ObjectStore => Ok(dest.is_directory_shaped()),
        BackendTag::Local => Ok(dest.as_str().ends_with(SEPARATOR) || storage.is_dir(dest).await?),
    }
}

/// Key prefix that lists the contents of `key` as a directory
pub fn listing_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with(SEPARATOR) {
        key.to_string()
    } else {
        format!("{}{}", key, SEPARATOR)
    }
}

/// Segments of `key` below `prefix`.
///
/// Prefix segments are compared whole, so `foobar/x` is not below `foo`.
/// Returns `None` when the key is not strictly below the prefix, or when a
/// remaining segment is `.` or `..` and would resolve outside the destination.
pub fn relative_segments<'k>(key: &'k str, prefix: &str) -> Option<Vec<&'k str>> {
    let mut key_segments = key.split(SEPARATOR).filter(|s| !s.is_empty());
    for expected in prefix.split(SEPARATOR).filter(|s| !s.is_empty()) {
        if key_segments.next()? != expected {
            return None;
        }
    }

    let rest: Vec<&str> = key_segments.collect();
    if rest.is_empty() || rest.iter().any(|s| *s == "." || *s == "..") {
        return None;
    }
    Some(rest)
}

/// Tasks for one listing page of a recursive copy.
///
/// Keys that are not strictly below the prefix (directory markers,
/// sibling prefixes sharing a partial segment) and keys with `.` or `..`
/// segments are skipped.
pub fn plan_page(keys: &[String], bucket: &str, prefix: &str, dest: &PathHandle) -> Vec<TransferTask> {
    keys.iter()
        .filter(|key| !key.ends_with(SEPARATOR))
        .filter_map(|key| match relative_segments(key, prefix) {
            Some(segments) => {
                let source = PathHandle::new(format!("s3://{}/{}", bucket, key));
                Some(TransferTask::new(source, dest.join(segments)))
            }
            None => {
                tracing::debug!("Skipping {} (not a plain path below prefix {:?})", key, prefix);
                None
            }
        })
        .collect()
}
