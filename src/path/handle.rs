//! Path handle value type

use crate::error::{PathmanError, Result};
use crate::path::{is_file_shaped, resolve_backend, split_extension, BackendTag, OBJECT_STORE_SCHEME, SEPARATOR};
use std::convert::Infallible;
use std::fmt;
use std::ops::Div;
use std::path::PathBuf;
use std::str::FromStr;

/// A path on any supported backend.
///
/// Equality is raw string equality: `/a/b` and `/a//b` are different
/// handles. No normalization is ever applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathHandle {
    raw: String,
    backend: BackendTag,
}

impl PathHandle {
    /// Create a handle, resolving the backend from the path prefix
    pub fn new(path: impl Into<String>) -> Self {
        let raw = path.into();
        let backend = resolve_backend(&raw);
        Self { raw, backend }
    }

    /// Raw path string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Backend this path belongs to
    pub fn backend(&self) -> BackendTag {
        self.backend
    }

    /// Check if this is an object-store path
    pub fn is_object_store(&self) -> bool {
        self.backend == BackendTag::ObjectStore
    }

    /// Check if this is a local path
    pub fn is_local(&self) -> bool {
        self.backend == BackendTag::Local
    }

    /// Shape heuristic: the final segment has an extension
    pub fn is_file_shaped(&self) -> bool {
        is_file_shaped(&self.raw)
    }

    /// Shape heuristic: the final segment has no extension
    pub fn is_directory_shaped(&self) -> bool {
        !self.is_file_shaped()
    }

    /// Bucket (container) of an object-store path
    pub fn bucket(&self) -> Option<&str> {
        let rest = self.raw.strip_prefix(OBJECT_STORE_SCHEME)?;
        Some(rest.split_once(SEPARATOR).map_or(rest, |(bucket, _)| bucket))
    }

    /// Key of an object-store path (everything after the bucket)
    pub fn key(&self) -> Option<&str> {
        let rest = self.raw.strip_prefix(OBJECT_STORE_SCHEME)?;
        Some(rest.split_once(SEPARATOR).map_or("", |(_, key)| key))
    }

    /// Bucket and key of an object-store path, or an error for local paths
    pub fn location(&self) -> Result<(&str, &str)> {
        match (self.bucket(), self.key()) {
            (Some(bucket), Some(key)) if !bucket.is_empty() => Ok((bucket, key)),
            (Some(_), Some(_)) => Err(PathmanError::InvalidPath(format!(
                "object-store path has no bucket: {}",
                self.raw
            ))),
            _ => Err(PathmanError::InvalidPath(format!(
                "not an object-store path: {}",
                self.raw
            ))),
        }
    }

    /// Local filesystem path
    pub fn to_local_path(&self) -> PathBuf {
        PathBuf::from(&self.raw)
    }

    /// Non-empty segments of the path.
    ///
    /// The object-store scheme is not a segment: `s3://b/k` has parts
    /// `["b", "k"]`.
    pub fn parts(&self) -> Vec<&str> {
        let body = self
            .raw
            .strip_prefix(OBJECT_STORE_SCHEME)
            .unwrap_or(&self.raw);
        body.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
    }

    /// Join segments onto this path.
    ///
    /// A segment starting with the separator replaces everything before it.
    pub fn join<S: AsRef<str>>(&self, segments: impl IntoIterator<Item = S>) -> Self {
        let mut joined = self.raw.clone();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.starts_with(SEPARATOR) {
                joined = segment.to_string();
            } else if joined.is_empty() || joined.ends_with(SEPARATOR) {
                joined.push_str(segment);
            } else {
                joined.push(SEPARATOR);
                joined.push_str(segment);
            }
        }
        Self::new(joined)
    }

    /// Final segment of the raw string (empty if it ends with a separator)
    pub fn basename(&self) -> &str {
        self.raw
            .rfind(SEPARATOR)
            .map_or(self.raw.as_str(), |i| &self.raw[i + 1..])
    }

    /// Extension of the final segment, including the dot
    pub fn extension(&self) -> &str {
        split_extension(&self.raw).1
    }

    /// Final segment without its extension
    pub fn stem(&self) -> &str {
        let name = self.parts().last().copied().unwrap_or("");
        split_extension(name).0
    }

    /// Directory containing this path
    pub fn parent(&self) -> Self {
        let Some(i) = self.raw.rfind(SEPARATOR) else {
            return Self::new("");
        };
        let head = &self.raw[..=i];
        let trimmed = head.trim_end_matches(SEPARATOR);
        if trimmed.is_empty() {
            Self::new(head)
        } else {
            Self::new(trimmed)
        }
    }

    /// Replace (local) or append (object store) a suffix
    pub fn with_suffix(&self, suffix: &str) -> Result<Self> {
        if self.is_object_store() {
            return Ok(Self::new(format!("{}{}", self.raw, suffix)));
        }

        if !suffix.is_empty() && (!suffix.starts_with('.') || suffix == ".") {
            return Err(PathmanError::InvalidPath(format!("invalid suffix {:?}", suffix)));
        }

        let name = self.basename();
        if name.is_empty() || name == "." || name == ".." {
            return Err(PathmanError::InvalidPath(format!("{} has an empty name", self.raw)));
        }

        let dir = &self.raw[..self.raw.len() - name.len()];
        let stem = match name.rfind('.') {
            Some(i) if i > 0 && i < name.len() - 1 => &name[..i],
            _ => name,
        };
        Ok(Self::new(format!("{}{}{}", dir, stem, suffix)))
    }

    /// Expand a leading `~` to the home directory (local paths only)
    pub fn expand_user(&self) -> Self {
        if self.is_object_store() {
            return self.clone();
        }

        let rest = match self.raw.strip_prefix('~') {
            Some(rest) if rest.is_empty() || rest.starts_with(SEPARATOR) => rest,
            _ => return self.clone(),
        };

        match std::env::var("HOME") {
            Ok(home) if !home.is_empty() => Self::new(format!("{}{}", home.trim_end_matches(SEPARATOR), rest)),
            _ => self.clone(),
        }
    }

    /// Make a local path absolute against the current directory
    pub fn absolute(&self) -> Result<Self> {
        if self.is_object_store() {
            return Ok(self.clone());
        }

        let path = std::path::absolute(&self.raw)
            .map_err(|e| PathmanError::io(self.to_local_path(), e))?;
        path.to_str()
            .map(Self::new)
            .ok_or_else(|| PathmanError::InvalidPath(format!("{} is not valid UTF-8", path.display())))
    }
}

impl fmt::Display for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for PathHandle {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl FromStr for PathHandle {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for PathHandle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PathHandle {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Div<&str> for &PathHandle {
    type Output = PathHandle;

    fn div(self, segment: &str) -> PathHandle {
        self.join([segment])
    }
}
