//! Backend resolution and the file-shape heuristic
//!
//! Object stores have no directory entities, so whether an object-store
//! path names a "file" or a "directory" is decided from the path string
//! alone: a path is file-shaped when its last segment carries an extension.
//!
//! Known limitation: a directory whose name contains a dot (for example
//! `s3://bucket/releases/v1.2`) is classified as a file. Callers relying on
//! recursive copies of such prefixes must add a trailing separator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme prefix that marks an object-store path
pub const OBJECT_STORE_SCHEME: &str = "s3://";

/// Path separator used by every backend
pub const SEPARATOR: char = '/';

/// Storage backend a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendTag {
    /// Local filesystem
    Local,
    /// S3-style object store
    ObjectStore,
}

impl BackendTag {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ObjectStore => "object-store",
        }
    }
}

impl fmt::Display for BackendTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a path by its scheme prefix
pub fn resolve_backend(path: &str) -> BackendTag {
    if path.starts_with(OBJECT_STORE_SCHEME) {
        BackendTag::ObjectStore
    } else {
        BackendTag::Local
    }
}

/// Split a path into (root, extension).
///
/// The extension starts at the last dot of the final segment and includes
/// it. Leading dots of the final segment do not start an extension, so
/// `.bashrc` has none while `archive.` has the extension `.`.
pub fn split_extension(path: &str) -> (&str, &str) {
    let sep_index = path.rfind(SEPARATOR);
    let Some(dot_index) = path.rfind('.') else {
        return (path, "");
    };

    let name_start = match sep_index {
        Some(sep) if sep > dot_index => return (path, ""),
        Some(sep) => sep + 1,
        None => 0,
    };

    if path[name_start..dot_index].bytes().any(|b| b != b'.') {
        (&path[..dot_index], &path[dot_index..])
    } else {
        (path, "")
    }
}

/// Check whether a path looks like a file (has an extension)
pub fn is_file_shaped(path: &str) -> bool {
    !split_extension(path).1.is_empty()
}

/// Check whether a path looks like a directory (has no extension)
pub fn is_directory_shaped(path: &str) -> bool {
    !is_file_shaped(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_backend() {
        assert_eq!(resolve_backend("s3://bucket/key"), BackendTag::ObjectStore);
        assert_eq!(resolve_backend("s3://"), BackendTag::ObjectStore);
        assert_eq!(resolve_backend("/local/path"), BackendTag::Local);
        assert_eq!(resolve_backend("s3data/file.txt"), BackendTag::Local);
        assert_eq!(resolve_backend("local:/x/report.csv"), BackendTag::Local);
        assert_eq!(resolve_backend(""), BackendTag::Local);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("/x/report.csv"), ("/x/report", ".csv"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("/x/dir"), ("/x/dir", ""));
        assert_eq!(split_extension("/x.d/dir"), ("/x.d/dir", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("/home/..hidden"), ("/home/..hidden", ""));
        assert_eq!(split_extension("name."), ("name", "."));
        assert_eq!(split_extension("s3://bucket/pfx/"), ("s3://bucket/pfx/", ""));
    }

    #[test]
    fn test_file_shape() {
        assert!(is_file_shaped("s3://bucket/pfx/a.txt"));
        assert!(is_directory_shaped("s3://bucket/pfx"));
        assert!(is_directory_shaped("s3://bucket/pfx/"));
        assert!(is_directory_shaped("s3://bucket"));
    }

    #[test]
    fn test_dotted_directory_is_misclassified() {
        // documented limitation of the heuristic
        assert!(is_file_shaped("s3://bucket/releases/v1.2"));
        assert!(is_directory_shaped("s3://bucket/releases/v1.2/"));
    }

    proptest! {
        #[test]
        fn prop_scheme_prefix_is_object_store(rest in "[a-zA-Z0-9./_-]{0,40}") {
            let path = format!("{}{}", OBJECT_STORE_SCHEME, rest);
            prop_assert_eq!(resolve_backend(&path), BackendTag::ObjectStore);
        }

        #[test]
        fn prop_other_paths_are_local(path in "[a-zA-Z0-9./_-]{0,40}") {
            prop_assume!(!path.starts_with(OBJECT_STORE_SCHEME));
            prop_assert_eq!(resolve_backend(&path), BackendTag::Local);
        }

        #[test]
        fn prop_extension_is_suffix_of_last_segment(
            dir in "[a-z.]{0,10}",
            stem in "[a-z]{1,8}",
            ext in "[a-z]{1,4}",
        ) {
            let path = format!("{}/{}.{}", dir, stem, ext);
            let expected = format!(".{}", ext);
            prop_assert!(is_file_shaped(&path));
            prop_assert_eq!(split_extension(&path).1, expected.as_str());
        }

        #[test]
        fn prop_no_dot_in_last_segment_is_directory(dir in "[a-z.]{0,10}", name in "[a-z_-]{0,10}") {
            let path = format!("{}/{}", dir, name);
            prop_assert!(is_directory_shaped(&path));
        }
    }
}
