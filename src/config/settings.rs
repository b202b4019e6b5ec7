//! Configuration settings for Pathman
//!
//! Defines CLI arguments, object-store connection settings and copy
//! options.

use crate::error::{IoResultExt, PathmanError, Result};
use crate::storage::PutOptions;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound of the default worker count
const MAX_DEFAULT_CONCURRENCY: usize = 32;

/// Pathman - one path interface for local files and object storage
#[derive(Parser, Debug, Clone)]
#[command(name = "pathman")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy and inspect local and S3 paths through one interface")]
#[command(long_about = r#"
Pathman treats local paths and s3:// URLs the same way.

Examples:
  pathman cp ./report.csv s3://bucket/out/        # Upload into a prefix
  pathman cp s3://bucket/data ./data -j 16        # Recursive download
  pathman cp s3://bucket/a.txt s3://bucket/b.txt  # Server-side copy
  pathman ls s3://bucket/data
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Object-store settings file (JSON); environment is used otherwise
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Copy a file or prefix between local paths and object storage
    #[command(name = "cp")]
    Copy {
        /// Source path
        source: String,
        /// Destination path
        destination: String,
        /// Maximum concurrent transfers per listing page (default: CPUs + 4, at most 32)
        #[arg(short = 'j', long, value_name = "NUM")]
        parallelism: Option<usize>,
        /// Storage class for uploaded objects
        #[arg(long, value_name = "CLASS")]
        storage_class: Option<String>,
        /// Content type for uploaded objects
        #[arg(long, value_name = "TYPE")]
        content_type: Option<String>,
    },

    /// List the immediate children of a path
    #[command(name = "ls")]
    List {
        /// Path to list
        path: String,
        /// List every file below the path
        #[arg(short, long)]
        recursive: bool,
    },

    /// Exit with status 0 if the path exists, 1 otherwise
    #[command(name = "exists")]
    Exists {
        /// Path to check
        path: String,
    },

    /// Print a file to stdout
    #[command(name = "cat")]
    Cat {
        /// Path to read
        path: String,
    },

    /// Remove a file, or a directory with --recursive
    #[command(name = "rm")]
    Remove {
        /// Path to remove
        path: String,
        /// Remove directories and their contents
        #[arg(short, long)]
        recursive: bool,
    },

    /// Create a directory and its parents
    #[command(name = "mkdir")]
    Mkdir {
        /// Directory to create
        path: String,
    },
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Object-store connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// AWS region
    pub region: String,
    /// Custom endpoint URL (for MinIO, Ceph, etc.)
    pub endpoint: Option<String>,
    /// Access key ID (falls back to the SDK credential chain)
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Use path-style URLs (required for some S3-compatible services)
    pub force_path_style: bool,
    /// Maximum attempts per request, retried inside the adapter
    pub max_attempts: u32,
    /// Per-operation timeout in seconds (0 = none)
    pub operation_timeout_secs: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
            max_attempts: 3,
            operation_timeout_secs: 0,
        }
    }
}

impl ObjectStoreConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            region: lookup("AWS_REGION")
                .or_else(|| lookup("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|| "us-east-1".to_string()),
            endpoint: lookup("AWS_ENDPOINT_URL").or_else(|| lookup("S3_ENDPOINT")),
            access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            force_path_style: lookup("S3_PATH_STYLE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            ..Default::default()
        }
    }

    /// Load config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(PathmanError::config("region must not be empty"));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(PathmanError::config(
                "access_key_id and secret_access_key must be set together",
            ));
        }
        if self.max_attempts == 0 {
            return Err(PathmanError::config("max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Per-operation timeout, if any
    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_secs > 0).then(|| Duration::from_secs(self.operation_timeout_secs))
    }
}

/// Options for a copy operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOptions {
    /// Maximum concurrent transfers per listing page (None = default)
    pub max_concurrency: Option<usize>,
    /// Extra arguments forwarded to uploads
    pub put: PutOptions,
}

impl CopyOptions {
    /// Set the maximum number of concurrent transfers
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    /// Worker count to use for one listing page
    pub fn effective_concurrency(&self) -> usize {
        match self.max_concurrency {
            Some(n) if n > 0 => n,
            _ => default_concurrency(),
        }
    }
}

/// Default worker count: CPUs + 4, capped at 32
pub fn default_concurrency() -> usize {
    (num_cpus::get() + 4).min(MAX_DEFAULT_CONCURRENCY)
}

impl Commands {
    /// Copy options carried by the `cp` subcommand
    pub fn copy_options(&self) -> Option<CopyOptions> {
        match self {
            Commands::Copy {
                parallelism,
                storage_class,
                content_type,
                ..
            } => Some(CopyOptions {
                max_concurrency: *parallelism,
                put: PutOptions {
                    storage_class: storage_class.clone(),
                    content_type: content_type.clone(),
                },
            }),
            _ => None,
        }
    }
}
