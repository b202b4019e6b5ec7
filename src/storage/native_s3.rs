//! Native AWS S3 SDK adapter
//!
//! Implements [`ObjectStore`] on top of `aws-sdk-s3`. One client is built
//! from an [`ObjectStoreConfig`] and shared by every operation; retries and
//! timeouts are handled by the SDK and configured here, never by the copy
//! engine. Supports S3-compatible endpoints (MinIO, Wasabi, etc.), multipart
//! uploads of large files and streamed downloads.

use crate::config::ObjectStoreConfig;
use crate::copy::listing_prefix;
use crate::error::{IoResultExt, PathmanError, Result};
use crate::path::SEPARATOR;
use crate::storage::{ListPage, ObjectStore, PutOptions};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, StorageClass};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Files above this size are uploaded in parts: 100 MB.
const MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Minimum part size for multipart upload: 8 MB.
const MULTIPART_PART_SIZE: u64 = 8 * 1024 * 1024;

/// S3 accepts at most this many parts per upload.
const MAX_PARTS: u64 = 10_000;

/// Object store backed by the AWS SDK
#[derive(Clone)]
pub struct NativeS3Store {
    client: aws_sdk_s3::Client,
}

impl NativeS3Store {
    /// Build a client from configuration
    pub async fn new(config: &ObjectStoreConfig) -> Result<Self> {
        config.validate()?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .retry_config(aws_config::retry::RetryConfig::standard().with_max_attempts(config.max_attempts));

        // Set custom endpoint for S3-compatible services
        if let Some(ref endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let Some(timeout) = config.operation_timeout() {
            loader = loader.timeout_config(
                aws_config::timeout::TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            let creds = aws_credential_types::Credentials::new(
                key_id,
                secret,
                None, // session token
                None, // expiry
                "pathman-static",
            );
            loader = loader.credentials_provider(creds);
        }

        let sdk_config = loader.load().await;
        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if config.force_path_style {
            s3_config = s3_config.force_path_style(true);
        }

        tracing::debug!("S3 client ready (region {})", config.region);
        Ok(Self::from_client(aws_sdk_s3::Client::from_conf(s3_config.build())))
    }

    /// Wrap an existing SDK client
    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => Ok(false),
            Err(e) => Err(sdk_err("head_object", e)),
        }
    }

    async fn prefix_has_objects(&self, bucket: &str, prefix: &str) -> Result<bool> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| sdk_err("list_objects_v2", e))?;

        Ok(!resp.contents().is_empty())
    }

    async fn put_from_path(&self, path: &Path, bucket: &str, key: &str, options: &PutOptions) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| sdk_err("read upload body", e))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .set_storage_class(options.storage_class.as_deref().map(StorageClass::from))
            .set_content_type(options.content_type.clone())
            .send()
            .await
            .map_err(|e| sdk_err("put_object", e))?;
        Ok(())
    }

    async fn multipart_upload(
        &self,
        path: &Path,
        bucket: &str,
        key: &str,
        file_size: u64,
        options: &PutOptions,
    ) -> Result<()> {
        let create = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_storage_class(options.storage_class.as_deref().map(StorageClass::from))
            .set_content_type(options.content_type.clone())
            .send()
            .await
            .map_err(|e| sdk_err("create_multipart_upload", e))?;

        let upload_id = create
            .upload_id()
            .ok_or_else(|| PathmanError::backend("create_multipart_upload", "missing upload id"))?
            .to_string();

        match self.upload_parts(path, bucket, key, &upload_id, file_size).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
                    .send()
                    .await
                    .map_err(|e| sdk_err("complete_multipart_upload", e))?;
                Ok(())
            }
            Err(e) => {
                let abort = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await;
                if let Err(abort_err) = abort {
                    tracing::warn!(
                        "Failed to abort multipart upload of s3://{}/{}: {}",
                        bucket,
                        key,
                        DisplayErrorContext(abort_err)
                    );
                }
                Err(e)
            }
        }
    }

    /// Upload the file one part at a time; only one part is held in memory
    async fn upload_parts(
        &self,
        path: &Path,
        bucket: &str,
        key: &str,
        upload_id: &str,
        file_size: u64,
    ) -> Result<Vec<CompletedPart>> {
        let mut file = tokio::fs::File::open(path).await.with_path(path)?;
        let mut parts = Vec::new();

        for (part_number, len) in part_layout(file_size) {
            let mut chunk = vec![0u8; len as usize];
            file.read_exact(&mut chunk).await.with_path(path)?;

            let uploaded = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(|e| sdk_err("upload_part", e))?;

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(uploaded.e_tag().map(str::to_string))
                    .build(),
            );
            tracing::debug!("Uploaded part {} of s3://{}/{} ({} bytes)", part_number, bucket, key, len);
        }

        Ok(parts)
    }
}

fn sdk_err<E>(operation: &str, err: E) -> PathmanError
where
    E: std::error::Error,
{
    PathmanError::backend(operation, DisplayErrorContext(err).to_string())
}

/// Key to check as an exact object and prefix to check as a directory.
///
/// The prefix always ends with a separator, so a sibling such as
/// `pfxother/x` never counts as `pfx`.
fn existence_checks(key: &str) -> (Option<&str>, String) {
    let exact = (!key.is_empty() && !key.ends_with(SEPARATOR)).then_some(key);
    (exact, listing_prefix(key))
}

/// `CopySource` value: bucket and key, percent-encoded per segment
fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split(SEPARATOR)
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", urlencoding::encode(bucket), encoded.join("/"))
}

/// Part size for a multipart upload, growing past the minimum when the
/// file would need more than [`MAX_PARTS`] parts
fn part_size(file_size: u64) -> u64 {
    MULTIPART_PART_SIZE.max(file_size.div_ceil(MAX_PARTS))
}

/// (part number, length) of every part of a multipart upload
fn part_layout(file_size: u64) -> Vec<(i32, u64)> {
    let size = part_size(file_size);
    let mut parts = Vec::new();
    let mut offset = 0;
    let mut part_number = 1;
    while offset < file_size {
        let len = size.min(file_size - offset);
        parts.push((part_number, len));
        offset += len;
        part_number += 1;
    }
    parts
}

#[async_trait]
impl ObjectStore for NativeS3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| sdk_err("list_objects_v2", e))?;

        let keys = resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        Ok(ListPage {
            keys,
            next_token: resp.next_continuation_token().map(str::to_string),
        })
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let (exact, prefix) = existence_checks(key);
        if let Some(exact) = exact {
            if self.object_exists(bucket, exact).await? {
                return Ok(true);
            }
        }
        self.prefix_has_objects(bucket, &prefix).await
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    PathmanError::NotFound(format!("s3://{}/{}", bucket, key))
                } else {
                    sdk_err("get_object", e)
                }
            })?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| sdk_err("get_object body", e))?;

        Ok(body.into_bytes().to_vec())
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>, options: &PutOptions) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .set_storage_class(options.storage_class.as_deref().map(StorageClass::from))
            .set_content_type(options.content_type.clone())
            .send()
            .await
            .map_err(|e| sdk_err("put_object", e))?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_err("delete_object", e))?;
        Ok(())
    }

    async fn server_side_copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        self.client
            .copy_object()
            .copy_source(copy_source(src_bucket, src_key))
            .bucket(dst_bucket)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| sdk_err("copy_object", e))?;
        Ok(())
    }

    async fn upload_file(&self, local_path: &Path, bucket: &str, key: &str, options: &PutOptions) -> Result<u64> {
        let file_size = tokio::fs::metadata(local_path).await.with_path(local_path)?.len();

        if file_size > MULTIPART_THRESHOLD {
            self.multipart_upload(local_path, bucket, key, file_size, options).await?;
        } else {
            self.put_from_path(local_path, bucket, key, options).await?;
        }
        Ok(file_size)
    }

    async fn download_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    PathmanError::NotFound(format!("s3://{}/{}", bucket, key))
                } else {
                    sdk_err("get_object", e)
                }
            })?;

        let mut body = resp.body;
        let mut file = tokio::fs::File::create(local_path).await.with_path(local_path)?;
        let mut written = 0u64;
        while let Some(chunk) = body.try_next().await.map_err(|e| sdk_err("get_object body", e))? {
            file.write_all(&chunk).await.with_path(local_path)?;
            written += chunk.len() as u64;
        }
        file.flush().await.with_path(local_path)?;
        Ok(written)
    }
}
