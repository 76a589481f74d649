//! Storage provider trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use iconstash_common::Result;

/// Metadata for a stored object, passed through from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// Full logical path within the container, '/'-delimited.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, if the backend reports one.
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    /// ETag or content hash for change detection.
    #[serde(default)]
    pub etag: Option<String>,
    /// MIME type reported by the backend.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Further backend-specific metadata, unmodified.
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

/// Listing query: path filter plus offset/limit slice.
///
/// The backend offers no native filtering or pagination, so both are
/// applied client-side over the full container listing. Acceptable only
/// while listings stay small; a known scaling limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Path filter. Empty selects top-level entries (no '/' in the
    /// name); non-empty selects entries directly under `path + "/"`.
    pub path: String,
    /// Number of matching entries to skip.
    pub skip: usize,
    /// Maximum number of entries to return after skipping.
    pub take: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            path: String::new(),
            skip: 0,
            take: 10,
        }
    }
}

impl ListQuery {
    /// Query for entries directly under `path`, with default paging.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the offset/limit slice.
    pub fn page(mut self, skip: usize, take: usize) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }
}

/// Destination options for an upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Destination logical path within the container.
    #[serde(default)]
    pub name: String,
}

impl UploadOptions {
    pub fn name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of a completed upload.
///
/// Carries both the backend's post-upload descriptor and the full
/// buffered content that was streamed. Both refer to the same upload;
/// the operation resolves only once both are available.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Backend-reported descriptor (at least name and size).
    pub entry: FileEntry,
    /// The complete bytes that were streamed to the backend.
    pub content: Bytes,
}

/// Byte stream type for upload/download operations.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Storage provider contract.
///
/// All operations are async and independent; a provider instance is
/// immutable after construction and safe to share across concurrent
/// calls. No operation is retried and no results are cached.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name (e.g., "swift", "memory").
    fn name(&self) -> &str;

    /// List entries in the container matching `query`.
    ///
    /// Fetches the entire container listing from the backend on every
    /// call, then filters and paginates client-side, preserving the
    /// backend's ordering.
    ///
    /// # Errors
    /// - Backend listing failures, unmodified
    async fn list(&self, query: ListQuery) -> Result<Vec<FileEntry>>;

    /// Upload `source` to the container under `options.name`.
    ///
    /// # Preconditions
    /// - `options.name` must be non-empty; violation fails with
    ///   `Error::InvalidInput` before any I/O begins
    ///
    /// # Postconditions
    /// - Resolves only after both the backend reports success and the
    ///   full source content has been captured in memory
    ///
    /// # Errors
    /// - Backend write failures, unmodified; no partial result
    /// - Source stream read failures
    async fn upload(&self, source: ByteStream, options: UploadOptions) -> Result<UploadOutcome>;

    /// Download the named object as a byte stream.
    ///
    /// # Preconditions
    /// - `filename` must be non-empty; violation fails with
    ///   `Error::InvalidInput` before any I/O begins
    ///
    /// # Errors
    /// - Backend failures, unmodified
    async fn download(&self, filename: &str) -> Result<ByteStream>;

    /// Delete the named object.
    ///
    /// Returns the backend's success indicator unchanged. Validation of
    /// the filename is delegated to the backend.
    ///
    /// # Errors
    /// - Backend failures, unmodified
    async fn remove(&self, filename: &str) -> Result<bool>;
}
