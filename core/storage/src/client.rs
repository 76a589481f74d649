//! Object-client boundary: the opaque vendor-specific storage client.

use async_trait::async_trait;

use iconstash_common::Result;

use crate::provider::{ByteStream, FileEntry};

/// Low-level object-storage operations, implemented per backend.
///
/// This is the seam between the provider adapter and the vendor SDK.
/// Implementations own authentication, wire protocol, and any transport
/// retries; the adapter never inspects or rewraps their errors. Every
/// method settles exactly once.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// List every object in `container`, in the backend's order.
    ///
    /// No filtering or pagination is assumed available here; callers get
    /// the full listing.
    async fn get_files(&self, container: &str) -> Result<Vec<FileEntry>>;

    /// Stream `body` into `container` under `remote`.
    ///
    /// Resolves with the stored object's descriptor once the backend
    /// acknowledges the write, or with the first error it reports.
    async fn put_object(
        &self,
        container: &str,
        remote: &str,
        body: ByteStream,
    ) -> Result<FileEntry>;

    /// Fetch the named object as a byte stream.
    async fn get_object(&self, container: &str, remote: &str) -> Result<ByteStream>;

    /// Delete the named object, returning the backend's success flag.
    async fn remove_object(&self, container: &str, remote: &str) -> Result<bool>;
}
