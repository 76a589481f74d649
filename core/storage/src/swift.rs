//! OpenStack-Swift-style storage provider adapter.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use iconstash_common::{Error, Result};

use crate::client::ObjectClient;
use crate::connections::{ConnectionDescriptor, ConnectionRegistry};
use crate::provider::{ByteStream, FileEntry, ListQuery, StorageProvider, UploadOptions, UploadOutcome};
use crate::rest::RestObjectClient;

/// Provider configuration: which named connection to use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Logical name of this provider instance.
    #[serde(default)]
    pub name: String,
    /// Name of the connection to resolve from the registry.
    #[serde(default)]
    pub connection: String,
}

/// Resolve the connection a provider config points at.
///
/// # Errors
/// - `Error::InvalidInput` if the config carries no connection name
/// - `Error::NotFound` if the registry has no such connection
pub fn resolve_connection<'r>(
    config: &ProviderConfig,
    registry: &'r ConnectionRegistry,
) -> Result<&'r ConnectionDescriptor> {
    if config.connection.is_empty() {
        return Err(Error::InvalidInput(
            "invalid storage configuration: missing connection name".to_string(),
        ));
    }
    registry.get(&config.connection)
}

/// Storage provider over a Swift-style object backend.
///
/// Generic over the [`ObjectClient`] so tests can inject an in-memory
/// backend. Holds exactly one client handle and the target container
/// name, both fixed at construction; all operations take `&self` and
/// keep their intermediate state local, so concurrent calls against one
/// instance are safe and unordered.
pub struct SwiftProvider<C> {
    client: C,
    container: String,
}

impl SwiftProvider<RestObjectClient> {
    /// Build a provider from configuration.
    ///
    /// Resolves the named connection from `registry` and constructs the
    /// REST client for it. Fails before any client is constructed when
    /// the config names no connection.
    ///
    /// # Errors
    /// - `Error::InvalidInput` on a missing connection name
    /// - `Error::NotFound` on an unknown connection name
    pub fn new(config: &ProviderConfig, registry: &ConnectionRegistry) -> Result<Self> {
        let connection = resolve_connection(config, registry)?;
        let client = RestObjectClient::new(connection)?;
        let provider = Self::with_client(client, connection.container.clone());
        info!(container = %provider.container, "storage provider initialized");
        Ok(provider)
    }
}

impl<C: ObjectClient> SwiftProvider<C> {
    /// Build a provider around an already-constructed client.
    pub fn with_client(client: C, container: impl Into<String>) -> Self {
        Self {
            client,
            container: container.into(),
        }
    }

    /// The container this provider targets.
    pub fn container(&self) -> &str {
        &self.container
    }
}

/// Keep only entries directly under `path`.
///
/// An empty `path` selects top-level entries (no '/' anywhere in the
/// name); otherwise entries whose name starts with `path + "/"`.
/// Backend order is preserved.
fn filter_entries(entries: Vec<FileEntry>, path: &str) -> Vec<FileEntry> {
    if path.is_empty() {
        entries
            .into_iter()
            .filter(|entry| !entry.name.contains('/'))
            .collect()
    } else {
        let prefix = format!("{}/", path);
        entries
            .into_iter()
            .filter(|entry| entry.name.starts_with(&prefix))
            .collect()
    }
}

#[async_trait]
impl<C: ObjectClient> StorageProvider for SwiftProvider<C> {
    fn name(&self) -> &str {
        "swift"
    }

    async fn list(&self, query: ListQuery) -> Result<Vec<FileEntry>> {
        debug!(container = %self.container, path = %query.path, "listing container");

        // The backend has no filter/paginate primitive; fetch everything
        // and slice locally. Fresh query on every call, nothing cached.
        let entries = self.client.get_files(&self.container).await?;

        let matched = filter_entries(entries, &query.path);
        debug!(matched = matched.len(), "path filter applied");

        let page: Vec<FileEntry> = matched
            .into_iter()
            .skip(query.skip)
            .take(query.take)
            .collect();
        debug!(skip = query.skip, take = query.take, returned = page.len(), "pagination applied");

        Ok(page)
    }

    async fn upload(
        &self,
        mut source: ByteStream,
        options: UploadOptions,
    ) -> Result<UploadOutcome> {
        if options.name.is_empty() {
            return Err(Error::InvalidInput(
                "options.name parameter is mandatory".to_string(),
            ));
        }

        debug!(container = %self.container, name = %options.name, "uploading object");

        // Tee the source: every chunk goes both to the backend write
        // channel and into a local buffer. The operation settles only
        // once the backend acknowledges the write AND the full content
        // has been captured; try_join! lets either finish first and
        // short-circuits on a backend error without waiting for the
        // buffering side.
        let (tx, rx) = mpsc::channel::<Result<Bytes>>(16);
        let body: ByteStream = Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }));
        let put = self
            .client
            .put_object(&self.container, &options.name, body);

        let buffer = async move {
            let mut captured = BytesMut::new();
            while let Some(chunk) = source.next().await {
                let chunk = chunk?;
                captured.extend_from_slice(&chunk);
                if tx.send(Ok(chunk)).await.is_err() {
                    // Write side already settled; the put branch of the
                    // join carries the outcome.
                    break;
                }
            }
            Ok::<Bytes, Error>(captured.freeze())
        };

        let (entry, content) = tokio::try_join!(put, buffer)?;

        Ok(UploadOutcome { entry, content })
    }

    async fn download(&self, filename: &str) -> Result<ByteStream> {
        if filename.is_empty() {
            return Err(Error::InvalidInput(
                "parameter filename is mandatory".to_string(),
            ));
        }

        debug!(container = %self.container, name = %filename, "downloading object");
        self.client.get_object(&self.container, filename).await
    }

    async fn remove(&self, filename: &str) -> Result<bool> {
        debug!(container = %self.container, name = %filename, "removing object");
        self.client.remove_object(&self.container, filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryClient;
    use futures::stream;

    fn provider() -> SwiftProvider<MemoryClient> {
        SwiftProvider::with_client(MemoryClient::new(), "icons")
    }

    fn byte_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c))),
        ))
    }

    async fn collect(mut stream: ByteStream) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }

    #[test]
    fn test_resolve_connection_missing_name() {
        let registry = ConnectionRegistry::new();
        let config = ProviderConfig {
            name: "test".to_string(),
            connection: String::new(),
        };

        let result = resolve_connection(&config, &registry);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_resolve_connection_unknown_name() {
        let registry = ConnectionRegistry::new();
        let config = ProviderConfig {
            name: "test".to_string(),
            connection: "missing".to_string(),
        };

        let result = resolve_connection(&config, &registry);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_new_without_connection_fails() {
        // A config deserialized without a connection field must fail
        // before any client exists.
        let config: ProviderConfig = serde_json::from_str(r#"{"name": "test"}"#).unwrap();
        let registry = ConnectionRegistry::new();

        let result = SwiftProvider::new(&config, &registry);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_filter_entries_top_level() {
        let entries = vec![
            entry("a.txt"),
            entry("dir/b.txt"),
            entry("dir/c.txt"),
        ];

        let names: Vec<_> = filter_entries(entries, "")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[test]
    fn test_filter_entries_prefix_is_exact() {
        let entries = vec![
            entry("a.txt"),
            entry("dir/b.txt"),
            entry("dir/c.txt"),
            entry("dirx/d.txt"),
        ];

        let names: Vec<_> = filter_entries(entries, "dir")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["dir/b.txt", "dir/c.txt"]);
    }

    fn entry(name: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            size: 1,
            last_modified: None,
            etag: None,
            content_type: None,
            extra: None,
        }
    }

    #[tokio::test]
    async fn test_list_empty_container() {
        let provider = provider();
        let files = provider.list(ListQuery::default()).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_list_backend_error_propagates() {
        let client = MemoryClient::new();
        client.fail_with("unexpected error");
        let provider = SwiftProvider::with_client(client, "icons");

        let result = provider.list(ListQuery::default()).await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }

    #[tokio::test]
    async fn test_upload_rejects_missing_name() {
        let provider = provider();

        let result = provider
            .upload(byte_stream(vec![b"data"]), UploadOptions::default())
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_upload_resolves_with_descriptor_and_content() {
        let provider = provider();

        let outcome = provider
            .upload(
                byte_stream(vec![b"dummy ", b"content"]),
                UploadOptions::name("dummy.txt"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.entry.name, "dummy.txt");
        assert_eq!(outcome.entry.size, 13);
        assert_eq!(&outcome.content[..], b"dummy content");
    }

    #[tokio::test]
    async fn test_upload_backend_error_rejects() {
        let client = MemoryClient::new();
        client.fail_with("unexpected error");
        let provider = SwiftProvider::with_client(client, "icons");

        let result = provider
            .upload(byte_stream(vec![b"data"]), UploadOptions::name("x"))
            .await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }

    #[tokio::test]
    async fn test_upload_source_error_rejects() {
        let provider = provider();

        let source: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"start")),
            Err(Error::Backend("source failed".to_string())),
        ]));

        let result = provider.upload(source, UploadOptions::name("x")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_download_rejects_empty_filename() {
        let provider = provider();
        let result = provider.download("").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_download_roundtrip() {
        let client = MemoryClient::new();
        client.insert_object("icons", "a.svg", &b"<svg/>"[..]);
        let provider = SwiftProvider::with_client(client, "icons");

        let stream = provider.download("a.svg").await.unwrap();
        assert_eq!(collect(stream).await.unwrap(), b"<svg/>");
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let provider = provider();
        let result = provider.download("missing.txt").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_passes_backend_result_through() {
        let client = MemoryClient::new();
        client.insert_object("icons", "ddos-protect.svg", &b"x"[..]);
        let provider = SwiftProvider::with_client(client, "icons");

        assert!(provider.remove("ddos-protect.svg").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_backend_error_propagates() {
        let client = MemoryClient::new();
        client.fail_with("unexpected error");
        let provider = SwiftProvider::with_client(client, "icons");

        let result = provider.remove("ddos-protect.svg").await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }
}
