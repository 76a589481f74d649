//! In-memory object client for testing and development.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use iconstash_common::{Error, Result};

use crate::client::ObjectClient;
use crate::provider::{ByteStream, FileEntry};

/// One stored object.
#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    entry: FileEntry,
}

/// In-memory object client.
///
/// Useful for testing and development. All data is stored in memory and
/// lost on drop. Listings come back in name order, which doubles as the
/// stable "backend order" the provider must preserve.
#[derive(Clone, Default)]
pub struct MemoryClient {
    containers: Arc<RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MemoryClient {
    /// Create a new empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the streaming path.
    pub fn insert_object(&self, container: &str, name: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let entry = FileEntry {
            name: name.to_string(),
            size: data.len() as u64,
            last_modified: Some(Utc::now()),
            etag: None,
            content_type: None,
            extra: None,
        };
        self.containers
            .write()
            .unwrap()
            .entry(container.to_string())
            .or_default()
            .insert(name.to_string(), StoredObject { data, entry });
    }

    /// Make every subsequent operation fail with a backend error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().unwrap() = Some(message.into());
    }

    /// Clear an injected failure.
    pub fn clear_failure(&self) {
        *self.failure.write().unwrap() = None;
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.read().unwrap().as_ref() {
            Some(message) => Err(Error::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectClient for MemoryClient {
    async fn get_files(&self, container: &str) -> Result<Vec<FileEntry>> {
        self.check_failure()?;
        let containers = self.containers.read().unwrap();
        Ok(containers
            .get(container)
            .map(|objects| objects.values().map(|o| o.entry.clone()).collect())
            .unwrap_or_default())
    }

    async fn put_object(
        &self,
        container: &str,
        remote: &str,
        mut body: ByteStream,
    ) -> Result<FileEntry> {
        self.check_failure()?;

        let mut data = BytesMut::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }

        let entry = FileEntry {
            name: remote.to_string(),
            size: data.len() as u64,
            last_modified: Some(Utc::now()),
            etag: None,
            content_type: None,
            extra: None,
        };

        self.containers
            .write()
            .unwrap()
            .entry(container.to_string())
            .or_default()
            .insert(
                remote.to_string(),
                StoredObject {
                    data: data.freeze(),
                    entry: entry.clone(),
                },
            );

        Ok(entry)
    }

    async fn get_object(&self, container: &str, remote: &str) -> Result<ByteStream> {
        self.check_failure()?;

        let containers = self.containers.read().unwrap();
        let object = containers
            .get(container)
            .and_then(|objects| objects.get(remote))
            .ok_or_else(|| Error::NotFound(format!("Object not found: {}", remote)))?;

        let data = object.data.clone();
        Ok(Box::pin(stream::once(async move { Ok(data) })))
    }

    async fn remove_object(&self, container: &str, remote: &str) -> Result<bool> {
        self.check_failure()?;

        let mut containers = self.containers.write().unwrap();
        let removed = containers
            .get_mut(container)
            .and_then(|objects| objects.remove(remote));

        match removed {
            Some(_) => Ok(true),
            None => Err(Error::NotFound(format!("Object not found: {}", remote))),
        }
    }
}
