//! Swift-style REST object client.
//!
//! Speaks the classic v1 token flow: one GET against the auth endpoint
//! with `X-Auth-User`/`X-Auth-Key` yields `X-Auth-Token` and
//! `X-Storage-Url`, after which objects live under
//! `<storage-url>/<container>/<name>`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use iconstash_common::{Error, Result};

use crate::client::ObjectClient;
use crate::connections::ConnectionDescriptor;
use crate::provider::{ByteStream, FileEntry};

/// Timestamp format the listing API returns (no timezone, UTC implied).
const LISTING_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// One object as reported by the container listing API.
#[derive(Debug, Clone, Deserialize)]
struct ListedObject {
    name: String,
    #[serde(default)]
    bytes: u64,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    last_modified: Option<String>,
}

impl ListedObject {
    fn into_entry(self) -> FileEntry {
        let last_modified = self.last_modified.as_deref().and_then(parse_listing_time);
        FileEntry {
            name: self.name,
            size: self.bytes,
            last_modified,
            etag: self.hash,
            content_type: self.content_type,
            extra: None,
        }
    }
}

fn parse_listing_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, LISTING_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Authenticated session: token plus account storage URL.
#[derive(Debug, Clone)]
struct AuthSession {
    token: String,
    storage_url: String,
}

/// Build the URL for one object.
fn object_url(storage_url: &str, container: &str, remote: &str) -> String {
    format!(
        "{}/{}/{}",
        storage_url.trim_end_matches('/'),
        container,
        remote
    )
}

/// Map a non-success response status to an error.
fn status_error(status: StatusCode, body: String) -> Error {
    if status == StatusCode::NOT_FOUND {
        Error::NotFound("Resource not found".to_string())
    } else if status == StatusCode::UNAUTHORIZED {
        Error::Auth("Invalid or expired token".to_string())
    } else {
        Error::Backend(format!("API error: {} - {}", status, body))
    }
}

/// REST object client for a Swift-style backend.
///
/// Authenticates lazily on first use and caches the session for the
/// client's lifetime. One instance per provider; shared across
/// concurrent calls.
pub struct RestObjectClient {
    http: Client,
    auth_url: Url,
    username: String,
    password: String,
    session: RwLock<Option<AuthSession>>,
}

impl RestObjectClient {
    /// Create a client for the given connection.
    ///
    /// No network I/O happens here; authentication is deferred to the
    /// first operation.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the auth URL does not parse
    pub fn new(connection: &ConnectionDescriptor) -> Result<Self> {
        let auth_url = Url::parse(&connection.auth_url)
            .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?;

        let http = Client::builder()
            .user_agent("iconstash/0.1")
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth_url,
            username: connection.username.clone(),
            password: connection.password.clone(),
            session: RwLock::new(None),
        })
    }

    /// Get the cached session, authenticating if there is none yet.
    async fn session(&self) -> Result<AuthSession> {
        {
            let session = self.session.read().await;
            if let Some(session) = session.as_ref() {
                return Ok(session.clone());
            }
        }

        tracing::info!("Authenticating against storage endpoint");

        let response = self
            .http
            .get(self.auth_url.clone())
            .header("X-Auth-User", &self.username)
            .header("X-Auth-Key", &self.password)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to authenticate: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Authentication failed: {} - {}",
                status, body
            )));
        }

        let header_value = |name: &str| -> Result<String> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
                .ok_or_else(|| Error::Auth(format!("Auth response missing {} header", name)))
        };

        let new_session = AuthSession {
            token: header_value("X-Auth-Token")?,
            storage_url: header_value("X-Storage-Url")?,
        };

        let mut session = self.session.write().await;
        *session = Some(new_session.clone());

        Ok(new_session)
    }

    /// Fetch the stored object's descriptor via a HEAD request.
    async fn head_object(&self, session: &AuthSession, container: &str, remote: &str) -> Result<FileEntry> {
        let url = object_url(&session.storage_url, container, remote);

        let response = self
            .http
            .head(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to stat object: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(status_error(status, String::new()));
        }

        let headers = response.headers();
        let header_str =
            |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        let size = header_str(header::CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let etag = header_str(header::ETAG)
            .map(|v| v.trim_matches('"').to_string());
        let content_type = header_str(header::CONTENT_TYPE).map(String::from);
        let last_modified = header_str(header::LAST_MODIFIED)
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(FileEntry {
            name: remote.to_string(),
            size,
            last_modified,
            etag,
            content_type,
            extra: None,
        })
    }
}

#[async_trait]
impl ObjectClient for RestObjectClient {
    async fn get_files(&self, container: &str) -> Result<Vec<FileEntry>> {
        let session = self.session().await?;
        let url = format!(
            "{}/{}",
            session.storage_url.trim_end_matches('/'),
            container
        );

        let response = self
            .http
            .get(&url)
            .header("X-Auth-Token", &session.token)
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list container: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let objects: Vec<ListedObject> = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("Failed to parse listing: {}", e)))?;

        Ok(objects.into_iter().map(ListedObject::into_entry).collect())
    }

    async fn put_object(
        &self,
        container: &str,
        remote: &str,
        body: ByteStream,
    ) -> Result<FileEntry> {
        let session = self.session().await?;
        let url = object_url(&session.storage_url, container, remote);

        let response = self
            .http
            .put(&url)
            .header("X-Auth-Token", &session.token)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to upload object: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        // The write acknowledgement carries no size, so stat the object
        // to report the backend's view of what was stored.
        self.head_object(&session, container, remote).await
    }

    async fn get_object(&self, container: &str, remote: &str) -> Result<ByteStream> {
        let session = self.session().await?;
        let url = object_url(&session.storage_url, container, remote);

        let response = self
            .http
            .get(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to download object: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(Bytes::from)
                .map_err(|e| Error::Network(format!("Failed to read download stream: {}", e)))
        });

        Ok(Box::pin(stream))
    }

    async fn remove_object(&self, container: &str, remote: &str) -> Result<bool> {
        let session = self.session().await?;
        let url = object_url(&session.storage_url, container, remote);

        let response = self
            .http
            .delete(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to delete object: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            Ok(true)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(status_error(status, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> ConnectionDescriptor {
        ConnectionDescriptor {
            auth_url: "https://auth.example.net/v1.0".to_string(),
            username: "tenant:user".to_string(),
            password: "secret".to_string(),
            region: "GRA".to_string(),
            container: "icons".to_string(),
        }
    }

    #[test]
    fn test_new_rejects_bad_auth_url() {
        let mut conn = connection();
        conn.auth_url = "not a url".to_string();
        let result = RestObjectClient::new(&conn);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_new_valid() {
        assert!(RestObjectClient::new(&connection()).is_ok());
    }

    #[test]
    fn test_object_url() {
        assert_eq!(
            object_url("https://storage.example.net/v1/acct/", "icons", "dir/a.svg"),
            "https://storage.example.net/v1/acct/icons/dir/a.svg"
        );
    }

    #[test]
    fn test_listed_object_into_entry() {
        let object = ListedObject {
            name: "dir/a.svg".to_string(),
            bytes: 512,
            hash: Some("d41d8cd98f00b204e9800998ecf8427e".to_string()),
            content_type: Some("image/svg+xml".to_string()),
            last_modified: Some("2017-01-15T16:41:49.390270".to_string()),
        };

        let entry = object.into_entry();
        assert_eq!(entry.name, "dir/a.svg");
        assert_eq!(entry.size, 512);
        assert!(entry.last_modified.is_some());
        assert_eq!(entry.content_type.as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn test_parse_listing_time_invalid() {
        assert!(parse_listing_time("yesterday").is_none());
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, String::new()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            Error::Auth(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
            Error::Backend(_)
        ));
    }
}
