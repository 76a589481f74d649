//! Named-connection registry for backend credentials.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use iconstash_common::{Error, Result};

/// Resolved connection settings for one storage backend.
///
/// Immutable once resolved; a provider holds onto the container name and
/// hands the rest to its client at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Authentication endpoint.
    pub auth_url: String,
    /// Account/user name.
    pub username: String,
    /// Account key or password.
    pub password: String,
    /// Backend region.
    #[serde(default)]
    pub region: String,
    /// Target container name.
    pub container: String,
}

/// Registry of named connections.
///
/// Connection resolution is an injected dependency: callers load this
/// from their configuration source and pass it to provider construction
/// explicitly, rather than the provider reaching into process-wide
/// state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, ConnectionDescriptor>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON map of name to descriptor.
    ///
    /// # Errors
    /// - Returns error if the value is not a valid connection map
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let connections: HashMap<String, ConnectionDescriptor> = serde_json::from_value(value)
            .map_err(|e| Error::Serialization(format!("Invalid connections config: {}", e)))?;
        Ok(Self { connections })
    }

    /// Register a connection under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, descriptor: ConnectionDescriptor) {
        self.connections.insert(name.into(), descriptor);
    }

    /// Resolve a connection by name.
    ///
    /// # Errors
    /// - `Error::NotFound` if no connection is registered under `name`
    pub fn get(&self, name: &str) -> Result<&ConnectionDescriptor> {
        self.connections
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Connection '{}' is not configured", name)))
    }

    /// Check if a connection is registered.
    pub fn has(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    /// Get the registered connection names.
    pub fn names(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }
}
