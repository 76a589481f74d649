//! Storage provider abstraction for iconstash.
//!
//! This crate exposes a uniform async contract — list, upload, download,
//! remove — over an object-storage backend reached through a
//! vendor-specific client. The provider adapter normalizes the client's
//! native API into `Future`-returning operations, applies client-side
//! path filtering and pagination on listings, and joins the two
//! completion signals of an upload (backend write success and full
//! in-memory capture of the source stream) into a single result.
//!
//! # Design Principles
//! - Client isolation: the vendor client sits behind the [`ObjectClient`]
//!   trait; no protocol logic leaks into the adapter
//! - Async operations: all I/O is async, suspending only at I/O boundaries
//! - Injected configuration: connections are resolved from an explicit
//!   [`ConnectionRegistry`], never from ambient global state

pub mod client;
pub mod connections;
pub mod memory;
pub mod provider;
pub mod rest;
pub mod swift;

pub use client::ObjectClient;
pub use connections::{ConnectionDescriptor, ConnectionRegistry};
pub use memory::MemoryClient;
pub use provider::{ByteStream, FileEntry, ListQuery, StorageProvider, UploadOptions, UploadOutcome};
pub use rest::RestObjectClient;
pub use swift::{ProviderConfig, SwiftProvider};
