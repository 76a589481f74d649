//! Common utilities and types shared across iconstash modules.

pub mod error;

pub use error::{Error, Result};
