//! Durable local key-value storage.
//!
//! The store holds one serialized text value per key. [`LocalCache`] layers
//! the typed keys used by the client on top of it.

mod cache;
mod file;

pub use cache::LocalCache;
pub use file::FileStore;

use crate::error::StorageError;

/// A synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
