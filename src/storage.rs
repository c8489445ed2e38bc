//! Storage boundary for persisted cell values
//!
//! The store is an injected dependency rather than a process global, so the
//! same cell logic runs against an embedded sled database in production and a
//! plain in-memory map in tests.

mod memory;
mod sled;

pub use self::memory::MemoryStorage;
pub use self::sled::SledStorage;

use thiserror::Error;

/// Failures raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),

    /// A stored value could not be decoded as UTF-8 text
    #[error("stored value is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),
}

/// Key-value store with text values
///
/// Keys are caller-supplied and globally unique within the store's namespace.
/// Both operations are synchronous; callers that cannot tolerate blocking
/// wrap them in `spawn_blocking`.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
