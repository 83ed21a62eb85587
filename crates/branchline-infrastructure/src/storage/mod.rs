//! Storage layer: atomic file access and the key-value store the
//! repositories are built on.

mod atomic_json;
mod key_value;
mod secret_storage;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};
pub use key_value::{JsonFileStore, KeyValueStore, MemoryStore};
pub use secret_storage::{SecretStorage, SecretStorageError};
