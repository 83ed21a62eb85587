//! Infrastructure layer for Branchline.
//!
//! Local persistence of the phantom overlay and bookmarks, path resolution,
//! and configuration loading.

pub mod bookmark_repository;
pub mod config_service;
pub mod overlay_repository;
pub mod paths;
pub mod storage;

pub use bookmark_repository::KvBookmarkRepository;
pub use config_service::{ConfigService, ResolvedConfig};
pub use overlay_repository::KvOverlayRepository;
pub use paths::{BranchlinePaths, PathError};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, SecretStorage};
