//! Domain layer for Branchline.
//!
//! Holds the conversation tree model, the phantom overlay, fork context
//! extraction, and the transport abstraction every remote call goes through.
//! Nothing in this crate performs I/O on its own; storage and network access
//! are reached through the traits defined here.

pub mod bookmark;
pub mod config;
pub mod conversation;
pub mod error;
pub mod fork;
pub mod overlay;
pub mod transport;
pub mod tree;

// Re-export common error type
pub use error::{BranchlineError, Result};
