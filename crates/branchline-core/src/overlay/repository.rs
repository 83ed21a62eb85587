//! Overlay repository trait.
//!
//! Defines the interface for phantom sequence persistence.

use super::model::PhantomSequence;
use crate::error::Result;
use async_trait::async_trait;

/// Persistent mapping from conversation id to its phantom sequence.
///
/// Entries are conversation-scoped, so operations on different conversations
/// never touch the same storage key.
#[async_trait]
pub trait OverlayRepository: Send + Sync {
    /// Finds the phantom sequence of a conversation.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(sequence))`: Phantoms stored for the conversation
    /// - `Ok(None)`: No phantoms (not an error)
    /// - `Err(_)`: Storage failure
    async fn find(&self, conversation_id: &str) -> Result<Option<PhantomSequence>>;

    /// Replaces the full phantom sequence of a conversation.
    ///
    /// The sequence is re-chained before it is persisted.
    async fn save(&self, conversation_id: &str, sequence: &PhantomSequence) -> Result<()>;

    /// Removes the phantom data of a conversation (no-op if absent).
    async fn delete(&self, conversation_id: &str) -> Result<()>;

    /// Copies data stored under the legacy key scheme to the current scheme
    /// and removes the legacy entry.
    ///
    /// Idempotent: once a current-scheme entry exists the call does nothing.
    ///
    /// # Returns
    ///
    /// `true` if data was migrated by this call.
    async fn migrate_legacy(&self, conversation_id: &str) -> Result<bool>;

    /// Runs [`migrate_legacy`](Self::migrate_legacy) for every legacy entry
    /// in the store and returns how many were migrated.
    async fn migrate_all_legacy(&self) -> Result<usize>;
}
