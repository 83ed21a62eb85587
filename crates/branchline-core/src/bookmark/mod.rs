//! Named leaf bookmarks.
//!
//! A bookmark maps a user-chosen name to a message id within one
//! conversation. Bookmarks are purely local; resolving one always re-runs the
//! deepest-leaf search from the bookmarked message, since that message may
//! have gained children since it was saved.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Bookmarks of one conversation, ordered by name.
pub type BookmarkMap = BTreeMap<String, String>;

/// Persistent storage for per-conversation bookmarks.
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// All bookmarks of a conversation (empty if none were saved).
    async fn list(&self, conversation_id: &str) -> Result<BookmarkMap>;

    /// Message id stored under `name`, if any.
    async fn find(&self, conversation_id: &str, name: &str) -> Result<Option<String>> {
        Ok(self.list(conversation_id).await?.remove(name))
    }

    /// Saves or overwrites a bookmark.
    async fn save(&self, conversation_id: &str, name: &str, message_id: &str) -> Result<()>;

    /// Removes a bookmark.
    ///
    /// # Returns
    ///
    /// `true` if a bookmark with that name existed.
    async fn remove(&self, conversation_id: &str, name: &str) -> Result<bool>;
}
