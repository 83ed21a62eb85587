//! Current-leaf navigation and named bookmarks.

use branchline_core::bookmark::{BookmarkMap, BookmarkRepository};
use branchline_core::conversation::{ConversationApi, ROOT_MESSAGE_ID};
use branchline_core::overlay::is_phantom;
use branchline_core::tree::{self, DeepestLeaf};
use branchline_core::{BranchlineError, Result};
use std::sync::Arc;

pub struct NavigationService {
    api: Arc<dyn ConversationApi>,
    bookmarks: Arc<dyn BookmarkRepository>,
}

impl NavigationService {
    pub fn new(api: Arc<dyn ConversationApi>, bookmarks: Arc<dyn BookmarkRepository>) -> Self {
        Self { api, bookmarks }
    }

    /// Moves the remote current-leaf pointer.
    ///
    /// A rejected update surfaces as `NavigationFailed` and is not retried.
    pub async fn set_current_leaf(&self, conversation_id: &str, leaf_id: &str) -> Result<()> {
        match self.api.set_current_leaf(conversation_id, leaf_id).await {
            Err(BranchlineError::Network {
                status: Some(status),
                message,
            }) => Err(BranchlineError::navigation_failed(
                conversation_id,
                format!("leaf '{leaf_id}' rejected with status {status}: {message}"),
            )),
            other => other,
        }
    }

    /// Deepest leaf below `message_id` in the overlay view, without moving
    /// the pointer. The root sentinel searches the whole tree.
    ///
    /// The result may be a phantom, or the root sentinel itself for a
    /// conversation without messages.
    pub async fn find_deepest_leaf_from(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<DeepestLeaf> {
        let view = self.api.get_conversation(conversation_id).await?;
        tree::find_deepest_leaf(&view.chat_messages, message_id)
    }

    /// Selects the deepest leaf below `message_id`.
    ///
    /// Fails with `NavigationFailed` when that leaf is a phantom or the
    /// conversation has no messages, since the service only knows its own ids.
    pub async fn go_to_leaf(&self, conversation_id: &str, message_id: &str) -> Result<DeepestLeaf> {
        let view = self.api.get_conversation(conversation_id).await?;
        let deepest = tree::find_deepest_leaf(&view.chat_messages, message_id)?;

        if deepest.leaf_id == ROOT_MESSAGE_ID {
            return Err(BranchlineError::navigation_failed(
                conversation_id,
                "conversation has no messages",
            ));
        }
        if let Some(leaf) = view.message(&deepest.leaf_id)
            && is_phantom(leaf)
        {
            return Err(BranchlineError::navigation_failed(
                conversation_id,
                format!("deepest leaf '{}' is a phantom message", deepest.leaf_id),
            ));
        }

        self.set_current_leaf(conversation_id, &deepest.leaf_id).await?;

        tracing::info!(
            conversation_id = %conversation_id,
            from = %message_id,
            leaf = %deepest.leaf_id,
            depth = deepest.depth,
            "Moved current leaf"
        );
        Ok(deepest)
    }

    /// Selects the deepest leaf of the whole conversation.
    pub async fn go_to_deepest(&self, conversation_id: &str) -> Result<DeepestLeaf> {
        self.go_to_leaf(conversation_id, ROOT_MESSAGE_ID).await
    }

    /// Bookmarks a message of the conversation under `name`.
    pub async fn add_bookmark(&self, conversation_id: &str, name: &str, message_id: &str) -> Result<()> {
        let view = self.api.get_conversation(conversation_id).await?;
        if view.message(message_id).is_none() {
            return Err(BranchlineError::not_found("message", message_id));
        }
        self.bookmarks.save(conversation_id, name, message_id).await
    }

    pub async fn remove_bookmark(&self, conversation_id: &str, name: &str) -> Result<bool> {
        self.bookmarks.remove(conversation_id, name).await
    }

    pub async fn list_bookmarks(&self, conversation_id: &str) -> Result<BookmarkMap> {
        self.bookmarks.list(conversation_id).await
    }

    /// Selects the deepest leaf below a bookmarked message. The bookmarked
    /// message may have gained children since it was saved.
    pub async fn go_to_bookmark(&self, conversation_id: &str, name: &str) -> Result<DeepestLeaf> {
        let message_id = self
            .bookmarks
            .find(conversation_id, name)
            .await?
            .ok_or_else(|| BranchlineError::not_found("bookmark", name))?;
        self.go_to_leaf(conversation_id, &message_id).await
    }
}
