//! Overlay use cases: reading the overlay view and managing phantoms.

use branchline_core::Result;
use branchline_core::conversation::{ConversationApi, ConversationTree};
use branchline_core::overlay::{OverlayRepository, PhantomMessage, PhantomSequence};
use std::sync::Arc;

/// Reads conversations as the UI sees them and edits their phantom sequences.
///
/// `api` must route through the intercepting transport; the view is then
/// produced by the read rule on every call and never stored.
pub struct OverlayService {
    api: Arc<dyn ConversationApi>,
    overlay: Arc<dyn OverlayRepository>,
}

impl OverlayService {
    pub fn new(api: Arc<dyn ConversationApi>, overlay: Arc<dyn OverlayRepository>) -> Self {
        Self { api, overlay }
    }

    /// The remote tree with the conversation's phantoms spliced in.
    pub async fn get_overlay_view(&self, conversation_id: &str) -> Result<ConversationTree> {
        self.api.get_conversation(conversation_id).await
    }

    /// Replaces the phantom sequence of a conversation.
    ///
    /// Returns the sequence as persisted, with ids assigned and parents
    /// chained. An empty list clears the conversation's phantoms.
    pub async fn store_phantoms(
        &self,
        conversation_id: &str,
        messages: Vec<PhantomMessage>,
    ) -> Result<PhantomSequence> {
        let sequence = PhantomSequence::new(messages);
        if sequence.is_empty() {
            self.overlay.delete(conversation_id).await?;
        } else {
            self.overlay.save(conversation_id, &sequence).await?;
        }
        Ok(sequence)
    }

    pub async fn clear_phantoms(&self, conversation_id: &str) -> Result<()> {
        self.overlay.delete(conversation_id).await
    }

    /// Stored phantoms of a conversation; `None` is not an error.
    pub async fn phantoms(&self, conversation_id: &str) -> Result<Option<PhantomSequence>> {
        self.overlay.find(conversation_id).await
    }

    pub async fn migrate_legacy(&self, conversation_id: &str) -> Result<bool> {
        self.overlay.migrate_legacy(conversation_id).await
    }

    pub async fn migrate_all_legacy(&self) -> Result<usize> {
        let migrated = self.overlay.migrate_all_legacy().await?;
        if migrated > 0 {
            tracing::info!(migrated, "Migrated legacy phantom entries");
        }
        Ok(migrated)
    }
}
