//! Remote conversation service interface.

use super::model::{
    CompletionRequest, CompletionStatus, ConversationTree, CreateConversationRequest,
    RegisteredSyncSource, UploadedFile,
};
use crate::error::Result;
use async_trait::async_trait;

/// Typed access to the remote conversation service.
///
/// Implementations route every call through a single
/// [`Transport`](crate::transport::Transport), so reads observe the phantom
/// overlay and writes are corrected before they leave the process.
///
/// Every method maps a transport failure or a non-success status to
/// [`BranchlineError::Network`](crate::BranchlineError::Network) and an
/// unexpected body to [`BranchlineError::Parse`](crate::BranchlineError::Parse).
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Fetches a conversation with its full message tree.
    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationTree>;

    /// Creates an empty conversation with a client-generated id.
    async fn create_conversation(&self, request: &CreateConversationRequest) -> Result<()>;

    /// Starts a completion turn. Returns once the service accepted the turn;
    /// use [`completion_status`](Self::completion_status) to wait for it.
    async fn send_completion(
        &self,
        conversation_id: &str,
        request: &CompletionRequest,
    ) -> Result<()>;

    /// Polls the state of the latest completion turn.
    async fn completion_status(&self, conversation_id: &str) -> Result<CompletionStatus>;

    /// Moves the conversation's current-leaf pointer.
    async fn set_current_leaf(&self, conversation_id: &str, leaf_id: &str) -> Result<()>;

    /// Downloads a file by URL (absolute, or relative to the service base URL).
    async fn download_file(&self, url: &str) -> Result<Vec<u8>>;

    /// Uploads a file to the account and returns its new id.
    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadedFile>;

    /// Registers an external data-sync link and returns its new id.
    async fn register_sync_source(
        &self,
        uri: &str,
        source_type: &str,
    ) -> Result<RegisteredSyncSource>;

    /// Deletes a conversation.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;
}
