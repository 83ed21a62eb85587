//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `message`: Message and content types as delivered by the remote service
//! - `model`: Conversation-level request/response shapes
//! - `routes`: URL shapes of the remote endpoints
//! - `api`: Remote service trait

mod api;
mod message;
mod model;
mod routes;

// Re-export public API
pub use api::ConversationApi;
pub use message::{
    Attachment, ContentBlock, DocumentAsset, FileKind, FileRef, Message, ROOT_MESSAGE_ID, Sender,
    SyncConfig, SyncSource,
};
pub use model::{
    CompletionRequest, CompletionStatus, ConversationSettings, ConversationTree,
    CreateConversationRequest, RegisteredSyncSource, UploadedFile,
};
pub use routes::Route;
