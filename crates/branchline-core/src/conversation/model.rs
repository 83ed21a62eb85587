//! Conversation-level request and response shapes.

use super::message::{Attachment, Message, ROOT_MESSAGE_ID};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A conversation as returned by the conversation-by-id endpoint with tree
/// rendering enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTree {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default = "root_leaf")]
    pub current_leaf_message_uuid: String,
    #[serde(default)]
    pub chat_messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ConversationSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn root_leaf() -> String {
    ROOT_MESSAGE_ID.to_string()
}

impl ConversationTree {
    /// Looks up a message by id.
    pub fn message(&self, id: &str) -> Option<&Message> {
        self.chat_messages.iter().find(|m| m.uuid == id)
    }
}

/// Per-conversation settings carried over into forks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationSettings {
    /// Style configuration applied to completions of this conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalized_styles: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of the create-conversation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    /// Client-generated conversation id
    pub uuid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
}

/// Body of a completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub parent_message_uuid: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Uploaded file ids
    #[serde(default)]
    pub files: Vec<String>,
    /// Registered sync source ids
    #[serde(default)]
    pub sync_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalized_styles: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CompletionRequest {
    /// A text-only completion continuing from `parent_message_uuid`.
    pub fn new(prompt: impl Into<String>, parent_message_uuid: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            parent_message_uuid: parent_message_uuid.into(),
            attachments: Vec::new(),
            files: Vec::new(),
            sync_sources: Vec::new(),
            personalized_styles: None,
            model: None,
        }
    }
}

/// Result of polling the completion-status endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompletionStatus {
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// A file uploaded to the destination account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_uuid: String,
    #[serde(default)]
    pub file_name: String,
}

/// A sync source registered with the destination account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredSyncSource {
    pub uuid: String,
}
