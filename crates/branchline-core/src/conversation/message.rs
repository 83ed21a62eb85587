//! Conversation message types.
//!
//! These mirror the JSON shapes the remote service delivers. Every struct
//! carries a flattened `extra` map so fields this crate does not model survive
//! a parse → rewrite → serialize round trip untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parent id carried by every root message of a remote conversation tree.
pub const ROOT_MESSAGE_ID: &str = "00000000-0000-4000-8000-000000000000";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Message typed by the user.
    Human,
    /// Message produced by the model.
    Assistant,
}

impl Default for Sender {
    fn default() -> Self {
        Sender::Human
    }
}

/// One block of message content.
///
/// The service uses many block types (`text`, `tool_use`, `tool_result`, ...);
/// only the fields needed to collect text are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Structured tool input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Nested content (tool results)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentBlock>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentBlock {
    /// Creates a plain text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".to_string(),
            text: Some(text.into()),
            input: None,
            content: None,
            extra: Map::new(),
        }
    }

    /// Returns true for blocks of type `text`.
    pub fn is_text(&self) -> bool {
        self.block_type == "text"
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        if self.is_text()
            && let Some(text) = &self.text
        {
            out.push(text.clone());
        }
        if let Some(nested) = &self.content {
            for block in nested {
                block.collect_text(out);
            }
        }
    }
}

/// A pasted or extracted text attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub extracted_content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachment {
    /// Creates a plain-text attachment holding `content`.
    pub fn plain_text(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            file_name: file_name.into(),
            file_type: "text/plain".to_string(),
            file_size: content.len() as u64,
            extracted_content: content,
            extra: Map::new(),
        }
    }
}

/// Kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
    #[serde(other)]
    Other,
}

/// Remote location of a document's rendered asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAsset {
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An uploaded file referenced by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_uuid: String,
    pub file_name: String,
    pub file_kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_asset: Option<DocumentAsset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileRef {
    /// URL the file's bytes can be downloaded from, if the service exposed one.
    pub fn download_url(&self) -> Option<&str> {
        match self.file_kind {
            FileKind::Image => self
                .preview_url
                .as_deref()
                .or(self.thumbnail_url.as_deref()),
            FileKind::Document => self.document_asset.as_ref().map(|a| a.url.as_str()),
            FileKind::Other => None,
        }
    }
}

/// Configuration of an external data-sync link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub uri: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An external data-sync link attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSource {
    pub uuid: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub config: SyncConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single message in a remote conversation tree.
///
/// Messages are immutable once the service has stored them; the only field
/// this crate ever rewrites is `parent_message_uuid`, and only inside a
/// derived overlay view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub uuid: String,
    #[serde(default = "root_message_id")]
    pub parent_message_uuid: String,
    pub sender: Sender,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, rename = "files_v2")]
    pub files: Vec<FileRef>,
    #[serde(default)]
    pub sync_sources: Vec<SyncSource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn root_message_id() -> String {
    ROOT_MESSAGE_ID.to_string()
}

impl Message {
    /// Creates a text-only message.
    pub fn text(
        uuid: impl Into<String>,
        parent_message_uuid: impl Into<String>,
        sender: Sender,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            parent_message_uuid: parent_message_uuid.into(),
            sender,
            content: vec![ContentBlock::text(text)],
            created_at,
            attachments: Vec::new(),
            files: Vec::new(),
            sync_sources: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Returns true when the message hangs directly off the root sentinel.
    pub fn is_root(&self) -> bool {
        self.parent_message_uuid == ROOT_MESSAGE_ID
    }

    /// All text blocks of the message, nested ones included, joined by newlines.
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        for block in &self.content {
            block.collect_text(&mut parts);
        }
        parts.join("\n")
    }
}
