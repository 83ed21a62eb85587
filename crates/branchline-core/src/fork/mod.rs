//! Fork context extraction and transcript materialization.
//!
//! A fork replays a slice of an existing conversation into a brand-new remote
//! conversation. This module covers the pure half of that work: choosing the
//! slice, collecting what must be carried over, and rendering the transcript
//! that seeds the new conversation.

use crate::conversation::{Attachment, ConversationTree, FileKind, Sender};
use crate::error::Result;
use crate::overlay::{PhantomMessage, PhantomSequence, strip_marker};
use crate::tree;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Prefix of every fork's conversation name.
pub const FORK_NAME_PREFIX: &str = "Fork of ";

/// File name of the synthetic transcript attachment.
pub const TRANSCRIPT_FILE_NAME: &str = "chatlog.txt";

/// Prompt of the seeding turn.
pub const SEED_PROMPT: &str = "This conversation is forked from the attached chatlog.txt. \
Simply acknowledge that you have received the chatlog and wait for my next message.";

/// Name given to a fork of a conversation called `original_name`.
pub fn fork_name(original_name: &str) -> String {
    format!("{FORK_NAME_PREFIX}{original_name}")
}

/// A file referenced by the forked history, still hosted by the source account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub file_uuid: String,
    pub file_name: String,
    pub kind: FileKind,
    /// Download URL, absolute or relative to the service base URL
    pub url: String,
}

/// An external data-sync link referenced by the forked history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSourceDescriptor {
    pub uri: String,
    pub source_type: String,
}

/// Everything a fork operation carries from the source conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForkContext {
    /// Message texts in history order, phantom markers removed
    pub messages: Vec<String>,
    pub files: Vec<FileDescriptor>,
    pub sync_sources: Vec<SyncSourceDescriptor>,
    pub attachments: Vec<Attachment>,
    pub conversation_name: String,
    pub project_uuid: Option<String>,
    pub personalized_styles: Option<Value>,
}

impl ForkContext {
    /// Collects the history from the root down to `cut_point_id`.
    ///
    /// Files without a download URL cannot be re-hosted and are skipped.
    /// Files and sync sources referenced more than once are carried once.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown cut point, `MalformedTree` for a broken
    /// parent chain.
    pub fn extract(tree: &ConversationTree, cut_point_id: &str) -> Result<Self> {
        let history = tree::history_through(&tree.chat_messages, cut_point_id)?;

        let mut context = Self {
            conversation_name: tree.name.clone(),
            project_uuid: tree.project_uuid.clone(),
            personalized_styles: tree
                .settings
                .as_ref()
                .and_then(|s| s.personalized_styles.clone()),
            ..Self::default()
        };

        let mut seen_files = HashSet::new();
        let mut seen_sources = HashSet::new();

        for message in history {
            context.messages.push(strip_marker(&message.text_content()));
            context.attachments.extend(message.attachments.iter().cloned());

            for file in &message.files {
                if !seen_files.insert(file.file_uuid.clone()) {
                    continue;
                }
                match file.download_url() {
                    Some(url) => context.files.push(FileDescriptor {
                        file_uuid: file.file_uuid.clone(),
                        file_name: file.file_name.clone(),
                        kind: file.file_kind,
                        url: url.to_string(),
                    }),
                    None => tracing::debug!(
                        file_name = %file.file_name,
                        "File has no download URL, leaving it out of the fork"
                    ),
                }
            }

            for source in &message.sync_sources {
                if seen_sources.insert(source.config.uri.clone()) {
                    context.sync_sources.push(SyncSourceDescriptor {
                        uri: source.config.uri.clone(),
                        source_type: source.source_type.clone(),
                    });
                }
            }
        }

        Ok(context)
    }

    /// Name of the conversation this context forks into.
    pub fn fork_name(&self) -> String {
        fork_name(&self.conversation_name)
    }

    /// One entry per message, alternating human and assistant turns by
    /// position: even index is the user, odd index the assistant.
    pub fn transcript_entries(&self) -> Vec<String> {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let role = if i % 2 == 0 { "User" } else { "Assistant" };
                format!("{role}\n{text}")
            })
            .collect()
    }

    /// The full newline-delimited transcript.
    pub fn transcript(&self) -> String {
        self.transcript_entries().join("\n\n")
    }

    /// The transcript packaged as a plain-text attachment.
    pub fn transcript_attachment(&self) -> Attachment {
        Attachment::plain_text(TRANSCRIPT_FILE_NAME, self.transcript())
    }

    /// The history as a phantom sequence, turns alternating like the transcript.
    pub fn to_phantom_sequence(&self) -> PhantomSequence {
        let phantoms = self
            .messages
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let sender = if i % 2 == 0 {
                    Sender::Human
                } else {
                    Sender::Assistant
                };
                PhantomMessage::text(sender, text.clone())
            })
            .collect();
        PhantomSequence::new(phantoms)
    }
}
