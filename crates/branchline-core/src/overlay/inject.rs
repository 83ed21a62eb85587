//! Phantom injection into a remote conversation tree.

use super::marker::{is_phantom_text, mark};
use super::model::{PhantomMessage, PhantomSequence};
use crate::conversation::{ContentBlock, Message, ROOT_MESSAGE_ID};
use crate::error::{BranchlineError, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

/// Fills in every field the remote message shape requires.
///
/// Defaults are only applied where the caller left a field out. A bare
/// `text` field is accepted as shorthand for a single text block. Every text
/// block ends up carrying the phantom marker exactly once; a phantom without
/// any text block gets one holding only the marker.
///
/// # Errors
///
/// Returns `Parse` if the merged object still does not form a valid message.
pub fn normalize_phantom(
    phantom: &PhantomMessage,
    index: usize,
    now: DateTime<Utc>,
) -> Result<Message> {
    let mut fields = default_fields(index, now);
    for (key, value) in phantom.fields() {
        fields.insert(key.clone(), value.clone());
    }

    if !phantom.fields().contains_key("content")
        && let Some(Value::String(text)) = fields.remove("text")
    {
        fields.insert("content".to_string(), json!([{ "type": "text", "text": text }]));
    }

    let mut message: Message = serde_json::from_value(Value::Object(fields))
        .map_err(|e| BranchlineError::parse(format!("phantom message #{index}: {e}")))?;

    let mut has_text = false;
    for block in message.content.iter_mut().filter(|b| b.is_text()) {
        let text = block.text.take().unwrap_or_default();
        block.text = Some(mark(&text));
        has_text = true;
    }
    if !has_text {
        message.content.push(ContentBlock::text(mark("")));
    }

    Ok(message)
}

fn default_fields(index: usize, now: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("uuid".to_string(), json!(uuid::Uuid::new_v4().to_string()));
    fields.insert("parent_message_uuid".to_string(), json!(ROOT_MESSAGE_ID));
    fields.insert("sender".to_string(), json!("human"));
    fields.insert("content".to_string(), json!([]));
    fields.insert("created_at".to_string(), json!(now));
    fields.insert("updated_at".to_string(), json!(now));
    fields.insert("index".to_string(), json!(index));
    fields.insert("truncated".to_string(), json!(false));
    fields.insert("attachments".to_string(), json!([]));
    fields.insert("files".to_string(), json!([]));
    fields.insert("files_v2".to_string(), json!([]));
    fields.insert("sync_sources".to_string(), json!([]));
    fields
}

/// Splices `phantoms` in front of the remote messages of a conversation body.
///
/// Works on the raw JSON so every field of the remote body survives the
/// rewrite as delivered, explicit `null`s included. Every remote root message
/// is re-parented onto the last phantom, so the phantom chain becomes the
/// root-ward end of the tree. When the remote tree has no messages, or its
/// current leaf is still the root sentinel, the current leaf is moved to the
/// last phantom so the chain is visible.
///
/// An empty sequence leaves `body` untouched.
///
/// # Errors
///
/// Returns `Parse` if `body` is not a conversation object or a phantom does
/// not form a valid message.
pub fn inject_phantom_messages(body: &mut Value, phantoms: &PhantomSequence) -> Result<()> {
    let Some(last_id) = phantoms.last_id().map(str::to_string) else {
        return Ok(());
    };

    let Value::Object(conversation) = body else {
        return Err(BranchlineError::parse("conversation body is not a JSON object"));
    };

    let now = Utc::now();
    let mut view = Vec::with_capacity(phantoms.len());
    for (index, phantom) in phantoms.messages().iter().enumerate() {
        let message = normalize_phantom(phantom, index, now)?;
        view.push(serde_json::to_value(message)?);
    }

    let remote = match conversation.remove("chat_messages") {
        Some(Value::Array(messages)) => messages,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            return Err(BranchlineError::parse("chat_messages is not a JSON array"));
        }
    };

    let mut reparented = 0usize;
    for mut message in remote {
        let Value::Object(fields) = &mut message else {
            return Err(BranchlineError::parse("chat message is not a JSON object"));
        };
        if is_root_parent(fields.get("parent_message_uuid")) {
            fields.insert("parent_message_uuid".to_string(), json!(last_id));
            reparented += 1;
        }
        view.push(message);
    }

    let leaf_is_root = is_root_parent(conversation.get("current_leaf_message_uuid"));
    if reparented == 0 || leaf_is_root {
        conversation.insert("current_leaf_message_uuid".to_string(), json!(last_id));
    }

    tracing::debug!(
        conversation_id = conversation.get("uuid").and_then(serde_json::Value::as_str).unwrap_or_default(),
        phantoms = phantoms.len(),
        reparented,
        "Injected phantom messages"
    );

    conversation.insert("chat_messages".to_string(), Value::Array(view));
    Ok(())
}

/// A missing or null id counts as the root sentinel, as in [`Message`].
fn is_root_parent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(id)) => id == ROOT_MESSAGE_ID,
        Some(_) => false,
    }
}

/// True if the message was produced by phantom injection.
pub fn is_phantom(message: &Message) -> bool {
    message
        .content
        .iter()
        .any(|block| block.text.as_deref().is_some_and(is_phantom_text))
}
