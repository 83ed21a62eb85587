//! Phantom message model.

use crate::conversation::{ROOT_MESSAGE_ID, Sender};
use crate::error::{BranchlineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A client-only message as supplied by the caller.
///
/// Phantoms are kept as loose JSON objects: callers may set any subset of the
/// remote message fields and the remaining ones are filled in at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhantomMessage(Map<String, Value>);

impl PhantomMessage {
    /// A text phantom from `sender`.
    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("sender".to_string(), json!(sender));
        fields.insert(
            "content".to_string(),
            json!([{ "type": "text", "text": text.into() }]),
        );
        Self(fields)
    }

    /// Wraps a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if `value` is not an object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(BranchlineError::Serialization {
                format: "JSON".to_string(),
                message: format!("phantom message must be an object, got {other}"),
            }),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.0.insert("uuid".to_string(), Value::String(id.into()));
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.0.insert("created_at".to_string(), json!(created_at));
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("uuid").and_then(Value::as_str)
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.0.get("parent_message_uuid").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), Value::String(value));
    }
}

/// An ordered, internally chained list of phantom messages for one
/// conversation.
///
/// Construction assigns an id to every phantom lacking one and re-points each
/// phantom's parent at its predecessor; the first phantom hangs off the root
/// sentinel. Ids are therefore stable once a sequence has been persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhantomSequence {
    messages: Vec<PhantomMessage>,
}

impl PhantomSequence {
    pub fn new(messages: Vec<PhantomMessage>) -> Self {
        let mut messages = messages;
        let mut parent = ROOT_MESSAGE_ID.to_string();

        for message in &mut messages {
            let id = match message.id() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => uuid::Uuid::new_v4().to_string(),
            };
            message.set("uuid", id.clone());
            message.set("parent_message_uuid", parent);
            parent = id;
        }

        Self { messages }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[PhantomMessage] {
        &self.messages
    }

    /// Id of the last phantom, the attachment point for the remote roots.
    pub fn last_id(&self) -> Option<&str> {
        self.messages.last().and_then(PhantomMessage::id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id() == Some(id))
    }

    /// True if every phantom is chained to its predecessor.
    pub fn is_chained(&self) -> bool {
        let mut expected_parent = Some(ROOT_MESSAGE_ID);
        for message in &self.messages {
            if message.id().is_none() || message.parent_id() != expected_parent {
                return false;
            }
            expected_parent = message.id();
        }
        true
    }
}
