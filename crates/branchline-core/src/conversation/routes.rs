//! URL shapes of the remote conversation service.
//!
//! The same table is used to build outbound URLs and to recognize them again
//! inside the interception chain, so both sides always agree on what a
//! "conversation read" or a "completion write" looks like.

use once_cell::sync::Lazy;
use regex::Regex;

static ROUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^/api/organizations/(?P<org>[^/]+)/(?P<rest>chat_conversations(?:/[^/]+(?:/[^/]+)?)?|upload|sync/sources)/?$",
    )
    .expect("route pattern is a valid regex")
});

/// A recognized endpoint of the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/chat_conversations`
    Conversations { organization_id: String },
    /// `/chat_conversations/{id}`: message list read, delete
    Conversation {
        organization_id: String,
        conversation_id: String,
    },
    /// `/chat_conversations/{id}/completion` and `/retry_completion`
    Completion {
        organization_id: String,
        conversation_id: String,
        retry: bool,
    },
    /// `/chat_conversations/{id}/completion_status`
    CompletionStatus {
        organization_id: String,
        conversation_id: String,
    },
    /// `/chat_conversations/{id}/current_leaf_message_uuid`
    CurrentLeaf {
        organization_id: String,
        conversation_id: String,
    },
    /// `/upload`
    Upload { organization_id: String },
    /// `/sync/sources`
    SyncSources { organization_id: String },
}

impl Route {
    /// Recognizes a full URL or a bare path. Query strings are ignored.
    pub fn parse(url: &str) -> Option<Self> {
        let path = match reqwest::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.split('?').next().unwrap_or_default().to_string(),
        };

        let caps = ROUTE_PATTERN.captures(&path)?;
        let organization_id = caps.name("org")?.as_str().to_string();
        let rest = caps.name("rest")?.as_str();

        if rest == "upload" {
            return Some(Self::Upload { organization_id });
        }
        if rest == "sync/sources" {
            return Some(Self::SyncSources { organization_id });
        }

        let mut segments = rest.split('/').skip(1);
        let Some(conversation_id) = segments.next().map(str::to_string) else {
            return Some(Self::Conversations { organization_id });
        };

        match segments.next() {
            None => Some(Self::Conversation {
                organization_id,
                conversation_id,
            }),
            Some("completion") => Some(Self::Completion {
                organization_id,
                conversation_id,
                retry: false,
            }),
            Some("retry_completion") => Some(Self::Completion {
                organization_id,
                conversation_id,
                retry: true,
            }),
            Some("completion_status") => Some(Self::CompletionStatus {
                organization_id,
                conversation_id,
            }),
            Some("current_leaf_message_uuid") => Some(Self::CurrentLeaf {
                organization_id,
                conversation_id,
            }),
            Some(_) => None,
        }
    }

    /// Path of this route relative to the service base URL.
    pub fn path(&self) -> String {
        match self {
            Self::Conversations { organization_id } => {
                format!("/api/organizations/{organization_id}/chat_conversations")
            }
            Self::Conversation {
                organization_id,
                conversation_id,
            } => format!("/api/organizations/{organization_id}/chat_conversations/{conversation_id}"),
            Self::Completion {
                organization_id,
                conversation_id,
                retry,
            } => {
                let action = if *retry { "retry_completion" } else { "completion" };
                format!(
                    "/api/organizations/{organization_id}/chat_conversations/{conversation_id}/{action}"
                )
            }
            Self::CompletionStatus {
                organization_id,
                conversation_id,
            } => format!(
                "/api/organizations/{organization_id}/chat_conversations/{conversation_id}/completion_status"
            ),
            Self::CurrentLeaf {
                organization_id,
                conversation_id,
            } => format!(
                "/api/organizations/{organization_id}/chat_conversations/{conversation_id}/current_leaf_message_uuid"
            ),
            Self::Upload { organization_id } => format!("/api/organizations/{organization_id}/upload"),
            Self::SyncSources { organization_id } => {
                format!("/api/organizations/{organization_id}/sync/sources")
            }
        }
    }

    /// Conversation the route addresses, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Self::Conversation {
                conversation_id, ..
            }
            | Self::Completion {
                conversation_id, ..
            }
            | Self::CompletionStatus {
                conversation_id, ..
            }
            | Self::CurrentLeaf {
                conversation_id, ..
            } => Some(conversation_id),
            _ => None,
        }
    }
}
