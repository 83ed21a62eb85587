//! In-memory stand-in for the remote conversation service.
#![allow(dead_code)]

use async_trait::async_trait;
use branchline_application::{Branchline, PhantomReadRule, PhantomWriteRule};
use branchline_core::Result;
use branchline_core::config::{BranchlineConfig, ForkConfig, RemoteConfig};
use branchline_core::conversation::{
    CompletionRequest, CompletionStatus, ConversationTree, CreateConversationRequest, FileKind,
    FileRef, Message, ROOT_MESSAGE_ID, Route, Sender, SyncConfig, SyncSource,
};
use branchline_core::transport::{
    HttpRequest, HttpResponse, InterceptingTransport, RequestBody, Transport,
};
use branchline_infrastructure::{KvBookmarkRepository, KvOverlayRepository, MemoryStore};
use branchline_interaction::RemoteClient;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://chat.example";
pub const ORG: &str = "org-1";

#[derive(Default)]
pub struct RemoteState {
    pub conversations: BTreeMap<String, ConversationTree>,
    /// Downloadable files by URL path
    pub files: HashMap<String, Vec<u8>>,
    pub uploads: Vec<(String, Vec<u8>)>,
    pub sync_registrations: Vec<Value>,
    pub created: Vec<CreateConversationRequest>,
    pub completions: Vec<(String, CompletionRequest)>,
    pub deleted: Vec<String>,
    pub leaf_updates: Vec<(String, String)>,
    pub statuses: VecDeque<CompletionStatus>,
    pub status_polls: usize,
    pub fail_create: bool,
    pub fail_sync: bool,
    pub reject_leaf_updates: bool,
    /// Time every file download takes
    pub download_delay: Option<Duration>,
    /// Time every sync-source registration takes
    pub sync_delay: Option<Duration>,
    pub in_flight: usize,
    /// Most delayed calls that were in progress at the same time
    pub max_in_flight: usize,
}

/// Answers requests the way the remote service does, keeping state in memory.
///
/// Completions whose parent is neither the root sentinel nor a stored
/// message are rejected, like the real service rejects phantom ids.
#[derive(Default)]
pub struct FakeRemote {
    pub state: Mutex<RemoteState>,
}

impl FakeRemote {
    pub fn with_conversation(tree: ConversationTree) -> Arc<Self> {
        let remote = Self::default();
        remote
            .state
            .lock()
            .unwrap()
            .conversations
            .insert(tree.uuid.clone(), tree);
        Arc::new(remote)
    }

    pub fn conversation(&self, id: &str) -> Option<ConversationTree> {
        self.state.lock().unwrap().conversations.get(id).cloned()
    }

    pub fn add_file(&self, path: &str, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), bytes.to_vec());
    }

    fn delay_for(&self, request: &HttpRequest) -> Option<Duration> {
        let state = self.state.lock().unwrap();
        match (request.method.as_str(), request.route()) {
            ("GET", None) => state.download_delay,
            ("POST", Some(Route::SyncSources { .. })) => state.sync_delay,
            _ => None,
        }
    }

    async fn slow_call(&self, delay: Duration) {
        {
            let mut state = self.state.lock().unwrap();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }
        tokio::time::sleep(delay).await;
        self.state.lock().unwrap().in_flight -= 1;
    }

    fn handle(&self, request: HttpRequest) -> HttpResponse {
        let mut state = self.state.lock().unwrap();

        let method = request.method.clone();
        match (method.as_str(), request.route()) {
            ("GET", Some(Route::Conversation { conversation_id, .. })) => {
                match state.conversations.get(&conversation_id) {
                    Some(tree) => ok(tree),
                    None => error(StatusCode::NOT_FOUND, "conversation not found"),
                }
            }
            ("POST", Some(Route::Conversations { .. })) => {
                if state.fail_create {
                    return error(StatusCode::INTERNAL_SERVER_ERROR, "create failed");
                }
                let create: CreateConversationRequest = body(&request);
                state.conversations.insert(
                    create.uuid.clone(),
                    ConversationTree {
                        uuid: create.uuid.clone(),
                        name: create.name.clone(),
                        updated_at: None,
                        current_leaf_message_uuid: ROOT_MESSAGE_ID.to_string(),
                        chat_messages: Vec::new(),
                        project_uuid: create.project_uuid.clone(),
                        settings: None,
                        extra: Map::new(),
                    },
                );
                let created = json!({ "uuid": create.uuid });
                state.created.push(create);
                ok(&created)
            }
            ("POST", Some(Route::Completion { conversation_id, .. })) => {
                let completion: CompletionRequest = body(&request);
                let Some(tree) = state.conversations.get_mut(&conversation_id) else {
                    return error(StatusCode::NOT_FOUND, "conversation not found");
                };
                let parent = completion.parent_message_uuid.clone();
                if parent != ROOT_MESSAGE_ID && tree.message(&parent).is_none() {
                    return error(StatusCode::BAD_REQUEST, "unknown parent message");
                }

                let n = tree.chat_messages.len();
                let human_id = format!("{conversation_id}-h{n}");
                let reply_id = format!("{conversation_id}-a{n}");
                let mut human = Message::text(&human_id, &parent, Sender::Human, &completion.prompt, at(30));
                human.attachments = completion.attachments.clone();
                tree.chat_messages.push(human);
                tree.chat_messages
                    .push(Message::text(&reply_id, &human_id, Sender::Assistant, "ack", at(31)));
                tree.current_leaf_message_uuid = reply_id;

                state.completions.push((conversation_id, completion));
                HttpResponse::new(StatusCode::OK, "data: {}\n\n")
            }
            ("GET", Some(Route::CompletionStatus { .. })) => {
                state.status_polls += 1;
                let status = state.statuses.pop_front().unwrap_or_default();
                ok(&status)
            }
            ("PUT", Some(Route::CurrentLeaf { conversation_id, .. })) => {
                if state.reject_leaf_updates {
                    return error(StatusCode::CONFLICT, "leaf update rejected");
                }
                let leaf: String = request.json_body().unwrap()["current_leaf_message_uuid"]
                    .as_str()
                    .unwrap()
                    .to_string();
                let Some(tree) = state.conversations.get_mut(&conversation_id) else {
                    return error(StatusCode::NOT_FOUND, "conversation not found");
                };
                if tree.message(&leaf).is_none() {
                    return error(StatusCode::NOT_FOUND, "unknown leaf");
                }
                tree.current_leaf_message_uuid = leaf.clone();
                state.leaf_updates.push((conversation_id, leaf));
                HttpResponse::new(StatusCode::OK, "")
            }
            ("DELETE", Some(Route::Conversation { conversation_id, .. })) => {
                state.conversations.remove(&conversation_id);
                state.deleted.push(conversation_id);
                HttpResponse::new(StatusCode::NO_CONTENT, "")
            }
            ("POST", Some(Route::Upload { .. })) => {
                let RequestBody::Multipart {
                    file_name, bytes, ..
                } = request.body
                else {
                    return error(StatusCode::BAD_REQUEST, "expected multipart");
                };
                let file_uuid = format!("up-{}", state.uploads.len() + 1);
                state.uploads.push((file_name.clone(), bytes));
                ok(&json!({ "file_uuid": file_uuid, "file_name": file_name }))
            }
            ("POST", Some(Route::SyncSources { .. })) => {
                if state.fail_sync {
                    return error(StatusCode::INTERNAL_SERVER_ERROR, "sync unavailable");
                }
                let uuid = format!("sync-{}", state.sync_registrations.len() + 1);
                state
                    .sync_registrations
                    .push(request.json_body().cloned().unwrap_or_default());
                ok(&json!({ "uuid": uuid }))
            }
            ("GET", None) => {
                let path = request.url.trim_start_matches(BASE_URL);
                match state.files.get(path) {
                    Some(bytes) => HttpResponse::new(StatusCode::OK, bytes.clone()),
                    None => error(StatusCode::NOT_FOUND, "file not found"),
                }
            }
            _ => error(StatusCode::METHOD_NOT_ALLOWED, "unsupported"),
        }
    }
}

#[async_trait]
impl Transport for FakeRemote {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        if let Some(delay) = self.delay_for(&request) {
            self.slow_call(delay).await;
        }
        Ok(self.handle(request))
    }
}

fn ok<T: serde::Serialize>(body: &T) -> HttpResponse {
    HttpResponse::json_value(StatusCode::OK, body).unwrap()
}

fn error(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::json_value(status, &json!({ "error": { "message": message } })).unwrap()
}

fn body<T: serde::de::DeserializeOwned>(request: &HttpRequest) -> T {
    serde_json::from_value(request.json_body().cloned().unwrap()).unwrap()
}

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
}

pub fn image(uuid: &str) -> FileRef {
    FileRef {
        file_uuid: uuid.to_string(),
        file_name: format!("{uuid}.png"),
        file_kind: FileKind::Image,
        preview_url: Some(format!("/api/files/{uuid}/preview")),
        thumbnail_url: None,
        document_asset: None,
        extra: Map::new(),
    }
}

pub fn sync_source(uri: &str) -> SyncSource {
    SyncSource {
        uuid: format!("old-{uri}"),
        source_type: "gdrive".to_string(),
        config: SyncConfig {
            uri: uri.to_string(),
            extra: Map::new(),
        },
        extra: Map::new(),
    }
}

/// Conversation "Foo": A (root) -> B -> C, current leaf C.
pub fn abc_conversation() -> ConversationTree {
    ConversationTree {
        uuid: "conv".to_string(),
        name: "Foo".to_string(),
        updated_at: None,
        current_leaf_message_uuid: "C".to_string(),
        chat_messages: vec![
            Message::text("A", ROOT_MESSAGE_ID, Sender::Human, "textA", at(0)),
            Message::text("B", "A", Sender::Assistant, "textB", at(1)),
            Message::text("C", "B", Sender::Human, "textC", at(2)),
        ],
        project_uuid: None,
        settings: None,
        extra: Map::new(),
    }
}

pub fn empty_conversation(id: &str) -> ConversationTree {
    ConversationTree {
        uuid: id.to_string(),
        name: "Empty".to_string(),
        updated_at: None,
        current_leaf_message_uuid: ROOT_MESSAGE_ID.to_string(),
        chat_messages: Vec::new(),
        project_uuid: None,
        settings: None,
        extra: Map::new(),
    }
}

pub fn test_config() -> BranchlineConfig {
    BranchlineConfig {
        remote: RemoteConfig {
            base_url: BASE_URL.to_string(),
            organization_id: Some(ORG.to_string()),
            default_model: Some("default-model".to_string()),
            ..RemoteConfig::default()
        },
        fork: ForkConfig {
            settle_grace_ms: 0,
            poll_interval_ms: 0,
            poll_timeout_ms: 1_000,
            seed_phantom_history: true,
        },
        ..BranchlineConfig::default()
    }
}

/// The façade over `remote`, with a fresh in-memory store.
pub fn branchline(remote: Arc<FakeRemote>, config: &BranchlineConfig) -> (Branchline, MemoryStore) {
    let store = MemoryStore::new();
    let app = Branchline::new(
        remote,
        ORG,
        config,
        Arc::new(KvOverlayRepository::new(store.clone())),
        Arc::new(KvBookmarkRepository::new(store.clone())),
    );
    (app, store)
}

/// A separately built client over the same overlay store, the way a UI
/// issues its own calls through the interception chain.
pub fn intercepted_client(remote: Arc<FakeRemote>, store: &MemoryStore) -> RemoteClient {
    let overlay = Arc::new(KvOverlayRepository::new(store.clone()));
    let transport = InterceptingTransport::new(remote)
        .with_rule(Arc::new(PhantomReadRule::new(overlay.clone())))
        .with_rule(Arc::new(PhantomWriteRule::new(overlay)));
    RemoteClient::new(BASE_URL, ORG, Arc::new(transport))
}
