//! Typed client for the remote conversation service.

use async_trait::async_trait;
use branchline_core::conversation::{
    CompletionRequest, CompletionStatus, ConversationApi, ConversationTree,
    CreateConversationRequest, RegisteredSyncSource, Route, UploadedFile,
};
use branchline_core::transport::{HttpRequest, HttpResponse, Transport};
use branchline_core::{BranchlineError, Result};
use branchline_infrastructure::ResolvedConfig;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query of the conversation read: full tree, message rendering.
const CONVERSATION_QUERY: &str = "tree=True&rendering_mode=messages&render_all_tools=true";

#[derive(Serialize)]
struct CurrentLeafBody<'a> {
    current_leaf_message_uuid: &'a str,
}

#[derive(Serialize)]
struct SyncSourceBody<'a> {
    uri: &'a str,
    #[serde(rename = "type")]
    source_type: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// [`ConversationApi`] over a [`Transport`].
///
/// Every call goes through the transport handed in at construction, so
/// wrapping it in an intercepting transport applies the overlay rules to
/// every read and write of this client.
#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    organization_id: String,
    transport: Arc<dyn Transport>,
}

impl RemoteClient {
    pub fn new(
        base_url: impl Into<String>,
        organization_id: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            organization_id: organization_id.into(),
            transport,
        }
    }

    pub fn from_config(config: &ResolvedConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(
            config.config.remote.base_url.clone(),
            config.organization_id()?,
            transport,
        ))
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    fn conversation_route(&self, conversation_id: &str) -> Route {
        Route::Conversation {
            organization_id: self.organization_id.clone(),
            conversation_id: conversation_id.to_string(),
        }
    }

    fn url(&self, route: &Route) -> String {
        format!("{}{}", self.base_url, route.path())
    }

    /// Absolute URLs are used as-is; anything else is relative to the base URL.
    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    async fn call(&self, action: &str, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(action, method = %request.method, url = %request.url, "Remote call");
        let response = self.transport.send(request).await?;
        check_status(action, response)
    }
}

/// Maps a non-success response to `Network`, preferring the service's own
/// error message over the raw body.
fn check_status(action: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let status = response.status.as_u16();
    let message = match serde_json::from_slice::<ErrorBody>(&response.body) {
        Ok(body) => body.error.message,
        Err(_) => match response.error_for_status() {
            Err(BranchlineError::Network { message, .. }) => message,
            _ => String::new(),
        },
    };
    Err(BranchlineError::network(
        Some(status),
        format!("{action} failed: {message}"),
    ))
}

#[async_trait]
impl ConversationApi for RemoteClient {
    async fn get_conversation(&self, conversation_id: &str) -> Result<ConversationTree> {
        let url = format!(
            "{}?{}",
            self.url(&self.conversation_route(conversation_id)),
            CONVERSATION_QUERY
        );
        self.call("get conversation", HttpRequest::get(url))
            .await?
            .json()
    }

    async fn create_conversation(&self, request: &CreateConversationRequest) -> Result<()> {
        let route = Route::Conversations {
            organization_id: self.organization_id.clone(),
        };
        self.call(
            "create conversation",
            HttpRequest::post_json(self.url(&route), request)?,
        )
        .await?;
        Ok(())
    }

    async fn send_completion(
        &self,
        conversation_id: &str,
        request: &CompletionRequest,
    ) -> Result<()> {
        let route = Route::Completion {
            organization_id: self.organization_id.clone(),
            conversation_id: conversation_id.to_string(),
            retry: false,
        };
        self.call("completion", HttpRequest::post_json(self.url(&route), request)?)
            .await?;
        Ok(())
    }

    async fn completion_status(&self, conversation_id: &str) -> Result<CompletionStatus> {
        let route = Route::CompletionStatus {
            organization_id: self.organization_id.clone(),
            conversation_id: conversation_id.to_string(),
        };
        let url = format!("{}?poll=false", self.url(&route));
        self.call("completion status", HttpRequest::get(url))
            .await?
            .json()
    }

    async fn set_current_leaf(&self, conversation_id: &str, leaf_id: &str) -> Result<()> {
        let route = Route::CurrentLeaf {
            organization_id: self.organization_id.clone(),
            conversation_id: conversation_id.to_string(),
        };
        let body = CurrentLeafBody {
            current_leaf_message_uuid: leaf_id,
        };
        self.call("set current leaf", HttpRequest::put_json(self.url(&route), &body)?)
            .await?;
        Ok(())
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .call("download file", HttpRequest::get(self.resolve(url)))
            .await?;
        Ok(response.body)
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadedFile> {
        let route = Route::Upload {
            organization_id: self.organization_id.clone(),
        };
        let content_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string();
        let request = HttpRequest::new(Method::POST, self.url(&route)).with_multipart(
            "file",
            file_name,
            content_type,
            bytes,
        );

        let mut uploaded: UploadedFile = self.call("upload file", request).await?.json()?;
        if uploaded.file_name.is_empty() {
            uploaded.file_name = file_name.to_string();
        }
        Ok(uploaded)
    }

    async fn register_sync_source(
        &self,
        uri: &str,
        source_type: &str,
    ) -> Result<RegisteredSyncSource> {
        let route = Route::SyncSources {
            organization_id: self.organization_id.clone(),
        };
        let body = SyncSourceBody { uri, source_type };
        self.call(
            "register sync source",
            HttpRequest::post_json(self.url(&route), &body)?,
        )
        .await?
        .json()
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let url = self.url(&self.conversation_route(conversation_id));
        self.call("delete conversation", HttpRequest::delete(url))
            .await?;
        Ok(())
    }
}
