//! Overlay rules for the intercepting transport.
//!
//! Both rules look up the phantom sequence of the conversation a call
//! addresses. The store is read fresh on every call; nothing is cached.

use async_trait::async_trait;
use branchline_core::Result;
use branchline_core::conversation::{ROOT_MESSAGE_ID, Route};
use branchline_core::overlay::{OverlayRepository, inject_phantom_messages};
use branchline_core::transport::{HttpRequest, HttpResponse, InterceptRule};
use reqwest::Method;
use reqwest::header::CONTENT_LENGTH;
use serde_json::Value;
use std::sync::Arc;

/// Splices stored phantoms into conversation reads.
pub struct PhantomReadRule {
    overlay: Arc<dyn OverlayRepository>,
}

impl PhantomReadRule {
    pub fn new(overlay: Arc<dyn OverlayRepository>) -> Self {
        Self { overlay }
    }
}

#[async_trait]
impl InterceptRule for PhantomReadRule {
    fn name(&self) -> &'static str {
        "phantom-read"
    }

    fn matches(&self, request: &HttpRequest) -> bool {
        request.method == Method::GET && matches!(request.route(), Some(Route::Conversation { .. }))
    }

    async fn on_response(
        &self,
        request: &HttpRequest,
        mut response: HttpResponse,
    ) -> Result<HttpResponse> {
        let Some(Route::Conversation {
            conversation_id, ..
        }) = request.route()
        else {
            return Ok(response);
        };

        let phantoms = match self.overlay.find(&conversation_id).await? {
            Some(phantoms) if !phantoms.is_empty() => phantoms,
            _ => return Ok(response),
        };

        let mut body: Value = response.json()?;
        inject_phantom_messages(&mut body, &phantoms)?;

        response.body = serde_json::to_vec(&body)?;
        response.headers.remove(CONTENT_LENGTH);
        Ok(response)
    }
}

/// Re-points completions that continue from the last phantom at the root
/// sentinel, since the remote service has never seen phantom ids.
pub struct PhantomWriteRule {
    overlay: Arc<dyn OverlayRepository>,
}

impl PhantomWriteRule {
    pub fn new(overlay: Arc<dyn OverlayRepository>) -> Self {
        Self { overlay }
    }
}

#[async_trait]
impl InterceptRule for PhantomWriteRule {
    fn name(&self) -> &'static str {
        "phantom-write"
    }

    fn matches(&self, request: &HttpRequest) -> bool {
        request.method == Method::POST && matches!(request.route(), Some(Route::Completion { .. }))
    }

    async fn on_request(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        let Some(conversation_id) = request.route().and_then(|r| r.conversation_id().map(str::to_string))
        else {
            return Ok(request);
        };

        let Some(phantoms) = self.overlay.find(&conversation_id).await? else {
            return Ok(request);
        };
        let Some(last_id) = phantoms.last_id() else {
            return Ok(request);
        };

        if let Some(body) = request.json_body_mut()
            && let Some(parent) = body.get_mut("parent_message_uuid")
            && parent.as_str() == Some(last_id)
        {
            *parent = Value::String(ROOT_MESSAGE_ID.to_string());
            tracing::debug!(
                conversation_id = %conversation_id,
                phantom_id = %last_id,
                "Re-pointed completion parent from last phantom to root"
            );
        }

        Ok(request)
    }
}
