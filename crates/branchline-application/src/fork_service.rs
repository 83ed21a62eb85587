//! Fork synthesis.
//!
//! A fork runs through fixed states: extract, rehost, create, seed, settle.
//! Asset failures during rehost drop the asset and continue; a failure at
//! create or seed fails the fork, and a conversation created before a failed
//! seed is deleted again.

use branchline_core::config::ForkConfig;
use branchline_core::conversation::{
    CompletionRequest, ConversationApi, CreateConversationRequest, ROOT_MESSAGE_ID,
};
use branchline_core::fork::{FileDescriptor, ForkContext, SEED_PROMPT, SyncSourceDescriptor};
use branchline_core::overlay::OverlayRepository;
use branchline_core::{BranchlineError, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Ids of the assets that made it into the destination account.
#[derive(Debug, Default)]
struct RehostedAssets {
    file_ids: Vec<String>,
    sync_source_ids: Vec<String>,
}

pub struct ForkService {
    api: Arc<dyn ConversationApi>,
    overlay: Arc<dyn OverlayRepository>,
    config: ForkConfig,
    default_model: Option<String>,
}

impl ForkService {
    pub fn new(
        api: Arc<dyn ConversationApi>,
        overlay: Arc<dyn OverlayRepository>,
        config: ForkConfig,
        default_model: Option<String>,
    ) -> Self {
        Self {
            api,
            overlay,
            config,
            default_model,
        }
    }

    /// Forks the history from the root down to `target_message_id` into a new
    /// conversation and returns its id.
    pub async fn fork_from(
        &self,
        conversation_id: &str,
        target_message_id: &str,
        model: Option<&str>,
    ) -> Result<String> {
        self.fork_from_with_cancel(
            conversation_id,
            target_message_id,
            model,
            &CancellationToken::new(),
        )
        .await
    }

    /// Like [`fork_from`](Self::fork_from), abortable until the new
    /// conversation has been created. Cancelling later has no effect.
    pub async fn fork_from_with_cancel(
        &self,
        conversation_id: &str,
        target_message_id: &str,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let span = tracing::info_span!(
            "fork",
            conversation_id = %conversation_id,
            cut_point = %target_message_id,
            state = tracing::field::Empty,
        );

        self.run(conversation_id, target_message_id, model, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        conversation_id: &str,
        target_message_id: &str,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        enter_state("extract");
        let context = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled("extract")),
            context = self.extract(conversation_id, target_message_id) => context?,
        };

        enter_state("rehost");
        let assets = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled("rehost")),
            assets = self.rehost(&context) => assets,
        };
        if cancel.is_cancelled() {
            return Err(cancelled("rehost"));
        }

        let mut attachments = context.attachments.clone();
        attachments.push(context.transcript_attachment());

        enter_state("create");
        let new_id = uuid::Uuid::new_v4().to_string();
        let create = CreateConversationRequest {
            uuid: new_id.clone(),
            name: context.fork_name(),
            model: model.map(str::to_string).or_else(|| self.default_model.clone()),
            project_uuid: context.project_uuid.clone(),
        };
        self.api.create_conversation(&create).await?;
        tracing::info!(new_conversation_id = %new_id, name = %create.name, "Created fork conversation");

        enter_state("seed");
        let seed = CompletionRequest {
            prompt: SEED_PROMPT.to_string(),
            parent_message_uuid: ROOT_MESSAGE_ID.to_string(),
            attachments,
            files: assets.file_ids,
            sync_sources: assets.sync_source_ids,
            personalized_styles: context.personalized_styles.clone(),
            model: create.model.clone(),
        };
        if let Err(e) = self.seed(&new_id, &seed).await {
            tracing::warn!(new_conversation_id = %new_id, error = %e, "Seeding failed, deleting fork");
            if let Err(delete_err) = self.api.delete_conversation(&new_id).await {
                tracing::warn!(
                    new_conversation_id = %new_id,
                    error = %delete_err,
                    "Failed to delete fork conversation"
                );
            }
            return Err(e);
        }

        enter_state("settle");
        tokio::time::sleep(self.config.settle_grace()).await;

        if self.config.seed_phantom_history && !context.messages.is_empty() {
            let phantoms = context.to_phantom_sequence();
            if let Err(e) = self.overlay.save(&new_id, &phantoms).await {
                tracing::warn!(
                    new_conversation_id = %new_id,
                    error = %e,
                    "Failed to store forked history as phantoms"
                );
            }
        }

        enter_state("success");
        Ok(new_id)
    }

    async fn extract(&self, conversation_id: &str, target_message_id: &str) -> Result<ForkContext> {
        let tree = self.api.get_conversation(conversation_id).await?;
        let context = ForkContext::extract(&tree, target_message_id)?;
        tracing::debug!(
            messages = context.messages.len(),
            files = context.files.len(),
            sync_sources = context.sync_sources.len(),
            "Extracted fork context"
        );
        Ok(context)
    }

    /// Re-uploads files and re-registers sync sources, both fan-outs running
    /// at the same time. Assets that fail are logged and left out.
    async fn rehost(&self, context: &ForkContext) -> RehostedAssets {
        let files = join_all(context.files.iter().map(|file| self.rehost_file(file)));
        let sources = join_all(
            context
                .sync_sources
                .iter()
                .map(|source| self.rehost_sync_source(source)),
        );
        let (file_ids, sync_source_ids) = tokio::join!(files, sources);

        RehostedAssets {
            file_ids: file_ids.into_iter().flatten().collect(),
            sync_source_ids: sync_source_ids.into_iter().flatten().collect(),
        }
    }

    async fn rehost_file(&self, file: &FileDescriptor) -> Option<String> {
        match self.copy_file(file).await {
            Ok(file_uuid) => Some(file_uuid),
            Err(e) => {
                tracing::warn!(file_name = %file.file_name, error = %e, "Dropping file from fork");
                None
            }
        }
    }

    async fn copy_file(&self, file: &FileDescriptor) -> Result<String> {
        let bytes = self.api.download_file(&file.url).await?;
        let uploaded = self.api.upload_file(&file.file_name, bytes).await?;
        Ok(uploaded.file_uuid)
    }

    async fn rehost_sync_source(&self, source: &SyncSourceDescriptor) -> Option<String> {
        match self
            .api
            .register_sync_source(&source.uri, &source.source_type)
            .await
        {
            Ok(registered) => Some(registered.uuid),
            Err(e) => {
                tracing::warn!(uri = %source.uri, error = %e, "Dropping sync source from fork");
                None
            }
        }
    }

    async fn seed(&self, conversation_id: &str, request: &CompletionRequest) -> Result<()> {
        self.api.send_completion(conversation_id, request).await?;
        self.wait_for_completion(conversation_id).await
    }

    /// Polls until the latest turn is no longer pending.
    async fn wait_for_completion(&self, conversation_id: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.poll_timeout();
        loop {
            let status = self.api.completion_status(conversation_id).await?;
            if status.is_error {
                return Err(BranchlineError::network(
                    None,
                    format!(
                        "Seeding turn failed: {}",
                        status.error_detail.as_deref().unwrap_or("unknown error")
                    ),
                ));
            }
            if !status.is_pending {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BranchlineError::network(
                    None,
                    format!(
                        "Seeding turn still pending after {}ms",
                        self.config.poll_timeout_ms
                    ),
                ));
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }
}

fn enter_state(state: &'static str) {
    tracing::Span::current().record("state", state);
    tracing::debug!(state, "Fork state");
}

fn cancelled(state: &str) -> BranchlineError {
    BranchlineError::Cancelled(format!("fork cancelled during {state}"))
}
