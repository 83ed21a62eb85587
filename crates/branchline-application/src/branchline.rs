//! The façade handed to UI and CLI code.

use crate::fork_service::ForkService;
use crate::interceptors::{PhantomReadRule, PhantomWriteRule};
use crate::navigation_service::NavigationService;
use crate::overlay_service::OverlayService;
use branchline_core::Result;
use branchline_core::bookmark::{BookmarkMap, BookmarkRepository};
use branchline_core::config::BranchlineConfig;
use branchline_core::conversation::{ConversationApi, ConversationTree};
use branchline_core::overlay::{OverlayRepository, PhantomMessage, PhantomSequence};
use branchline_core::transport::{InterceptingTransport, Transport};
use branchline_core::tree::DeepestLeaf;
use branchline_infrastructure::{
    JsonFileStore, KvBookmarkRepository, KvOverlayRepository, ResolvedConfig,
};
use branchline_interaction::{RemoteClient, ReqwestTransport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Overlay, fork, and navigation operations over one remote account.
///
/// Every remote call of every service goes through a single
/// [`InterceptingTransport`] carrying the phantom read and write rules.
pub struct Branchline {
    overlay: OverlayService,
    navigation: NavigationService,
    fork: ForkService,
}

impl Branchline {
    /// Wires the services over `network`, the transport that performs the
    /// actual calls.
    pub fn new(
        network: Arc<dyn Transport>,
        organization_id: &str,
        config: &BranchlineConfig,
        overlay: Arc<dyn OverlayRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
    ) -> Self {
        let transport = InterceptingTransport::new(network)
            .with_rule(Arc::new(PhantomReadRule::new(overlay.clone())))
            .with_rule(Arc::new(PhantomWriteRule::new(overlay.clone())));
        tracing::debug!(rules = ?transport.rule_names(), "Interception chain ready");

        let api: Arc<dyn ConversationApi> = Arc::new(RemoteClient::new(
            config.remote.base_url.clone(),
            organization_id,
            Arc::new(transport),
        ));

        Self::with_api(api, config, overlay, bookmarks)
    }

    /// Wires the services over an already assembled client.
    pub fn with_api(
        api: Arc<dyn ConversationApi>,
        config: &BranchlineConfig,
        overlay: Arc<dyn OverlayRepository>,
        bookmarks: Arc<dyn BookmarkRepository>,
    ) -> Self {
        Self {
            overlay: OverlayService::new(api.clone(), overlay.clone()),
            navigation: NavigationService::new(api.clone(), bookmarks),
            fork: ForkService::new(
                api,
                overlay,
                config.fork.clone(),
                config.remote.default_model.clone(),
            ),
        }
    }

    /// Production wiring: HTTP transport, overlay store file from the config.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let store = JsonFileStore::new(config.overlay_store_file()?);
        tracing::debug!(store = %store.path().display(), "Opened overlay store");

        Ok(Self::new(
            Arc::new(ReqwestTransport::from_config(config)?),
            config.organization_id()?,
            &config.config,
            Arc::new(KvOverlayRepository::new(store.clone())),
            Arc::new(KvBookmarkRepository::new(store)),
        ))
    }

    pub async fn get_overlay_view(&self, conversation_id: &str) -> Result<ConversationTree> {
        self.overlay.get_overlay_view(conversation_id).await
    }

    pub async fn store_phantoms(
        &self,
        conversation_id: &str,
        messages: Vec<PhantomMessage>,
    ) -> Result<PhantomSequence> {
        self.overlay.store_phantoms(conversation_id, messages).await
    }

    pub async fn clear_phantoms(&self, conversation_id: &str) -> Result<()> {
        self.overlay.clear_phantoms(conversation_id).await
    }

    pub async fn phantoms(&self, conversation_id: &str) -> Result<Option<PhantomSequence>> {
        self.overlay.phantoms(conversation_id).await
    }

    pub async fn migrate_legacy(&self, conversation_id: &str) -> Result<bool> {
        self.overlay.migrate_legacy(conversation_id).await
    }

    pub async fn migrate_all_legacy(&self) -> Result<usize> {
        self.overlay.migrate_all_legacy().await
    }

    pub async fn fork_from(
        &self,
        conversation_id: &str,
        target_message_id: &str,
        model: Option<&str>,
    ) -> Result<String> {
        self.fork
            .fork_from(conversation_id, target_message_id, model)
            .await
    }

    pub async fn fork_from_with_cancel(
        &self,
        conversation_id: &str,
        target_message_id: &str,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.fork
            .fork_from_with_cancel(conversation_id, target_message_id, model, cancel)
            .await
    }

    pub async fn set_current_leaf(&self, conversation_id: &str, leaf_id: &str) -> Result<()> {
        self.navigation.set_current_leaf(conversation_id, leaf_id).await
    }

    pub async fn go_to_deepest(&self, conversation_id: &str) -> Result<DeepestLeaf> {
        self.navigation.go_to_deepest(conversation_id).await
    }

    pub async fn go_to_leaf(&self, conversation_id: &str, message_id: &str) -> Result<DeepestLeaf> {
        self.navigation.go_to_leaf(conversation_id, message_id).await
    }

    pub async fn find_deepest_leaf_from(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<DeepestLeaf> {
        self.navigation
            .find_deepest_leaf_from(conversation_id, message_id)
            .await
    }

    pub async fn add_bookmark(&self, conversation_id: &str, name: &str, message_id: &str) -> Result<()> {
        self.navigation
            .add_bookmark(conversation_id, name, message_id)
            .await
    }

    pub async fn remove_bookmark(&self, conversation_id: &str, name: &str) -> Result<bool> {
        self.navigation.remove_bookmark(conversation_id, name).await
    }

    pub async fn list_bookmarks(&self, conversation_id: &str) -> Result<BookmarkMap> {
        self.navigation.list_bookmarks(conversation_id).await
    }

    pub async fn go_to_bookmark(&self, conversation_id: &str, name: &str) -> Result<DeepestLeaf> {
        self.navigation.go_to_bookmark(conversation_id, name).await
    }
}
