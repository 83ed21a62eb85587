//! Key-value backed implementation of the OverlayRepository trait.

use crate::storage::KeyValueStore;
use async_trait::async_trait;
use branchline_core::overlay::{OverlayRepository, PhantomSequence};
use branchline_core::{BranchlineError, Result};
use serde_json::Value;

/// Key prefix of the current storage scheme.
pub const OVERLAY_KEY_PREFIX: &str = "overlay:";

/// Key prefix of the legacy storage scheme.
pub const LEGACY_KEY_PREFIX: &str = "phantom_messages_";

pub fn overlay_key(conversation_id: &str) -> String {
    format!("{OVERLAY_KEY_PREFIX}{conversation_id}")
}

pub fn legacy_key(conversation_id: &str) -> String {
    format!("{LEGACY_KEY_PREFIX}{conversation_id}")
}

/// Overlay repository over any [`KeyValueStore`].
///
/// Each conversation's phantoms live under their own key, so reads and
/// writes of different conversations never touch the same entry.
pub struct KvOverlayRepository<S> {
    store: S,
}

impl<S: KeyValueStore> KvOverlayRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn decode(key: &str, value: Value) -> Result<PhantomSequence> {
        let sequence: PhantomSequence = serde_json::from_value(value).map_err(|e| {
            BranchlineError::storage(format!("Invalid phantom data under '{}': {}", key, e))
        })?;
        Ok(PhantomSequence::new(sequence.messages().to_vec()))
    }
}

#[async_trait]
impl<S: KeyValueStore> OverlayRepository for KvOverlayRepository<S> {
    async fn find(&self, conversation_id: &str) -> Result<Option<PhantomSequence>> {
        let key = overlay_key(conversation_id);
        match self.store.get(&key).await? {
            Some(value) => Ok(Some(Self::decode(&key, value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, conversation_id: &str, sequence: &PhantomSequence) -> Result<()> {
        let chained = PhantomSequence::new(sequence.messages().to_vec());
        self.store
            .put(&overlay_key(conversation_id), serde_json::to_value(&chained)?)
            .await?;

        tracing::debug!(
            conversation_id = %conversation_id,
            phantoms = chained.len(),
            "Saved phantom sequence"
        );
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        if self.store.delete(&overlay_key(conversation_id)).await? {
            tracing::debug!(conversation_id = %conversation_id, "Cleared phantom sequence");
        }
        Ok(())
    }

    async fn migrate_legacy(&self, conversation_id: &str) -> Result<bool> {
        let current = overlay_key(conversation_id);
        if self.store.get(&current).await?.is_some() {
            return Ok(false);
        }

        let legacy = legacy_key(conversation_id);
        let Some(value) = self.store.get(&legacy).await? else {
            return Ok(false);
        };

        let sequence = Self::decode(&legacy, value)?;
        self.store.put(&current, serde_json::to_value(&sequence)?).await?;
        self.store.delete(&legacy).await?;

        tracing::info!(
            conversation_id = %conversation_id,
            phantoms = sequence.len(),
            "Migrated legacy phantom data"
        );
        Ok(true)
    }

    async fn migrate_all_legacy(&self) -> Result<usize> {
        let mut migrated = 0;
        for key in self.store.keys_with_prefix(LEGACY_KEY_PREFIX).await? {
            let Some(conversation_id) = key.strip_prefix(LEGACY_KEY_PREFIX) else {
                continue;
            };
            if self.migrate_legacy(conversation_id).await? {
                migrated += 1;
            }
        }
        Ok(migrated)
    }
}
