//! Overlay and bookmark persistence against a real store file.

use branchline_core::bookmark::BookmarkRepository;
use branchline_core::conversation::Sender;
use branchline_core::overlay::{OverlayRepository, PhantomMessage, PhantomSequence};
use branchline_infrastructure::overlay_repository::legacy_key;
use branchline_infrastructure::{JsonFileStore, KeyValueStore, KvBookmarkRepository, KvOverlayRepository};
use tempfile::TempDir;

#[tokio::test]
async fn test_state_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("overlay.json");
    let phantoms = PhantomSequence::new(vec![
        PhantomMessage::text(Sender::Human, "background").with_id("P1"),
    ]);

    {
        let store = JsonFileStore::new(path.clone());
        KvOverlayRepository::new(store.clone())
            .save("conv", &phantoms)
            .await
            .unwrap();
        KvBookmarkRepository::new(store)
            .save("conv", "idea", "m-1")
            .await
            .unwrap();
    }

    let store = JsonFileStore::new(path);
    let overlay = KvOverlayRepository::new(store.clone());
    let bookmarks = KvBookmarkRepository::new(store);

    assert_eq!(overlay.find("conv").await.unwrap(), Some(phantoms));
    assert_eq!(
        bookmarks.find("conv", "idea").await.unwrap().as_deref(),
        Some("m-1")
    );
}

#[tokio::test]
async fn test_legacy_file_entries_migrate_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp_dir.path().join("overlay.json"));
    let legacy = PhantomSequence::new(vec![
        PhantomMessage::text(Sender::Human, "q"),
        PhantomMessage::text(Sender::Assistant, "a"),
    ]);
    store
        .put(&legacy_key("conv"), serde_json::to_value(&legacy).unwrap())
        .await
        .unwrap();

    let overlay = KvOverlayRepository::new(store.clone());
    assert_eq!(overlay.migrate_all_legacy().await.unwrap(), 1);
    assert_eq!(overlay.find("conv").await.unwrap(), Some(legacy.clone()));

    assert!(!overlay.migrate_legacy("conv").await.unwrap());
    assert_eq!(overlay.find("conv").await.unwrap(), Some(legacy));
    assert!(store.keys_with_prefix("phantom_messages_").await.unwrap().is_empty());
}
