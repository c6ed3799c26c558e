#![allow(missing_docs, clippy::expect_used)]

use std::sync::Arc;

use anyhow::Result;
use tasklane_app::{GroupCatalog, GroupRegistry, NEXT_GROUP_ID_KEY, SELECTED_GROUP_KEY};
use tasklane_core::{GroupId, GroupInput, seed_groups};
use tasklane_store::{FileStore, KeyValueStore};
use tempfile::TempDir;

fn open(dir: &TempDir) -> Arc<FileStore> {
    Arc::new(FileStore::open(dir.path().join("data")).expect("open store"))
}

#[tokio::test]
async fn registry_state_survives_restart() -> Result<()> {
    let dir = TempDir::with_prefix("tasklane-groups-test-")?;
    {
        let mut registry = GroupRegistry::load(open(&dir)).await;
        registry.add_group(GroupInput::new("Gym", "#112233")).await?;
        registry.add_group(GroupInput::new("Books", "#445566")).await?;
        registry
            .edit_group(GroupId(3), GroupInput::new("Climbing gym", "#112233"))
            .await?;
        registry.select_group(GroupId(3)).await?;
    }

    let store = open(&dir);
    let registry = GroupRegistry::load(Arc::clone(&store)).await;
    let names: Vec<&str> = registry.groups().iter().map(|g| g.name.as_str()).collect();
    assert_eq!(
        names,
        ["Personal tasks", "Work tasks", "Study tasks", "Climbing gym", "Books"]
    );
    assert_eq!(registry.selected_group().name, "Climbing gym");
    assert_eq!(registry.next_id(), GroupId(5));
    assert_eq!(store.get(SELECTED_GROUP_KEY)?.as_deref(), Some("3"));
    assert_eq!(store.get(NEXT_GROUP_ID_KEY)?.as_deref(), Some("5"));
    Ok(())
}

#[tokio::test]
async fn emptied_registry_reloads_as_seed_set() -> Result<()> {
    let dir = TempDir::with_prefix("tasklane-groups-test-")?;
    {
        let mut registry = GroupRegistry::load(open(&dir)).await;
        for id in 0..3 {
            registry.delete_group(GroupId(id)).await?;
        }
        assert_eq!(registry.groups(), seed_groups().as_slice());
    }

    let registry = GroupRegistry::load(open(&dir)).await;
    assert_eq!(registry.groups(), seed_groups().as_slice());
    assert_eq!(registry.selected_group().id, GroupId(0));
    assert_eq!(registry.next_id(), GroupId(3));
    Ok(())
}
