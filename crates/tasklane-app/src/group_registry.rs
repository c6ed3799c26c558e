//! Persistent registry of task groups and the current selection.

use serde::Serialize;
use tasklane_core::{Group, GroupId, GroupInput, GroupValidationError, default_group, seed_groups};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::async_store::AsyncKeyValueStore;

/// Key holding the JSON array of groups.
pub const GROUPS_KEY: &str = "task_groups";
/// Key holding the selected group id.
pub const SELECTED_GROUP_KEY: &str = "selected_group_id";
/// Key holding the next id to assign.
pub const NEXT_GROUP_ID_KEY: &str = "task_groups_next_id";

/// Errors returned by registry mutations. Nothing is changed when one is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    /// Name or colour failed validation.
    #[error(transparent)]
    Validation(#[from] GroupValidationError),
    /// No group has this id.
    #[error("group {0} does not exist")]
    NotFound(GroupId),
    /// The id counter has no value left to hand out.
    #[error("no group ids left to assign")]
    IdsExhausted,
}

/// Read and mutate groups and the selection.
#[allow(async_fn_in_trait)]
pub trait GroupCatalog {
    /// Groups in registry order.
    fn groups(&self) -> &[Group];

    /// The currently selected group.
    fn selected_group(&self) -> &Group;

    /// Look up a group by id.
    fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups().iter().find(|g| g.id == id)
    }

    /// Create a group with the next id and select it.
    ///
    /// # Errors
    /// Returns [`GroupError::Validation`] for a bad name or colour, or
    /// [`GroupError::IdsExhausted`] when no id is left.
    async fn add_group(&mut self, input: GroupInput) -> Result<Group, GroupError>;

    /// Replace the name and colour of an existing group.
    ///
    /// # Errors
    /// Returns [`GroupError::Validation`] for bad input or [`GroupError::NotFound`].
    async fn edit_group(&mut self, id: GroupId, input: GroupInput) -> Result<Group, GroupError>;

    /// Remove a group. Removing the last one restores the seed groups.
    ///
    /// # Errors
    /// Returns [`GroupError::NotFound`] for an unknown id.
    async fn delete_group(&mut self, id: GroupId) -> Result<(), GroupError>;

    /// Point the selection at an existing group.
    ///
    /// # Errors
    /// Returns [`GroupError::NotFound`] for an unknown id.
    async fn select_group(&mut self, id: GroupId) -> Result<(), GroupError>;
}

/// Group registry backed by a key-value store.
///
/// Invariants: the group list is never empty, the selection is always one of the
/// listed groups, and `next_id` is above every id ever assigned.
pub struct GroupRegistry<S> {
    store: S,
    groups: Vec<Group>,
    selected: Group,
    next_id: GroupId,
}

impl<S: AsyncKeyValueStore> GroupRegistry<S> {
    /// Restore the registry from `store`.
    ///
    /// Groups are loaded first (seed groups when nothing usable is stored), then the
    /// selected id is resolved against them, then the id counter is loaded or derived.
    pub async fn load(store: S) -> Self {
        let groups = match read_key(&store, GROUPS_KEY).await {
            Some(raw) => match serde_json::from_str::<Vec<Group>>(&raw) {
                Ok(groups) if groups.is_empty() => seed_groups(),
                Ok(groups) if id_floor(&groups).is_none() => {
                    warn!("Discarding group registry holding an id with no successor");
                    seed_groups()
                }
                Ok(groups) => groups,
                Err(err) => {
                    warn!(error = %err, "Discarding unreadable group registry");
                    seed_groups()
                }
            },
            None => seed_groups(),
        };

        let stored_selection = read_key(&store, SELECTED_GROUP_KEY)
            .await
            .and_then(|raw| raw.parse::<GroupId>().ok());
        let selected = stored_selection
            .and_then(|id| groups.iter().find(|g| g.id == id))
            .cloned()
            .unwrap_or_else(|| first_group(&groups));

        let floor = id_floor(&groups).unwrap_or(GroupId(0));
        let stored_next = read_key(&store, NEXT_GROUP_ID_KEY)
            .await
            .and_then(|raw| raw.parse::<GroupId>().ok());

        let mut registry = Self {
            store,
            groups,
            selected,
            next_id: floor,
        };
        match stored_next {
            Some(next) if next >= floor => registry.next_id = next,
            Some(stale) => {
                warn!(stored = %stale, raised_to = %floor, "Group id counter behind existing ids");
                registry.persist_next_id().await;
            }
            None => registry.persist_next_id().await,
        }
        debug!(
            groups = registry.groups.len(),
            selected = %registry.selected.id,
            next_id = %registry.next_id,
            "Loaded group registry"
        );
        registry
    }

    /// Id that the next added group will receive.
    pub const fn next_id(&self) -> GroupId {
        self.next_id
    }

    fn position(&self, id: GroupId) -> Result<usize, GroupError> {
        self.groups
            .iter()
            .position(|g| g.id == id)
            .ok_or(GroupError::NotFound(id))
    }

    async fn persist_groups(&self) {
        write_json(&self.store, GROUPS_KEY, &self.groups).await;
    }

    async fn persist_selection(&self) {
        write_key(&self.store, SELECTED_GROUP_KEY, self.selected.id.to_string()).await;
    }

    async fn persist_next_id(&self) {
        write_key(&self.store, NEXT_GROUP_ID_KEY, self.next_id.to_string()).await;
    }
}

impl<S: AsyncKeyValueStore> GroupCatalog for GroupRegistry<S> {
    fn groups(&self) -> &[Group] {
        &self.groups
    }

    fn selected_group(&self) -> &Group {
        &self.selected
    }

    async fn add_group(&mut self, input: GroupInput) -> Result<Group, GroupError> {
        let GroupInput { name, color } = input.validate()?;
        let following = self.next_id.next().ok_or(GroupError::IdsExhausted)?;
        let group = Group {
            id: self.next_id,
            name,
            color,
        };
        self.groups.push(group.clone());
        self.selected = group.clone();
        self.next_id = following;

        self.persist_groups().await;
        self.persist_next_id().await;
        self.persist_selection().await;
        info!(id = %group.id, name = %group.name, "Added group");
        Ok(group)
    }

    async fn edit_group(&mut self, id: GroupId, input: GroupInput) -> Result<Group, GroupError> {
        let GroupInput { name, color } = input.validate()?;
        let index = self.position(id)?;
        let slot = &mut self.groups[index];
        slot.name = name;
        slot.color = color;
        let group = slot.clone();
        if self.selected.id == id {
            self.selected = group.clone();
        }

        self.persist_groups().await;
        info!(id = %id, "Edited group");
        Ok(group)
    }

    async fn delete_group(&mut self, id: GroupId) -> Result<(), GroupError> {
        let index = self.position(id)?;
        self.groups.remove(index);
        if self.groups.is_empty() {
            info!("Last group removed, restoring seed groups");
            self.groups = seed_groups();
        }

        self.persist_groups().await;
        if self.selected.id == id {
            self.selected = first_group(&self.groups);
            self.persist_selection().await;
        }
        info!(id = %id, "Deleted group");
        Ok(())
    }

    async fn select_group(&mut self, id: GroupId) -> Result<(), GroupError> {
        let index = self.position(id)?;
        self.selected = self.groups[index].clone();
        self.persist_selection().await;
        debug!(id = %id, "Selected group");
        Ok(())
    }
}

/// Lowest id above every listed group. `None` when some id has no successor.
fn id_floor(groups: &[Group]) -> Option<GroupId> {
    groups
        .iter()
        .map(|g| g.id)
        .max()
        .map_or(Some(GroupId(0)), GroupId::next)
}

fn first_group(groups: &[Group]) -> Group {
    groups.first().cloned().unwrap_or_else(default_group)
}

async fn read_key<S: AsyncKeyValueStore>(store: &S, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(err) => {
            let err: anyhow::Error = err.into();
            warn!(key, error = %err, "Failed to read group state");
            None
        }
    }
}

async fn write_key<S: AsyncKeyValueStore>(store: &S, key: &str, value: String) {
    if let Err(err) = store.set(key, value).await {
        let err: anyhow::Error = err.into();
        warn!(key, error = %err, "Failed to persist group state");
    }
}

async fn write_json<S: AsyncKeyValueStore, T: Serialize + ?Sized>(store: &S, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => write_key(store, key, raw).await,
        Err(err) => warn!(key, error = %err, "Failed to encode group state"),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tasklane_store::{KeyValueStore, MemoryStore};

    fn ids(registry: &impl GroupCatalog) -> Vec<u64> {
        registry.groups().iter().map(|g| g.id.0).collect()
    }

    fn stored(store: &MemoryStore, key: &str) -> Option<String> {
        KeyValueStore::get(store, key).expect("read store")
    }

    #[tokio::test]
    async fn fresh_store_starts_from_seed_groups() {
        let store = Arc::new(MemoryStore::new());
        let registry = GroupRegistry::load(Arc::clone(&store)).await;
        assert_eq!(registry.groups(), seed_groups().as_slice());
        assert_eq!(registry.selected_group().id, GroupId(0));
        assert_eq!(registry.next_id(), GroupId(3));
        assert_eq!(stored(&store, NEXT_GROUP_ID_KEY).as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn add_then_delete_returns_to_seed_set() -> Result<(), GroupError> {
        let store = Arc::new(MemoryStore::new());
        let mut registry = GroupRegistry::load(Arc::clone(&store)).await;

        let gym = registry.add_group(GroupInput::new("Gym", "#112233")).await?;
        assert_eq!(gym.id, GroupId(3));
        assert_eq!(ids(&registry), vec![0, 1, 2, 3]);
        assert_eq!(registry.selected_group(), &gym);
        assert_eq!(stored(&store, SELECTED_GROUP_KEY).as_deref(), Some("3"));
        assert_eq!(stored(&store, NEXT_GROUP_ID_KEY).as_deref(), Some("4"));

        registry.delete_group(GroupId(3)).await?;
        assert_eq!(registry.groups(), seed_groups().as_slice());
        assert_eq!(registry.selected_group().id, GroupId(0));
        assert_eq!(stored(&store, SELECTED_GROUP_KEY).as_deref(), Some("0"));
        Ok(())
    }

    #[tokio::test]
    async fn deleting_last_group_restores_seeds() -> Result<(), GroupError> {
        let store = Arc::new(MemoryStore::with_entries([(
            GROUPS_KEY,
            r##"[{"id":5,"name":"Only","color":"#abcdef"}]"##,
        )]));
        let mut registry = GroupRegistry::load(store).await;
        assert_eq!(registry.selected_group().id, GroupId(5));

        registry.delete_group(GroupId(5)).await?;
        assert_eq!(registry.groups(), seed_groups().as_slice());
        assert_eq!(registry.selected_group(), &default_group());
        assert_eq!(registry.next_id(), GroupId(6));
        Ok(())
    }

    #[tokio::test]
    async fn ids_are_never_reused() -> Result<(), GroupError> {
        let mut registry = GroupRegistry::load(Arc::new(MemoryStore::new())).await;
        let first = registry.add_group(GroupInput::new("A", "#111")).await?;
        registry.delete_group(first.id).await?;
        let second = registry.add_group(GroupInput::new("B", "#222")).await?;
        assert_eq!(first.id, GroupId(3));
        assert_eq!(second.id, GroupId(4));
        Ok(())
    }

    #[tokio::test]
    async fn editing_selected_group_refreshes_selection() -> Result<(), GroupError> {
        let mut registry = GroupRegistry::load(Arc::new(MemoryStore::new())).await;
        registry.select_group(GroupId(1)).await?;
        let edited = registry
            .edit_group(GroupId(1), GroupInput::new("  Office  ", "#000000"))
            .await?;
        assert_eq!(edited.name, "Office");
        assert_eq!(registry.selected_group(), &edited);
        assert_eq!(registry.group(GroupId(1)), Some(&edited));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_mutations_change_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut registry = GroupRegistry::load(Arc::clone(&store)).await;
        let before = stored(&store, GROUPS_KEY);

        assert_eq!(
            registry.add_group(GroupInput::new("  ", "#fff")).await,
            Err(GroupError::Validation(GroupValidationError::EmptyName))
        );
        assert_eq!(
            registry
                .edit_group(GroupId(0), GroupInput::new("Home", "red"))
                .await,
            Err(GroupError::Validation(GroupValidationError::InvalidColor(
                "red".into()
            )))
        );
        assert_eq!(
            registry.edit_group(GroupId(9), GroupInput::new("Home", "#fff")).await,
            Err(GroupError::NotFound(GroupId(9)))
        );
        assert_eq!(
            registry.delete_group(GroupId(9)).await,
            Err(GroupError::NotFound(GroupId(9)))
        );
        assert_eq!(
            registry.select_group(GroupId(9)).await,
            Err(GroupError::NotFound(GroupId(9)))
        );

        assert_eq!(registry.groups(), seed_groups().as_slice());
        assert_eq!(registry.next_id(), GroupId(3));
        assert_eq!(stored(&store, GROUPS_KEY), before);
    }

    #[tokio::test]
    async fn startup_resolves_selection_and_counter() {
        let store = Arc::new(MemoryStore::with_entries([
            (
                GROUPS_KEY,
                r##"[{"id":0,"name":"Personal tasks","color":"#4cd484"},{"id":7,"name":"Gym","color":"#112233"}]"##,
            ),
            (SELECTED_GROUP_KEY, "7"),
        ]));
        let registry = GroupRegistry::load(Arc::clone(&store)).await;
        assert_eq!(registry.selected_group().name, "Gym");
        assert_eq!(registry.next_id(), GroupId(8));
        assert_eq!(stored(&store, NEXT_GROUP_ID_KEY).as_deref(), Some("8"));
    }

    #[tokio::test]
    async fn unknown_selection_and_stale_counter_are_repaired() {
        let store = Arc::new(MemoryStore::with_entries([
            (
                GROUPS_KEY,
                r##"[{"id":4,"name":"Errands","color":"#abc"},{"id":9,"name":"Trips","color":"#def"}]"##,
            ),
            (SELECTED_GROUP_KEY, "42"),
            (NEXT_GROUP_ID_KEY, "5"),
        ]));
        let registry = GroupRegistry::load(Arc::clone(&store)).await;
        assert_eq!(registry.selected_group().id, GroupId(4));
        assert_eq!(registry.next_id(), GroupId(10));
        assert_eq!(stored(&store, NEXT_GROUP_ID_KEY).as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn persisted_counter_ahead_of_groups_is_kept() {
        let store = Arc::new(MemoryStore::with_entries([(NEXT_GROUP_ID_KEY, "12")]));
        let registry = GroupRegistry::load(store).await;
        assert_eq!(registry.next_id(), GroupId(12));
    }

    #[tokio::test]
    async fn corrupt_registry_falls_back_to_seeds() {
        let store = Arc::new(MemoryStore::with_entries([
            (GROUPS_KEY, "not json"),
            (SELECTED_GROUP_KEY, "2"),
        ]));
        let registry = GroupRegistry::load(store).await;
        assert_eq!(registry.groups(), seed_groups().as_slice());
        assert_eq!(registry.selected_group().id, GroupId(2));
    }

    #[tokio::test]
    async fn registry_with_maximal_id_falls_back_to_seeds() {
        let store = Arc::new(MemoryStore::with_entries([(
            GROUPS_KEY,
            r##"[{"id":18446744073709551615,"name":"Overflow","color":"#abc"}]"##,
        )]));
        let registry = GroupRegistry::load(Arc::clone(&store)).await;
        assert_eq!(registry.groups(), seed_groups().as_slice());
        assert_eq!(registry.selected_group().id, GroupId(0));
        assert_eq!(registry.next_id(), GroupId(3));
    }

    #[tokio::test]
    async fn exhausted_counter_rejects_new_groups() -> Result<(), GroupError> {
        let store = Arc::new(MemoryStore::with_entries([(
            NEXT_GROUP_ID_KEY,
            "18446744073709551615",
        )]));
        let mut registry = GroupRegistry::load(Arc::clone(&store)).await;
        let before = stored(&store, GROUPS_KEY);

        assert_eq!(
            registry.add_group(GroupInput::new("Late", "#123")).await,
            Err(GroupError::IdsExhausted)
        );
        assert_eq!(registry.groups(), seed_groups().as_slice());
        assert_eq!(registry.selected_group().id, GroupId(0));
        assert_eq!(registry.next_id(), GroupId(u64::MAX));
        assert_eq!(stored(&store, GROUPS_KEY), before);

        registry.edit_group(GroupId(1), GroupInput::new("Office", "#000")).await?;
        Ok(())
    }
}
