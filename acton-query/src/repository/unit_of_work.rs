//! Staged writes and their commit boundary
//!
//! A repository never writes directly. It hands each mutation to a
//! [`ChangeTracker`] as a [`Change`], and an explicit session object decides
//! when the accumulated changes become durable through
//! [`UnitOfWork::save_changes`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::traits::{Entity, RepositoryResult};

/// One staged mutation
#[derive(Clone)]
pub enum Change<T: Entity> {
    /// Insert a new entity
    Add(T),
    /// Replace an existing entity
    Update(T),
    /// Remove the entity with this ID
    Delete(T::Id),
}

impl<T: Entity> Change<T> {
    /// ID of the entity this change targets
    pub fn id(&self) -> &T::Id {
        match self {
            Self::Add(entity) | Self::Update(entity) => entity.id(),
            Self::Delete(id) => id,
        }
    }

    /// Short verb for logs
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

impl<T: Entity> fmt::Debug for Change<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}: {})", self.verb(), T::TYPE_NAME, self.id())
    }
}

/// Receives staged mutations from a repository
pub trait ChangeTracker<T: Entity>: Send + Sync {
    /// Record intent to apply `change` at the next commit
    fn stage(
        &self,
        change: Change<T>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;
}

/// Commit boundary for staged mutations
pub trait UnitOfWork: Send + Sync {
    /// Apply every staged change and return how many entities were written
    fn save_changes(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<usize>> + Send;
}

/// Fold staged changes into at most one change per entity
///
/// Later writes to the same ID win. An add followed by updates stays an add
/// carrying the latest value, an add followed by a delete disappears, and a
/// delete followed by an add becomes an update. Entities keep the position
/// of their first staged change.
pub fn collapse<T: Entity>(changes: Vec<Change<T>>) -> Vec<Change<T>> {
    let mut slots: Vec<Option<Change<T>>> = Vec::with_capacity(changes.len());
    let mut index: HashMap<T::Id, usize> = HashMap::new();

    for change in changes {
        let id = change.id().clone();
        let Some(&slot) = index.get(&id) else {
            index.insert(id, slots.len());
            slots.push(Some(change));
            continue;
        };
        let merged = match (slots[slot].take(), change) {
            (None, next) => Some(next),
            (Some(Change::Add(_)), Change::Update(entity)) => Some(Change::Add(entity)),
            (Some(Change::Add(_)), Change::Delete(_)) => None,
            (Some(Change::Delete(_)), Change::Add(entity)) => Some(Change::Update(entity)),
            (Some(_), next) => Some(next),
        };
        slots[slot] = merged;
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u8,
        rev: u8,
    }

    impl Entity for Item {
        type Id = u8;
        const TYPE_NAME: &'static str = "Item";

        fn id(&self) -> &u8 {
            &self.id
        }
    }

    fn item(id: u8, rev: u8) -> Item {
        Item { id, rev }
    }

    fn summary(changes: &[Change<Item>]) -> Vec<String> {
        changes
            .iter()
            .map(|change| match change {
                Change::Add(i) => format!("add {}@{}", i.id, i.rev),
                Change::Update(i) => format!("update {}@{}", i.id, i.rev),
                Change::Delete(id) => format!("delete {}", id),
            })
            .collect()
    }

    #[test]
    fn test_distinct_ids_pass_through_in_order() {
        let changes = collapse(vec![
            Change::Add(item(2, 1)),
            Change::Update(item(1, 1)),
            Change::Delete(3),
        ]);
        assert_eq!(summary(&changes), vec!["add 2@1", "update 1@1", "delete 3"]);
    }

    #[test]
    fn test_last_update_wins() {
        let changes = collapse(vec![
            Change::Update(item(1, 1)),
            Change::Update(item(2, 1)),
            Change::Update(item(1, 2)),
        ]);
        assert_eq!(summary(&changes), vec!["update 1@2", "update 2@1"]);
    }

    #[test]
    fn test_add_then_update_stays_add() {
        let changes = collapse(vec![Change::Add(item(1, 1)), Change::Update(item(1, 5))]);
        assert_eq!(summary(&changes), vec!["add 1@5"]);
    }

    #[test]
    fn test_add_then_delete_cancels_out() {
        let changes = collapse(vec![
            Change::Add(item(1, 1)),
            Change::Add(item(2, 1)),
            Change::Delete(1),
        ]);
        assert_eq!(summary(&changes), vec!["add 2@1"]);
    }

    #[test]
    fn test_cancelled_add_can_be_re_added() {
        let changes = collapse(vec![
            Change::Add(item(1, 1)),
            Change::Delete(1),
            Change::Add(item(1, 3)),
        ]);
        assert_eq!(summary(&changes), vec!["add 1@3"]);
    }

    #[test]
    fn test_delete_then_add_becomes_update() {
        let changes = collapse(vec![Change::Delete(4), Change::Add(item(4, 2))]);
        assert_eq!(summary(&changes), vec!["update 4@2"]);
    }

    #[test]
    fn test_update_then_delete_is_delete() {
        let changes = collapse(vec![Change::Update(item(4, 2)), Change::Delete(4)]);
        assert_eq!(summary(&changes), vec!["delete 4"]);
    }

    #[test]
    fn test_change_debug() {
        assert_eq!(format!("{:?}", Change::Add(item(9, 1))), "add(Item: 9)");
        let delete: Change<Item> = Change::Delete(9);
        assert_eq!(format!("{:?}", delete), "delete(Item: 9)");
    }
}
