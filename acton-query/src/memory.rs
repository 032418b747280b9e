//! In-memory data source and unit of work
//!
//! [`MemoryStore`] keeps entities in insertion order behind a Tokio
//! `RwLock` and realizes specifications directly over that vector.
//! [`MemorySession`] stages writes against a store and applies them
//! atomically when [`UnitOfWork::save_changes`] runs.
//!
//! Both are cheap to clone and share their state between clones. Every lock
//! acquisition races the caller's cancellation token, so a cancelled call
//! returns promptly even while a writer holds the lock.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = MemoryStore::from(products).with_include("category", CategoryInclude::new(categories));
//! let session = store.session();
//! let repository = GenericRepository::new(store.clone(), session.clone());
//!
//! repository.add(new_product, &cancel).await?;
//! let written = session.save_changes(&cancel).await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::repository::{
    collapse, unsupported_include, Change, ChangeTracker, DataSource, Entity, IncludeLoader,
    RepositoryError, RepositoryOperation, RepositoryResult, UnitOfWork,
};
use crate::specification::{IncludePath, Predicate};

/// Entity storage backed by a vector in insertion order
pub struct MemoryStore<T: Entity> {
    rows: Arc<RwLock<Vec<T>>>,
    includes: Arc<HashMap<String, Arc<dyn IncludeLoader<T>>>>,
}

impl<T: Entity> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            includes: Arc::clone(&self.includes),
        }
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> From<Vec<T>> for MemoryStore<T> {
    fn from(rows: Vec<T>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            includes: Arc::new(HashMap::new()),
        }
    }
}

impl<T: Entity> FromIterator<T> for MemoryStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T: Entity> MemoryStore<T> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    /// Register a loader for an include path
    ///
    /// Register loaders before cloning the store; clones made earlier keep
    /// the loaders they were created with.
    #[must_use]
    pub fn with_include<L>(mut self, path: impl Into<String>, loader: L) -> Self
    where
        L: IncludeLoader<T> + 'static,
    {
        Arc::make_mut(&mut self.includes).insert(path.into(), Arc::new(loader));
        self
    }

    /// Start a unit of work that writes to this store
    #[must_use]
    pub fn session(&self) -> MemorySession<T> {
        MemorySession::new(self.clone())
    }

    /// Number of stored entities
    pub async fn len(&self, cancel: &CancellationToken) -> RepositoryResult<usize> {
        let rows = self
            .read(RepositoryOperation::CountBySpecification, cancel)
            .await?;
        Ok(rows.len())
    }

    /// Fetch several entities by ID in one read
    ///
    /// Missing IDs are simply absent from the map.
    pub async fn get_many(
        &self,
        ids: &[T::Id],
        cancel: &CancellationToken,
    ) -> RepositoryResult<HashMap<T::Id, T>> {
        let wanted: HashSet<&T::Id> = ids.iter().collect();
        let rows = self.read(RepositoryOperation::Include, cancel).await?;
        let mut found = HashMap::with_capacity(wanted.len());
        for row in rows.iter() {
            if wanted.contains(row.id()) && !found.contains_key(row.id()) {
                found.insert(row.id().clone(), row.clone());
            }
        }
        Ok(found)
    }

    async fn read(
        &self,
        operation: RepositoryOperation,
        cancel: &CancellationToken,
    ) -> RepositoryResult<RwLockReadGuard<'_, Vec<T>>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RepositoryError::cancelled(operation)),
            guard = self.rows.read() => Ok(guard),
        }
    }

    async fn write(
        &self,
        operation: RepositoryOperation,
        cancel: &CancellationToken,
    ) -> RepositoryResult<RwLockWriteGuard<'_, Vec<T>>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RepositoryError::cancelled(operation)),
            guard = self.rows.write() => Ok(guard),
        }
    }
}

fn accepts<T: 'static>(filter: Option<&Predicate<T>>, entity: &T) -> bool {
    filter.map_or(true, |filter| filter.matches(entity))
}

impl<T: Entity> DataSource<T> for MemoryStore<T> {
    async fn get(&self, id: &T::Id, cancel: &CancellationToken) -> RepositoryResult<Option<T>> {
        let rows = self.read(RepositoryOperation::GetById, cancel).await?;
        Ok(rows.iter().find(|row| row.id() == id).cloned())
    }

    async fn scan(
        &self,
        filter: Option<&Predicate<T>>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        let rows = self
            .read(RepositoryOperation::FindBySpecification, cancel)
            .await?;
        Ok(rows
            .iter()
            .filter(|row| accepts(filter, row))
            .cloned()
            .collect())
    }

    async fn count(
        &self,
        filter: Option<&Predicate<T>>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<u64> {
        let rows = self
            .read(RepositoryOperation::CountBySpecification, cancel)
            .await?;
        let matching = rows.iter().filter(|row| accepts(filter, row)).count();
        Ok(matching as u64)
    }

    fn supports_include(&self, path: &IncludePath) -> bool {
        self.includes.contains_key(path.as_str())
    }

    async fn attach(
        &self,
        entities: &mut [T],
        path: &IncludePath,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        let Some(loader) = self.includes.get(path.as_str()) else {
            return Err(unsupported_include::<T>(path));
        };
        loader.load(entities, path, cancel).await
    }
}

/// Unit of work over a [`MemoryStore`]
///
/// Clones share the same pending changes.
pub struct MemorySession<T: Entity> {
    store: MemoryStore<T>,
    pending: Arc<Mutex<Vec<Change<T>>>>,
}

impl<T: Entity> Clone for MemorySession<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T: Entity> MemorySession<T> {
    /// Start a session against `store`
    #[must_use]
    pub fn new(store: MemoryStore<T>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Changes staged since the last successful commit, in staging order
    pub async fn pending(&self, cancel: &CancellationToken) -> RepositoryResult<Vec<Change<T>>> {
        let pending = self.lock(RepositoryOperation::SaveChanges, cancel).await?;
        Ok(pending.clone())
    }

    /// Drop every staged change without applying it
    pub async fn discard(&self, cancel: &CancellationToken) -> RepositoryResult<usize> {
        let mut pending = self.lock(RepositoryOperation::SaveChanges, cancel).await?;
        let dropped = pending.len();
        pending.clear();
        debug!(entity = T::TYPE_NAME, dropped, "discarded staged changes");
        Ok(dropped)
    }

    async fn lock(
        &self,
        operation: RepositoryOperation,
        cancel: &CancellationToken,
    ) -> RepositoryResult<MutexGuard<'_, Vec<Change<T>>>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RepositoryError::cancelled(operation)),
            guard = self.pending.lock() => Ok(guard),
        }
    }
}

impl<T: Entity> ChangeTracker<T> for MemorySession<T> {
    async fn stage(&self, change: Change<T>, cancel: &CancellationToken) -> RepositoryResult<()> {
        let operation = match change {
            Change::Add(_) => RepositoryOperation::Add,
            Change::Update(_) => RepositoryOperation::Update,
            Change::Delete(_) => RepositoryOperation::Delete,
        };
        let mut pending = self.lock(operation, cancel).await?;
        debug!(entity = T::TYPE_NAME, change = ?change, "staged change");
        pending.push(change);
        Ok(())
    }
}

impl<T: Entity> UnitOfWork for MemorySession<T> {
    #[tracing::instrument(skip_all, fields(entity = T::TYPE_NAME))]
    async fn save_changes(&self, cancel: &CancellationToken) -> RepositoryResult<usize> {
        let mut pending = self.lock(RepositoryOperation::SaveChanges, cancel).await?;
        if pending.is_empty() {
            return Ok(0);
        }
        let changes = collapse(pending.clone());

        let mut rows = self
            .store
            .write(RepositoryOperation::SaveChanges, cancel)
            .await?;
        let mut next = rows.clone();
        for change in &changes {
            apply(&mut next, change)?;
        }
        if cancel.is_cancelled() {
            return Err(RepositoryError::cancelled(RepositoryOperation::SaveChanges));
        }

        *rows = next;
        let staged = pending.len();
        pending.clear();
        debug!(staged, written = changes.len(), "committed staged changes");
        Ok(changes.len())
    }
}

fn apply<T: Entity>(rows: &mut Vec<T>, change: &Change<T>) -> RepositoryResult<()> {
    let position = rows.iter().position(|row| row.id() == change.id());
    match (change, position) {
        (Change::Add(entity), None) => rows.push(entity.clone()),
        (Change::Add(entity), Some(_)) => {
            return Err(RepositoryError::already_exists(
                T::TYPE_NAME,
                entity.id().to_string(),
            ))
        }
        (Change::Update(entity), Some(index)) => rows[index] = entity.clone(),
        (Change::Delete(_), Some(index)) => {
            rows.remove(index);
        }
        (Change::Update(_) | Change::Delete(_), None) => {
            return Err(RepositoryError::not_found(
                RepositoryOperation::SaveChanges,
                T::TYPE_NAME,
                change.id().to_string(),
            ))
        }
    }
    Ok(())
}
