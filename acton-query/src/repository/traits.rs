//! Repository, entity and data source traits

use std::fmt;
use std::future::Future;
use std::hash::Hash;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::{RepositoryError, RepositoryOperation};
use super::page::Page;
use crate::specification::{IncludePath, Predicate, Specification};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// A field-level reason an entity cannot be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The offending field
    pub field: &'static str,
    /// What is wrong with it
    pub message: String,
}

impl Violation {
    /// Describe a rejected field
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn into_error(self, operation: RepositoryOperation) -> RepositoryError {
        RepositoryError::invalid_argument(operation, self.field, self.message)
    }
}

/// A persistent entity addressed by a typed identifier
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Name used in logs and error context
    const TYPE_NAME: &'static str;

    /// The entity's identifier
    fn id(&self) -> &Self::Id;

    /// Check the entity before a write is staged
    ///
    /// The default accepts every entity.
    fn validate(&self) -> Result<(), Violation> {
        Ok(())
    }
}

/// Storage backend for one entity type
///
/// A data source realizes the parts of a specification a store is good at:
/// predicate filtering, counting and relation loading. Ordering and paging
/// are applied by the [evaluator](crate::evaluator) on top of
/// [`scan`](Self::scan).
///
/// Every method must honour `cancel` and return
/// [`Cancelled`](super::RepositoryErrorKind::Cancelled) rather than a partial
/// result once it fires. Store failures are reported as
/// [`Unexpected`](super::RepositoryErrorKind::Unexpected).
pub trait DataSource<T: Entity>: Send + Sync {
    /// Fetch one entity by ID, `None` when absent
    fn get(
        &self,
        id: &T::Id,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// Fetch every entity matching `filter`, in the store's natural order
    fn scan(
        &self,
        filter: Option<&Predicate<T>>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    /// Count entities matching `filter`
    fn count(
        &self,
        filter: Option<&Predicate<T>>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Whether [`attach`](Self::attach) understands `path`
    fn supports_include(&self, path: &IncludePath) -> bool {
        let _ = path;
        false
    }

    /// Materialize related data named by `path` on every entity in `entities`
    fn attach(
        &self,
        entities: &mut [T],
        path: &IncludePath,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send {
        let _ = (entities, cancel);
        let error = unsupported_include::<T>(path);
        async move { Err(error) }
    }
}

pub(crate) fn unsupported_include<T: Entity>(path: &IncludePath) -> RepositoryError {
    RepositoryError::invalid_argument(
        RepositoryOperation::Include,
        "include",
        format!("'{}' cannot be included on {}", path, T::TYPE_NAME),
    )
    .with_entity_type(T::TYPE_NAME)
}

/// Loads one relation for a batch of entities
///
/// Loaders are registered per include path on a data source and must fill
/// the whole slice with as few reads as possible.
///
/// # Example
///
/// ```rust,ignore
/// struct CategoryInclude {
///     categories: MemoryStore<Category>,
/// }
///
/// #[async_trait]
/// impl IncludeLoader<Product> for CategoryInclude {
///     async fn load(
///         &self,
///         products: &mut [Product],
///         _path: &IncludePath,
///         cancel: &CancellationToken,
///     ) -> RepositoryResult<()> {
///         let ids: Vec<u64> = products.iter().map(|p| p.category_id).collect();
///         let by_id = self.categories.get_many(&ids, cancel).await?;
///         for product in products.iter_mut() {
///             product.category = by_id.get(&product.category_id).cloned();
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait IncludeLoader<T: Entity>: Send + Sync {
    /// Attach the relation to every entity in `entities`
    async fn load(
        &self,
        entities: &mut [T],
        path: &IncludePath,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()>;
}

/// Generic repository over one entity type
///
/// Reads go straight to the data source. Writes are only staged: `add`,
/// `update` and `delete` record intent on the session the repository was
/// built with, and nothing is durable until that session's
/// [`UnitOfWork::save_changes`](super::UnitOfWork::save_changes) runs.
pub trait Repository<T: Entity>: Send + Sync {
    /// Find an entity by ID; absence is `Ok(None)`, never an error
    fn get_by_id(
        &self,
        id: &T::Id,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Option<T>>> + Send;

    /// Check whether an entity exists
    fn exists(
        &self,
        id: &T::Id,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Every entity, unfiltered, in the store's natural order
    fn list_all(
        &self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    /// Entities selected by a specification: filtered, included, ordered, paged
    fn find_by_specification(
        &self,
        spec: &Specification<T>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<T>>> + Send;

    /// Number of entities matching a specification's filter
    ///
    /// Ordering and paging on `spec` are ignored.
    fn count_by_specification(
        &self,
        spec: &Specification<T>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// One page of results together with the unpaged total
    fn find_page(
        &self,
        spec: &Specification<T>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Page<T>>> + Send;

    /// Stage a new entity
    fn add(
        &self,
        entity: T,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Stage a replacement of an existing entity
    fn update(
        &self,
        entity: T,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;

    /// Stage removal of an entity
    fn delete(
        &self,
        entity: &T,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<()>> + Send;
}
