//! # acton-query
//!
//! Declarative queries over a generic repository, with hierarchy assembly.
//!
//! ## Features
//!
//! - **Specifications**: filter, include, order and page described once as a
//!   value and evaluated uniformly
//! - **Predicate combinators**: optional caller parameters ANDed into one filter
//! - **Generic repository**: one implementation of get, list, find, count and
//!   paged find for any entity and data source
//! - **Unit of work**: staged add/update/delete committed atomically
//! - **Hierarchy assembly**: flat parent/child records into a tree, with cycle
//!   and depth protection
//! - **Cancellation**: every entry point takes a `CancellationToken`
//!
//! ## Example
//!
//! ```rust,no_run
//! use acton_query::prelude::*;
//! use acton_query::catalog::{product_store, Category, Product, ProductFilter, ProductStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     let categories: MemoryStore<Category> = MemoryStore::new();
//!     let store = product_store(Vec::<Product>::new(), categories.clone());
//!     let repository = GenericRepository::new(store.clone(), store.session());
//!     let cancel = CancellationToken::new();
//!
//!     let spec = ProductFilter {
//!         statuses: vec![ProductStatus::Active],
//!         sort: Some("price".to_string()),
//!         ..Default::default()
//!     }
//!     .into_specification(&config.query.settings())?;
//!
//!     let page = repository.find_page(&spec, &cancel).await?;
//!     println!("{} of {} products", page.len(), page.total);
//!
//!     let tree = HierarchyAssembler::new(GenericRepository::new(categories.clone(), categories.session()))
//!         .with_settings(&config.query.settings())
//!         .build_tree(&1, &cancel)
//!         .await?;
//!     println!("{:?}", tree);
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod hierarchy;
pub mod memory;
pub mod observability;
pub mod repository;
pub mod specification;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, LoggingConfig, QueryConfig};
    pub use crate::error::{Error, ErrorResponse, Result};
    pub use crate::hierarchy::{
        Hierarchical, HierarchyAssembler, HierarchySource, MinimalNode, TreeNode,
    };
    pub use crate::memory::{MemorySession, MemoryStore};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        Change, ChangeTracker, DataSource, Entity, GenericRepository, IncludeLoader, Page,
        Repository, RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult,
        UnitOfWork, Violation,
    };
    pub use crate::specification::{
        Criteria, IncludePath, OrderBy, OrderDirection, PageRequest, Paging, Predicate,
        QuerySettings, SortFields, SortKey, Specification, SpecificationBuilder,
    };

    pub use tokio_util::sync::CancellationToken;
}
