//! Repository traits and the generic repository
//!
//! This module defines the storage-facing side of the query core:
//!
//! - **Entities**: [`Entity`] names the ID type and optional validation
//! - **Data sources**: [`DataSource`] is the narrow read interface a backing
//!   store implements (get, filtered scan, filtered count, includes)
//! - **Repository**: [`Repository`] is the caller-facing interface, and
//!   [`GenericRepository`] implements it once for any data source
//! - **Unit of work**: writes are staged through a [`ChangeTracker`] and
//!   committed by [`UnitOfWork::save_changes`]
//! - **Pages**: [`Page`] carries a page of results with its unpaged total
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_query::memory::MemoryStore;
//! use acton_query::repository::{GenericRepository, Repository, UnitOfWork};
//! use acton_query::specification::{OrderDirection, Specification};
//!
//! let store: MemoryStore<Product> = products.into_iter().collect();
//! let session = store.session();
//! let repository = GenericRepository::new(store, session.clone());
//!
//! let spec = Specification::builder()
//!     .filter(Predicate::eq(|p: &Product| &p.status, ProductStatus::Active))
//!     .order_by_field(&PRODUCT_SORT_FIELDS, "price", OrderDirection::Ascending)
//!     .page(1, 20, &settings)
//!     .build()?;
//!
//! let page = repository.find_page(&spec, &cancel).await?;
//!
//! repository.add(new_product, &cancel).await?;
//! session.save_changes(&cancel).await?;
//! ```

mod error;
mod generic;
mod page;
mod traits;
mod unit_of_work;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use generic::GenericRepository;
pub use page::Page;
pub(crate) use traits::unsupported_include;
pub use traits::{DataSource, Entity, IncludeLoader, Repository, RepositoryResult, Violation};
pub use unit_of_work::{collapse, Change, ChangeTracker, UnitOfWork};
