//! Product catalog built on the query core
//!
//! Two entity types show how a feature plugs into the generic machinery
//! instead of hand-writing one query per endpoint:
//!
//! - [`Category`] forms a tree and implements [`Hierarchical`](crate::hierarchy::Hierarchical)
//! - [`Product`] belongs to a category and can have it attached through the
//!   `category` include
//!
//! Each type publishes a sort allow-list and a filter struct whose
//! `into_specification` translates caller parameters into a
//! [`Specification`](crate::specification::Specification).
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_query::catalog::{product_store, ProductFilter, ProductStatus};
//!
//! let repository = GenericRepository::new(product_store(products, categories), session);
//!
//! let spec = ProductFilter {
//!     statuses: vec![ProductStatus::Active],
//!     supplier_city: Some("utrecht".into()),
//!     sort: Some("price".into()),
//!     include_category: true,
//!     ..Default::default()
//! }
//! .into_specification(&config.query.settings())?;
//!
//! let page = repository.find_page(&spec, &cancel).await?;
//! ```

mod category;
mod product;

pub use category::{Category, CategoryFilter, CategoryId, CATEGORY_SORT_FIELDS};
pub use product::{
    product_store, Address, CategoryInclude, Product, ProductFilter, ProductId, ProductStatus,
    CATEGORY_INCLUDE, PRODUCT_SORT_FIELDS,
};
