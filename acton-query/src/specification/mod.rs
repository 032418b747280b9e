//! Query specifications
//!
//! A [`Specification`] describes one query independently of where the data
//! lives: which entities match, which related data to attach, how to order
//! them and which page to return. Specifications are assembled through a
//! [`SpecificationBuilder`] and are immutable once built, so a value handed
//! to the evaluator cannot change underneath it.
//!
//! Parameter problems (unknown sort field, bad include path, non-positive
//! page values) are collected by the builder and surface from
//! [`SpecificationBuilder::build`], before anything touches a data source.
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_query::specification::{Criteria, OrderDirection, Predicate, Specification};
//!
//! let filter = Criteria::new()
//!     .and_some(query.name.as_deref(), |n| Predicate::contains_text(|p: &Product| Some(p.name.as_str()), n))
//!     .and_some(query.owner, |owner| Predicate::eq(|p: &Product| &p.owner_id, owner))
//!     .build();
//!
//! let spec = Specification::builder()
//!     .named("products_by_owner")
//!     .filter(filter)
//!     .include("category")
//!     .order_by_field(&PRODUCT_SORT_FIELDS, "price", OrderDirection::Descending)
//!     .page(2, 25, &settings)
//!     .build()?;
//!
//! let products = repository.find_by_specification(&spec, &cancel).await?;
//! let total = repository.count_by_specification(&spec, &cancel).await?;
//! ```

mod include;
mod paging;
mod predicate;
mod sort;

pub use include::IncludePath;
pub use paging::{PageRequest, Paging, QuerySettings, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use predicate::{combine, Criteria, Predicate};
pub use sort::{OrderBy, OrderDirection, SortFields, SortKey};

use std::fmt;

use crate::repository::{RepositoryError, RepositoryResult};

/// Immutable description of one query
pub struct Specification<T> {
    name: Option<String>,
    filter: Option<Predicate<T>>,
    includes: Vec<IncludePath>,
    order: Option<OrderBy<T>>,
    paging: Option<Paging>,
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            filter: self.filter.clone(),
            includes: self.includes.clone(),
            order: self.order.clone(),
            paging: self.paging,
        }
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .field("includes", &self.includes)
            .field("order", &self.order)
            .field("paging", &self.paging)
            .finish()
    }
}

impl<T: 'static> Specification<T> {
    /// Start configuring a specification
    #[must_use]
    pub fn builder() -> SpecificationBuilder<T> {
        SpecificationBuilder::new()
    }

    /// The "match all" specification: no filter, no includes, no order, no paging
    #[must_use]
    pub fn all() -> Self {
        Self {
            name: None,
            filter: None,
            includes: Vec::new(),
            order: None,
            paging: None,
        }
    }

    /// Whether `entity` satisfies the filter
    pub fn matches(&self, entity: &T) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(entity))
    }
}

impl<T> Specification<T> {
    /// Label used in logs and error context
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Filter predicate; `None` matches everything
    pub fn filter(&self) -> Option<&Predicate<T>> {
        self.filter.as_ref()
    }

    /// Related data to attach, in first-requested order without duplicates
    pub fn includes(&self) -> &[IncludePath] {
        &self.includes
    }

    /// The single active ordering, if any
    pub fn order(&self) -> Option<&OrderBy<T>> {
        self.order.as_ref()
    }

    /// Paging bounds, present only when both skip and take were set
    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    /// Number of entities to skip
    pub fn skip(&self) -> Option<u64> {
        self.paging.map(|p| p.skip)
    }

    /// Maximum number of entities to return
    pub fn take(&self) -> Option<u64> {
        self.paging.map(|p| p.take)
    }

    /// Whether skip and take are both set
    pub fn paging_enabled(&self) -> bool {
        self.paging.is_some()
    }

    /// Compact summary such as `top_products: filter(2), include=[category], order=price desc, skip=0, take=10`
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref filter) = self.filter {
            parts.push(format!("filter({})", filter.clauses()));
        }
        if !self.includes.is_empty() {
            let includes: Vec<&str> = self.includes.iter().map(IncludePath::as_str).collect();
            parts.push(format!("include=[{}]", includes.join(", ")));
        }
        if let Some(ref order) = self.order {
            parts.push(format!("order={} {}", order.field(), order.direction()));
        }
        if let Some(paging) = self.paging {
            parts.push(format!("skip={}, take={}", paging.skip, paging.take));
        }
        let body = if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join(", ")
        };
        match self.name {
            Some(ref name) => format!("{}: {}", name, body),
            None => body,
        }
    }
}

/// Configuration phase of a [`Specification`]
///
/// Setters never fail; the first invalid parameter is remembered and
/// returned by [`build`](Self::build).
///
/// # Example
///
/// ```rust
/// use acton_query::specification::{OrderDirection, Predicate, SortFields, Specification};
///
/// #[derive(Clone)]
/// struct Task {
///     title: String,
///     done: bool,
/// }
///
/// let sort = SortFields::new().field("title", |t: &Task| t.title.clone().into());
///
/// let spec = Specification::builder()
///     .filter(Predicate::new(|t: &Task| !t.done))
///     .order_by_field(&sort, "title", OrderDirection::Ascending)
///     .skip_take(0, 10)
///     .build()
///     .unwrap();
/// assert!(spec.paging_enabled());
/// assert_eq!(spec.describe(), "filter(1), order=title asc, skip=0, take=10");
///
/// let error = Specification::<Task>::builder()
///     .order_by_field(&sort, "priority", OrderDirection::Ascending)
///     .build()
///     .unwrap_err();
/// assert_eq!(error.field.as_deref(), Some("sort"));
/// ```
pub struct SpecificationBuilder<T> {
    spec: Specification<T>,
    error: Option<RepositoryError>,
}

impl<T: 'static> Default for SpecificationBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> SpecificationBuilder<T> {
    /// Start from "match all"
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: Specification::all(),
            error: None,
        }
    }

    fn fail(&mut self, error: RepositoryError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Label the specification for logs and error context
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    /// Conjoin a filter predicate
    ///
    /// Calling this more than once narrows the result to entities matching
    /// every supplied predicate.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate<T>) -> Self {
        self.spec.filter = Some(match self.spec.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Request related data by dotted path
    #[must_use]
    pub fn include(mut self, path: impl AsRef<str>) -> Self {
        match IncludePath::parse(path) {
            Ok(path) => self.push_include(path),
            Err(error) => self.fail(error),
        }
        self
    }

    /// Request related data by an already validated path
    #[must_use]
    pub fn include_path(mut self, path: IncludePath) -> Self {
        self.push_include(path);
        self
    }

    fn push_include(&mut self, path: IncludePath) {
        if !self.spec.includes.contains(&path) {
            self.spec.includes.push(path);
        }
    }

    /// Set the ordering, replacing any previous one
    #[must_use]
    pub fn order_by(mut self, order: OrderBy<T>) -> Self {
        self.spec.order = Some(order);
        self
    }

    /// Resolve a caller-supplied field name and set it as the ordering
    #[must_use]
    pub fn order_by_field(
        mut self,
        fields: &SortFields<T>,
        name: &str,
        direction: OrderDirection,
    ) -> Self {
        match fields.resolve(name, direction) {
            Ok(order) => self.spec.order = Some(order),
            Err(error) => self.fail(error),
        }
        self
    }

    /// Drop any ordering
    #[must_use]
    pub fn unordered(mut self) -> Self {
        self.spec.order = None;
        self
    }

    /// Enable paging with raw skip/take bounds
    #[must_use]
    pub fn skip_take(mut self, skip: u64, take: u64) -> Self {
        self.spec.paging = Some(Paging::new(skip, take));
        self
    }

    /// Enable paging from a 1-indexed page number and page size
    #[must_use]
    pub fn page(mut self, page: i64, size: i64, settings: &QuerySettings) -> Self {
        match Paging::from_page(page, size, settings.max_page_size) {
            Ok(paging) => self.spec.paging = Some(paging),
            Err(error) => self.fail(error),
        }
        self
    }

    /// Enable paging from optional caller parameters
    ///
    /// Leaves paging disabled when neither parameter is present.
    #[must_use]
    pub fn page_request(mut self, request: PageRequest, settings: &QuerySettings) -> Self {
        match request.resolve(settings) {
            Ok(Some(paging)) => self.spec.paging = Some(paging),
            Ok(None) => {}
            Err(error) => self.fail(error),
        }
        self
    }

    /// Finish configuration
    pub fn build(self) -> RepositoryResult<Specification<T>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.spec),
        }
    }
}
