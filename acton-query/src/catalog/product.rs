//! Products and their listing parameters

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::category::{Category, CategoryId};
use crate::memory::MemoryStore;
use crate::repository::{Entity, IncludeLoader, RepositoryResult, Violation};
use crate::specification::{
    Criteria, IncludePath, OrderDirection, PageRequest, Predicate, QuerySettings, SortFields,
    Specification,
};

/// Product identifier
pub type ProductId = u64;

/// Include path that attaches [`Product::category`]
pub const CATEGORY_INCLUDE: &str = "category";

/// Lifecycle state of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Active,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Discontinued => "discontinued",
        }
    }

    /// Position in the lifecycle, used for sorting
    fn rank(&self) -> i64 {
        match self {
            Self::Draft => 0,
            Self::Active => 1,
            Self::Discontinued => 2,
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "discontinued" => Ok(Self::Discontinued),
            other => Err(format!(
                "unknown status '{}', expected one of: draft, active, discontinued",
                other
            )),
        }
    }
}

/// Supplier address, a value object nested in [`Product`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub status: ProductStatus,
    pub category_id: CategoryId,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub supplier: Address,
    /// Filled only when the `category` include is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Entity for Product {
    type Id = ProductId;
    const TYPE_NAME: &'static str = "Product";

    fn id(&self) -> &ProductId {
        &self.id
    }

    fn validate(&self) -> Result<(), Violation> {
        if self.name.trim().is_empty() {
            return Err(Violation::new("name", "must not be empty"));
        }
        if self.price_cents < 0 {
            return Err(Violation::new(
                "price_cents",
                format!("must not be negative, got {}", self.price_cents),
            ));
        }
        Ok(())
    }
}

/// Fields a product listing may be sorted by
pub static PRODUCT_SORT_FIELDS: Lazy<SortFields<Product>> = Lazy::new(|| {
    SortFields::new()
        .field("id", |p: &Product| p.id.into())
        .field("name", |p: &Product| p.name.to_lowercase().into())
        .field("price", |p: &Product| p.price_cents.into())
        .field("created_at", |p: &Product| p.created_at.into())
        .field("status", |p: &Product| p.status.rank().into())
});

/// Caller-facing product listing parameters
///
/// Every present criterion narrows the result. Without a sort field the
/// listing is ordered by `id` so that pages are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    /// Case-insensitive name substring
    pub name: Option<String>,
    /// Case-insensitive description substring; products without one never match
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    /// Any of these statuses
    pub statuses: Vec<ProductStatus>,
    /// Any of these IDs
    pub ids: Vec<ProductId>,
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring of the supplier's city
    pub supplier_city: Option<String>,
    pub sort: Option<String>,
    pub order: OrderDirection,
    #[serde(flatten)]
    pub page: PageRequest,
    /// Attach each product's category
    pub include_category: bool,
}

impl ProductFilter {
    /// Translate the parameters into a product specification
    pub fn into_specification(
        self,
        settings: &QuerySettings,
    ) -> RepositoryResult<Specification<Product>> {
        let criteria = Criteria::new()
            .and_some(self.name, |name| {
                Predicate::contains_text(|p: &Product| Some(p.name.as_str()), name)
            })
            .and_some(self.description, |text| {
                Predicate::contains_text(|p: &Product| p.description.as_deref(), text)
            })
            .and_some(self.owner_id, |owner| {
                Predicate::eq(|p: &Product| &p.owner_id, owner)
            })
            .and_if(!self.statuses.is_empty(), || {
                Predicate::member_of(|p: &Product| &p.status, self.statuses)
            })
            .and_if(!self.ids.is_empty(), || {
                Predicate::member_of(|p: &Product| &p.id, self.ids)
            })
            .and_some(self.category_id, |category| {
                Predicate::eq(|p: &Product| &p.category_id, category)
            })
            .and_some(self.supplier_city, |city| {
                Predicate::contains_text(|p: &Product| Some(p.supplier.city.as_str()), city)
            });

        let mut builder = Specification::builder().named("products");
        if !criteria.is_empty() {
            builder = builder.filter(criteria.build());
        }
        if self.include_category {
            builder = builder.include(CATEGORY_INCLUDE);
        }
        builder
            .order_by_field(
                &PRODUCT_SORT_FIELDS,
                self.sort.as_deref().unwrap_or("id"),
                self.order,
            )
            .page_request(self.page, settings)
            .build()
    }
}

/// Attaches categories to products with one batched read
#[derive(Clone)]
pub struct CategoryInclude {
    categories: MemoryStore<Category>,
}

impl CategoryInclude {
    pub fn new(categories: MemoryStore<Category>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl IncludeLoader<Product> for CategoryInclude {
    async fn load(
        &self,
        products: &mut [Product],
        _path: &IncludePath,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        let ids: Vec<CategoryId> = products
            .iter()
            .map(|p| p.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let by_id = self.categories.get_many(&ids, cancel).await?;
        for product in products.iter_mut() {
            product.category = by_id.get(&product.category_id).cloned();
        }
        Ok(())
    }
}

/// Product store with the `category` include wired to `categories`
pub fn product_store(
    products: Vec<Product>,
    categories: MemoryStore<Category>,
) -> MemoryStore<Product> {
    MemoryStore::from(products).with_include(CATEGORY_INCLUDE, CategoryInclude::new(categories))
}
