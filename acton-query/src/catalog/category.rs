//! Product categories

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::hierarchy::{Hierarchical, MinimalNode};
use crate::repository::{Entity, RepositoryResult, Violation};
use crate::specification::{
    Criteria, OrderDirection, PageRequest, Predicate, QuerySettings, SortFields, Specification,
};

/// Category identifier
pub type CategoryId = u64;

/// A node in the category tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
}

impl Entity for Category {
    type Id = CategoryId;
    const TYPE_NAME: &'static str = "Category";

    fn id(&self) -> &CategoryId {
        &self.id
    }

    fn validate(&self) -> Result<(), Violation> {
        if self.name.trim().is_empty() {
            return Err(Violation::new("name", "must not be empty"));
        }
        if self.parent_id == Some(self.id) {
            return Err(Violation::new("parent_id", "cannot be its own parent"));
        }
        Ok(())
    }
}

impl Hierarchical for Category {
    fn node(&self) -> MinimalNode<CategoryId> {
        MinimalNode::new(self.id, self.name.clone(), self.parent_id)
    }
}

/// Fields a category listing may be sorted by
pub static CATEGORY_SORT_FIELDS: Lazy<SortFields<Category>> = Lazy::new(|| {
    SortFields::new()
        .field("id", |c: &Category| c.id.into())
        .field("name", |c: &Category| c.name.to_lowercase().into())
});

/// Caller-facing category listing parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFilter {
    /// Case-insensitive name substring
    pub name: Option<String>,
    /// Only direct children of this category
    pub parent_id: Option<CategoryId>,
    /// Sort field; defaults to `id`
    pub sort: Option<String>,
    pub order: OrderDirection,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl CategoryFilter {
    /// Translate the parameters into a category specification
    pub fn into_specification(
        self,
        settings: &QuerySettings,
    ) -> RepositoryResult<Specification<Category>> {
        let criteria = Criteria::new()
            .and_some(self.name, |name| {
                Predicate::contains_text(|c: &Category| Some(c.name.as_str()), name)
            })
            .and_some(self.parent_id, |parent| {
                Predicate::eq(|c: &Category| &c.parent_id, Some(parent))
            });

        let mut builder = Specification::builder().named("categories");
        if !criteria.is_empty() {
            builder = builder.filter(criteria.build());
        }
        builder
            .order_by_field(
                &CATEGORY_SORT_FIELDS,
                self.sort.as_deref().unwrap_or("id"),
                self.order,
            )
            .page_request(self.page, settings)
            .build()
    }
}
