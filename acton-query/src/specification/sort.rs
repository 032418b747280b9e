//! Sort directions, sort keys and per-entity sort allow-lists
//!
//! Callers name a sort field as a string. Each entity type publishes a
//! [`SortFields`] table mapping the names it accepts to typed accessors, and
//! the name is resolved against that table while the specification is being
//! built. Unknown names are rejected there, before any data is read.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Order direction for sorting
///
/// # Example
///
/// ```rust
/// use acton_query::specification::OrderDirection;
///
/// assert_eq!(OrderDirection::Ascending.to_string(), "asc");
/// assert_eq!(OrderDirection::Descending.to_string(), "desc");
/// assert_eq!(OrderDirection::default(), OrderDirection::Ascending);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order (A-Z, 0-9, oldest first)
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Descending order (Z-A, 9-0, newest first)
    #[serde(rename = "desc")]
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl OrderDirection {
    /// Apply this direction to an ascending comparison
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Comparable value extracted from an entity for sorting
///
/// Values of different variants order by variant, with `Null` first.
/// Floats use IEEE total ordering so that `NaN` never breaks a sort.
#[derive(Debug, Clone)]
pub enum SortKey {
    /// Missing value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text, compared byte-wise
    Text(String),
    /// Point in time
    Timestamp(DateTime<Utc>),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Timestamp(_) => 5,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl From<bool> for SortKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SortKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SortKey {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for SortKey {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for SortKey {
    fn from(value: u64) -> Self {
        // Saturate; ids beyond i64::MAX all sort last together.
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for SortKey {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for SortKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SortKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for SortKey {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<V: Into<SortKey>> From<Option<V>> for SortKey {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

type KeyFn<T> = dyn Fn(&T) -> SortKey + Send + Sync;

/// A resolved ordering: the field, its accessor and a direction
pub struct OrderBy<T> {
    field: &'static str,
    key: Arc<KeyFn<T>>,
    direction: OrderDirection,
}

impl<T> Clone for OrderBy<T> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            key: Arc::clone(&self.key),
            direction: self.direction,
        }
    }
}

impl<T> fmt::Debug for OrderBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderBy")
            .field("field", &self.field)
            .field("direction", &self.direction)
            .finish()
    }
}

impl<T> OrderBy<T> {
    /// Name of the field being sorted on
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Sort direction
    pub fn direction(&self) -> OrderDirection {
        self.direction
    }

    /// Extract the sort key of one entity
    pub fn key(&self, entity: &T) -> SortKey {
        (self.key)(entity)
    }
}

/// Allow-list of sortable fields for one entity type
///
/// Build it once per entity type, typically in a `once_cell::sync::Lazy`
/// static, and resolve caller-supplied names against it.
///
/// # Example
///
/// ```rust
/// use acton_query::specification::{OrderDirection, SortFields};
///
/// struct City {
///     name: String,
///     population: u64,
/// }
///
/// let fields = SortFields::new()
///     .field("name", |c: &City| c.name.clone().into())
///     .field("population", |c: &City| c.population.into());
///
/// let order = fields.resolve("population", OrderDirection::Descending).unwrap();
/// assert_eq!(order.field(), "population");
/// assert!(fields.resolve("mayor", OrderDirection::Ascending).is_err());
/// ```
pub struct SortFields<T> {
    fields: BTreeMap<&'static str, Arc<KeyFn<T>>>,
}

impl<T> Default for SortFields<T> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }
}

impl<T> SortFields<T> {
    /// Create an empty allow-list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sortable field
    #[must_use]
    pub fn field<F>(mut self, name: &'static str, key: F) -> Self
    where
        F: Fn(&T) -> SortKey + Send + Sync + 'static,
    {
        self.fields.insert(name, Arc::new(key));
        self
    }

    /// Names accepted by [`resolve`](Self::resolve), in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.keys().copied().collect()
    }

    /// Whether `name` is on the allow-list
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Resolve a caller-supplied field name
    ///
    /// Names are matched exactly. An unknown name is an
    /// [`InvalidArgument`](crate::repository::RepositoryErrorKind::InvalidArgument)
    /// on the `sort` field.
    pub fn resolve(&self, name: &str, direction: OrderDirection) -> RepositoryResult<OrderBy<T>> {
        match self.fields.get_key_value(name) {
            Some((&field, key)) => Ok(OrderBy {
                field,
                key: Arc::clone(key),
                direction,
            }),
            None => Err(RepositoryError::invalid_argument(
                RepositoryOperation::BuildSpecification,
                "sort",
                format!(
                    "unknown sort field '{}', expected one of: {}",
                    name,
                    self.names().join(", ")
                ),
            )),
        }
    }
}
