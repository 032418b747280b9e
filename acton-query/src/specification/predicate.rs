//! Predicate combinators
//!
//! A [`Predicate`] is an opaque boolean test over one entity type. [`Criteria`]
//! conjoins any number of optional conditions into one predicate, which is how
//! every feature turns its optional filter parameters into a specification
//! filter.
//!
//! # Example
//!
//! ```rust
//! use acton_query::specification::{Criteria, Predicate};
//!
//! struct Item {
//!     name: Option<String>,
//!     stock: u32,
//! }
//!
//! let name: Option<&str> = Some("bolt");
//! let in_stock_only = true;
//!
//! let filter = Criteria::new()
//!     .and_some(name, |needle| Predicate::contains_text(|i: &Item| i.name.as_deref(), needle))
//!     .and_if(in_stock_only, || Predicate::new(|i: &Item| i.stock > 0))
//!     .build();
//!
//! assert!(filter.matches(&Item { name: Some("Hex Bolt".into()), stock: 3 }));
//! assert!(!filter.matches(&Item { name: Some("Hex Bolt".into()), stock: 0 }));
//! assert!(!filter.matches(&Item { name: None, stock: 3 }));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

type TestFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// Boolean filter over a single entity type
///
/// Cloning is cheap; clones share the underlying closure.
pub struct Predicate<T> {
    test: Arc<TestFn<T>>,
    clauses: usize,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
            clauses: self.clauses,
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("clauses", &self.clauses)
            .finish_non_exhaustive()
    }
}

impl<T> Predicate<T> {
    /// Test one entity
    pub fn matches(&self, entity: &T) -> bool {
        (self.test)(entity)
    }

    /// Number of conditions conjoined into this predicate
    ///
    /// Zero means the predicate accepts everything.
    pub fn clauses(&self) -> usize {
        self.clauses
    }
}

impl<T: 'static> Predicate<T> {
    /// Wrap a closure as a predicate
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
            clauses: 1,
        }
    }

    /// The predicate that accepts every entity
    pub fn always() -> Self {
        Self {
            test: Arc::new(|_| true),
            clauses: 0,
        }
    }

    /// Logical AND, evaluating `self` first
    #[must_use]
    pub fn and(self, other: Predicate<T>) -> Self {
        if self.clauses == 0 {
            return other;
        }
        if other.clauses == 0 {
            return self;
        }
        let clauses = self.clauses + other.clauses;
        let (left, right) = (self.test, other.test);
        Self {
            test: Arc::new(move |entity| left(entity) && right(entity)),
            clauses,
        }
    }

    /// Field equality
    pub fn eq<V, F>(accessor: F, expected: V) -> Self
    where
        V: PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> &V + Send + Sync + 'static,
    {
        Self::new(move |entity| *accessor(entity) == expected)
    }

    /// Set membership, the in-memory form of an `IN (...)` filter
    pub fn member_of<V, F, I>(accessor: F, values: I) -> Self
    where
        V: Eq + Hash + Send + Sync + 'static,
        F: Fn(&T) -> &V + Send + Sync + 'static,
        I: IntoIterator<Item = V>,
    {
        let values: HashSet<V> = values.into_iter().collect();
        Self::new(move |entity| values.contains(accessor(entity)))
    }

    /// Case-insensitive substring match on a nullable text field
    ///
    /// A null field never matches.
    pub fn contains_text<F>(accessor: F, needle: impl AsRef<str>) -> Self
    where
        F: Fn(&T) -> Option<&str> + Send + Sync + 'static,
    {
        let needle = needle.as_ref().to_lowercase();
        Self::new(move |entity| {
            accessor(entity).is_some_and(|value| value.to_lowercase().contains(&needle))
        })
    }
}

/// Builder that ANDs optional conditions into one [`Predicate`]
///
/// Conditions are evaluated in the order they were added and evaluation
/// stops at the first failing one.
pub struct Criteria<T> {
    clauses: Vec<Predicate<T>>,
}

impl<T: 'static> Default for Criteria<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Criteria<T> {
    /// Start from "match all"
    #[must_use]
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Add an unconditional clause
    #[must_use]
    pub fn and(mut self, predicate: Predicate<T>) -> Self {
        self.clauses.push(predicate);
        self
    }

    /// Add a clause only when `present` is true
    ///
    /// The predicate is not constructed otherwise.
    #[must_use]
    pub fn and_if<F>(self, present: bool, predicate: F) -> Self
    where
        F: FnOnce() -> Predicate<T>,
    {
        if present {
            self.and(predicate())
        } else {
            self
        }
    }

    /// Add a clause built from an optional parameter
    #[must_use]
    pub fn and_some<V, F>(self, value: Option<V>, predicate: F) -> Self
    where
        F: FnOnce(V) -> Predicate<T>,
    {
        match value {
            Some(value) => self.and(predicate(value)),
            None => self,
        }
    }

    /// Number of clauses added so far
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether no clause has been added
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Conjoin every clause
    pub fn build(self) -> Predicate<T> {
        combine(self.clauses.into_iter().map(Some))
    }
}

/// AND every present condition together
///
/// Absent conditions are skipped. With nothing present the result accepts
/// every entity.
pub fn combine<T, I>(conditions: I) -> Predicate<T>
where
    T: 'static,
    I: IntoIterator<Item = Option<Predicate<T>>>,
{
    let present: Vec<Predicate<T>> = conditions.into_iter().flatten().collect();
    match present.len() {
        0 => Predicate::always(),
        1 => present.into_iter().next().unwrap_or_else(Predicate::always),
        _ => {
            let clauses = present.iter().map(Predicate::clauses).sum();
            let tests: Vec<Arc<TestFn<T>>> = present.into_iter().map(|p| p.test).collect();
            Predicate {
                test: Arc::new(move |entity| tests.iter().all(|test| test(entity))),
                clauses,
            }
        }
    }
}
