//! Paging bounds
//!
//! Callers think in 1-indexed pages; data sources think in skip/take. This
//! module translates between the two and rejects page parameters that can
//! never produce a valid page.
//!
//! # Example
//!
//! ```rust
//! use acton_query::specification::Paging;
//!
//! let paging = Paging::from_page(3, 25, 100).unwrap();
//! assert_eq!(paging.skip, 50);
//! assert_eq!(paging.take, 25);
//!
//! assert!(Paging::from_page(0, 25, 100).is_err());
//! assert!(Paging::from_page(1, -5, 100).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::repository::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Maximum allowed items per page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Skip/take bounds applied after filtering and ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Paging {
    /// Number of entities to skip
    pub skip: u64,
    /// Maximum number of entities to return
    pub take: u64,
}

impl Paging {
    /// Raw skip/take bounds
    #[must_use]
    pub const fn new(skip: u64, take: u64) -> Self {
        Self { skip, take }
    }

    /// Translate a 1-indexed page into skip/take
    ///
    /// Both `page` and `size` must be positive and `size` may not exceed
    /// `max_size`. Failures name the offending parameter.
    pub fn from_page(page: i64, size: i64, max_size: u32) -> RepositoryResult<Self> {
        if page < 1 {
            return Err(invalid(
                "page",
                format!("must be a positive integer, got {}", page),
            ));
        }
        if size < 1 {
            return Err(invalid(
                "page_size",
                format!("must be a positive integer, got {}", size),
            ));
        }
        if size > i64::from(max_size) {
            return Err(invalid(
                "page_size",
                format!("must not exceed {}, got {}", max_size, size),
            ));
        }
        // Both are positive here, so the casts are lossless.
        let (page, size) = (page as u64, size as u64);
        let skip = (page - 1)
            .checked_mul(size)
            .ok_or_else(|| invalid("page", format!("page {} is out of range", page)))?;
        Ok(Self { skip, take: size })
    }

    /// The 1-indexed page these bounds describe
    ///
    /// Exact for bounds produced by [`from_page`](Self::from_page); other
    /// bounds report the page holding their first item.
    #[must_use]
    pub fn page_number(&self) -> u64 {
        if self.take == 0 {
            1
        } else {
            self.skip / self.take + 1
        }
    }
}

fn invalid(field: &str, message: String) -> RepositoryError {
    RepositoryError::invalid_argument(RepositoryOperation::BuildSpecification, field, message)
}

/// Settings that shape how page requests are translated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    /// Page size used when only a page number is given
    pub default_page_size: u32,
    /// Largest page size a caller may request
    pub max_page_size: u32,
    /// Deepest hierarchy the assembler will walk
    pub max_tree_depth: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            max_tree_depth: crate::hierarchy::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Optional page parameters as a caller supplies them
///
/// Values are signed so that negative input reaches validation instead of
/// failing to parse somewhere upstream.
///
/// # Example
///
/// ```rust
/// use acton_query::specification::{PageRequest, QuerySettings};
///
/// let settings = QuerySettings::default();
///
/// assert_eq!(PageRequest::default().resolve(&settings).unwrap(), None);
///
/// let paging = PageRequest::new(Some(2), None).resolve(&settings).unwrap().unwrap();
/// assert_eq!((paging.skip, paging.take), (20, 20));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    /// Number of items per page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
}

impl PageRequest {
    /// Create a page request
    #[must_use]
    pub const fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self { page, page_size }
    }

    /// Whether either parameter was supplied
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.page.is_some() || self.page_size.is_some()
    }

    /// Apply defaults and validate
    ///
    /// Returns `None` when neither parameter was supplied. A page without a
    /// size uses the default size; a size without a page means page 1.
    pub fn resolve(&self, settings: &QuerySettings) -> RepositoryResult<Option<Paging>> {
        if !self.is_requested() {
            return Ok(None);
        }
        let page = self.page.unwrap_or(1);
        let size = self
            .page_size
            .unwrap_or_else(|| i64::from(settings.default_page_size));
        Paging::from_page(page, size, settings.max_page_size).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;

    #[test]
    fn test_from_page_first_page() {
        assert_eq!(Paging::from_page(1, 10, 100).unwrap(), Paging::new(0, 10));
    }

    #[test]
    fn test_from_page_offset() {
        assert_eq!(Paging::from_page(4, 15, 100).unwrap(), Paging::new(45, 15));
    }

    #[test]
    fn test_zero_or_negative_page_rejected() {
        for page in [0, -1, i64::MIN] {
            let error = Paging::from_page(page, 10, 100).unwrap_err();
            assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
            assert_eq!(error.field.as_deref(), Some("page"));
        }
    }

    #[test]
    fn test_zero_or_negative_size_rejected() {
        for size in [0, -10] {
            let error = Paging::from_page(1, size, 100).unwrap_err();
            assert_eq!(error.field.as_deref(), Some("page_size"));
        }
    }

    #[test]
    fn test_size_above_max_rejected() {
        let error = Paging::from_page(1, 101, 100).unwrap_err();
        assert_eq!(error.field.as_deref(), Some("page_size"));
        assert!(error.message.contains("must not exceed 100"));
        assert!(Paging::from_page(1, 100, 100).is_ok());
    }

    #[test]
    fn test_overflowing_page_rejected() {
        let error = Paging::from_page(i64::MAX, 100, 100).unwrap_err();
        assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(error.field.as_deref(), Some("page"));
    }

    #[test]
    fn test_page_number_round_trip() {
        assert_eq!(Paging::from_page(7, 20, 100).unwrap().page_number(), 7);
        assert_eq!(Paging::new(0, 0).page_number(), 1);
    }

    #[test]
    fn test_page_request_defaults() {
        let settings = QuerySettings {
            default_page_size: 5,
            ..QuerySettings::default()
        };
        assert_eq!(PageRequest::default().resolve(&settings).unwrap(), None);
        assert_eq!(
            PageRequest::new(Some(3), None).resolve(&settings).unwrap(),
            Some(Paging::new(10, 5))
        );
        assert_eq!(
            PageRequest::new(None, Some(8)).resolve(&settings).unwrap(),
            Some(Paging::new(0, 8))
        );
    }

    #[test]
    fn test_page_request_validates() {
        let settings = QuerySettings::default();
        let negative_page = PageRequest::new(Some(-2), Some(10));
        assert!(negative_page.resolve(&settings).is_err());
        let empty_page = PageRequest::new(Some(1), Some(0));
        assert!(empty_page.resolve(&settings).is_err());
    }
}
