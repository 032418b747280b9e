//! Paged results

use serde::{Deserialize, Serialize};

use crate::specification::Paging;

/// One page of results plus the numbers a pagination UI needs
///
/// # Example
///
/// ```rust
/// use acton_query::repository::Page;
/// use acton_query::specification::Paging;
///
/// let page = Page::new(vec!["c", "d"], 5, Some(Paging::new(2, 2)));
/// assert_eq!(page.page, 2);
/// assert_eq!(page.total_pages, 3);
/// assert!(page.has_next);
/// assert!(page.has_prev);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Entities on this page
    pub items: Vec<T>,
    /// Matching entities across all pages
    pub total: u64,
    /// Current page number (1-indexed)
    ///
    /// Raw skip/take bounds that do not fall on a page boundary report the
    /// page containing the first returned item.
    pub page: u64,
    /// Requested page size; the item count when paging is disabled
    pub page_size: u64,
    /// Total number of pages
    pub total_pages: u64,
    /// Whether matching entities exist past this page
    pub has_next: bool,
    /// Whether matching entities were skipped before this page
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Assemble page metadata from results, the unpaged total and the bounds used
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, paging: Option<Paging>) -> Self {
        let (page, page_size, has_next, has_prev) = match paging {
            Some(paging) => (
                paging.page_number(),
                paging.take,
                paging.skip.saturating_add(paging.take) < total,
                paging.skip > 0,
            ),
            None => (1, total, false, false),
        };
        Self {
            items,
            total,
            page,
            page_size,
            total_pages: calculate_total_pages(total, page_size),
            has_next,
            has_prev,
        }
    }

    /// Number of entities on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no entities
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Transform the entities while keeping the metadata
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

fn calculate_total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return if total == 0 { 0 } else { 1 };
    }
    // Ceiling division without overflow
    total / page_size + u64::from(total % page_size != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let page = Page::new(vec![1, 2], 5, Some(Paging::new(0, 2)));
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_last_page() {
        let page = Page::new(vec![5], 5, Some(Paging::new(4, 2)));
        assert_eq!(page.page, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_page_beyond_range_is_empty() {
        let page: Page<u8> = Page::new(vec![], 5, Some(Paging::new(40, 2)));
        assert!(page.is_empty());
        assert_eq!(page.page, 21);
        assert!(!page.has_next);
    }

    #[test]
    fn test_unaligned_bounds_report_neighbours() {
        let page = Page::new(vec![2, 3, 4], 6, Some(Paging::new(1, 3)));
        assert_eq!(page.page, 1);
        assert!(page.has_prev);
        assert!(page.has_next);

        let tail = Page::new(vec![4, 5, 6], 6, Some(Paging::new(3, 4)));
        assert!(tail.has_prev);
        assert!(!tail.has_next);
    }

    #[test]
    fn test_unpaged() {
        let page = Page::new(vec!['a', 'b', 'c'], 3, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 3);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next);
    }

    #[test]
    fn test_empty_unpaged() {
        let page: Page<u8> = Page::new(vec![], 0, None);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_total_pages_max_total() {
        assert_eq!(calculate_total_pages(u64::MAX, 100), u64::MAX / 100 + 1);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], 4, Some(Paging::new(0, 2))).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 4);
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_serialize() {
        let page = Page::new(vec!["x"], 1, Some(Paging::new(0, 10)));
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["page_size"], 10);
        assert_eq!(json["items"][0], "x");
    }
}
