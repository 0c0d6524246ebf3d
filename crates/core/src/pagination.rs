//! Fixed-size pagination over an in-memory list.
//!
//! A [`Pagination`] is a pure function of (item count, page size, requested
//! page). Requested pages are clamped into range, so a stale page number
//! left over from a longer list lands on the last page instead of rendering
//! an empty one.

use std::ops::Range;

/// Products shown per catalog page.
pub const PRODUCTS_PER_PAGE: usize = 5;

/// A resolved page within a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    total_items: usize,
    page_size: usize,
    current_page: usize,
}

impl Pagination {
    /// Resolve `requested_page` (1-indexed) against a list of `total_items`.
    ///
    /// A `page_size` of zero is treated as one.
    #[must_use]
    pub fn new(total_items: usize, page_size: usize, requested_page: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_items.div_ceil(page_size).max(1);
        Self {
            total_items,
            page_size,
            current_page: requested_page.clamp(1, total_pages),
        }
    }

    /// Number of pages; at least one, even for an empty list.
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        let pages = self.total_items.div_ceil(self.page_size);
        if pages == 0 { 1 } else { pages }
    }

    /// The (clamped) current page, 1-indexed.
    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    /// Items per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total number of items across all pages.
    #[must_use]
    pub const fn total_items(&self) -> usize {
        self.total_items
    }

    /// Move to another page, clamped like [`Pagination::new`].
    #[must_use]
    pub fn go_to(self, requested_page: usize) -> Self {
        Self::new(self.total_items, self.page_size, requested_page)
    }

    /// Index range of the current page: `[(page-1)*size, page*size)`,
    /// cut at the end of the list.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        let start = ((self.current_page - 1) * self.page_size).min(self.total_items);
        let end = (self.current_page * self.page_size).min(self.total_items);
        start..end
    }

    /// The visible slice of `items`.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        items.get(self.range()).unwrap_or(&[])
    }

    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Page numbers `1..=total_pages`, for rendering page links.
    pub fn pages(&self) -> impl Iterator<Item = usize> {
        1..=self.total_pages()
    }
}
