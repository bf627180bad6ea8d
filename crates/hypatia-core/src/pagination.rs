//! Pagination arithmetic.
//!
//! Two mutually exclusive styles are supported: `page[offset]`/`page[limit]`
//! and `page[number]`/`page[size]`. Given the total size of a collection a
//! [`Pagination`] knows which slice of it to return and which neighbouring
//! pages exist.

use std::ops::Range;

/// Requested pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pagination {
    /// `page[offset]` / `page[limit]`; offset is zero-based
    Offset {
        /// Index of the first item
        offset: usize,
        /// Maximum number of items, at least 1
        limit: usize,
    },
    /// `page[number]` / `page[size]`; number is one-based
    Page {
        /// Page number, at least 1
        number: usize,
        /// Items per page, at least 1
        size: usize,
    },
}

/// Neighbouring pages of a [`Pagination`] for a given total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLinks {
    /// First page
    pub first: Pagination,
    /// Last page
    pub last: Pagination,
    /// Previous page, if the current one is not the first
    pub prev: Option<Pagination>,
    /// Next page, if more items follow the current one
    pub next: Option<Pagination>,
}

impl Pagination {
    /// Returns the index range this pagination selects out of `total` items.
    ///
    /// # Example
    ///
    /// ```
    /// use hypatia_core::Pagination;
    ///
    /// let page = Pagination::Offset { offset: 2, limit: 2 };
    /// assert_eq!(page.window(5), 2..4);
    /// assert_eq!(page.window(3), 2..3);
    /// assert_eq!(page.window(1), 1..1);
    /// ```
    #[must_use]
    pub fn window(&self, total: usize) -> Range<usize> {
        let (start, len) = match *self {
            Self::Offset { offset, limit } => (offset, limit),
            Self::Page { number, size } => (number.saturating_sub(1).saturating_mul(size), size),
        };
        let start = start.min(total);
        let end = start.saturating_add(len).min(total);
        start..end
    }

    /// Computes first/last/prev/next for a collection of `total` items.
    #[must_use]
    pub fn links(&self, total: usize) -> PageLinks {
        match *self {
            Self::Offset { offset, limit } => {
                let at = |offset| Self::Offset { offset, limit };
                PageLinks {
                    first: at(0),
                    last: at(total.saturating_sub(limit)),
                    prev: (offset > 0).then(|| at(offset.saturating_sub(limit))),
                    next: (offset.saturating_add(limit) < total).then(|| at(offset + limit)),
                }
            }
            Self::Page { number, size } => {
                let at = |number| Self::Page { number, size };
                let last = total.div_ceil(size).max(1);
                PageLinks {
                    first: at(1),
                    last: at(last),
                    prev: (number > 1).then(|| at(number - 1)),
                    next: (number < last).then(|| at(number + 1)),
                }
            }
        }
    }

    /// Returns the query parameters that reproduce this pagination.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        match *self {
            Self::Offset { offset, limit } => [
                ("page[offset]", offset.to_string()),
                ("page[limit]", limit.to_string()),
            ],
            Self::Page { number, size } => [
                ("page[number]", number.to_string()),
                ("page[size]", size.to_string()),
            ],
        }
    }
}
