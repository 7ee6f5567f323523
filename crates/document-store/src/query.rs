//! Typed catalog listing queries.
//!
//! Listing accepts only this enumerated set of filters, sorts, and
//! pagination parameters; arbitrary client-supplied filter expressions
//! are not translated into store queries.

use common::Money;
use serde::{Deserialize, Serialize};

/// Default page size for catalog listings.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Hard cap on the page size a caller may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Sort orders supported by the catalog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookSort {
    /// Most recently added first.
    #[default]
    Newest,
    TitleAsc,
    PriceAsc,
    PriceDesc,
    RatingDesc,
}

/// Filter, sort, and pagination parameters for listing books.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub category: Option<String>,
    pub author: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub in_stock_only: bool,
    pub featured: Option<bool>,
    pub for_sale_only: bool,
    pub sort: BookSort,
    pub page: u32,
    pub per_page: u32,
}

impl BookQuery {
    /// Creates a query with no filters, default sort, first page.
    pub fn new() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            ..Self::default()
        }
    }

    /// Filters by category membership.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Filters by author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Keeps books priced at or above the given amount.
    pub fn min_price(mut self, min: Money) -> Self {
        self.min_price = Some(min);
        self
    }

    /// Keeps books priced at or below the given amount.
    pub fn max_price(mut self, max: Money) -> Self {
        self.max_price = Some(max);
        self
    }

    /// Keeps only books with at least one unit in stock.
    pub fn in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    /// Filters by the featured flag.
    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    /// Keeps only books currently offered for sale.
    pub fn for_sale_only(mut self) -> Self {
        self.for_sale_only = true;
        self
    }

    /// Sets the sort order.
    pub fn sort(mut self, sort: BookSort) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the 1-based page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size, clamped to [`MAX_PER_PAGE`].
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    /// Returns the number of items to skip for the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.effective_per_page())
    }

    /// Returns the page size with defaults and the cap applied.
    pub fn effective_per_page(&self) -> u32 {
        if self.per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            self.per_page.min(MAX_PER_PAGE)
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    /// Total number of items matching the query across all pages.
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paged<T> {
    /// Returns the number of pages needed for `total` items.
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_composes_filters() {
        let query = BookQuery::new()
            .category("Programming")
            .author("Carol Nichols")
            .min_price(Money::from_cents(500))
            .max_price(Money::from_cents(5000))
            .in_stock_only()
            .featured(true)
            .sort(BookSort::PriceAsc)
            .page(2)
            .per_page(25);

        assert_eq!(query.category.as_deref(), Some("Programming"));
        assert_eq!(query.author.as_deref(), Some("Carol Nichols"));
        assert_eq!(query.min_price, Some(Money::from_cents(500)));
        assert_eq!(query.max_price, Some(Money::from_cents(5000)));
        assert!(query.in_stock_only);
        assert_eq!(query.featured, Some(true));
        assert_eq!(query.sort, BookSort::PriceAsc);
        assert_eq!(query.page, 2);
        assert_eq!(query.per_page, 25);
    }

    #[test]
    fn per_page_is_capped() {
        let query = BookQuery::new().per_page(1000);
        assert_eq!(query.per_page, MAX_PER_PAGE);

        let query = BookQuery::new().per_page(0);
        assert_eq!(query.per_page, 1);
    }

    #[test]
    fn offset_accounts_for_page_and_size() {
        let query = BookQuery::new().page(3).per_page(20);
        assert_eq!(query.offset(), 40);

        let query = BookQuery::new();
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn page_zero_is_clamped_to_first() {
        let query = BookQuery::new().page(0);
        assert_eq!(query.page, 1);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let paged: Paged<u32> = Paged {
            items: vec![],
            total: 21,
            page: 1,
            per_page: 10,
        };
        assert_eq!(paged.total_pages(), 3);

        let paged: Paged<u32> = Paged {
            items: vec![],
            total: 20,
            page: 1,
            per_page: 10,
        };
        assert_eq!(paged.total_pages(), 2);
    }
}
