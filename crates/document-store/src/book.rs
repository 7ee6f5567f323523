//! Book catalog documents.

use chrono::{DateTime, Utc};
use common::{BookId, Price};
use serde::{Deserialize, Serialize};

/// Aggregated review rating for a book.
///
/// Derived from the book's reviews; never set directly by clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rating {
    /// Arithmetic mean of all review ratings, 0.0 when unreviewed.
    pub average: f64,
    /// Number of reviews contributing to the average.
    pub count: u32,
}

impl Rating {
    /// The rating of a book with no reviews.
    pub fn none() -> Self {
        Self::default()
    }

    /// Computes the rating aggregate from individual review scores.
    pub fn from_scores(scores: &[u8]) -> Self {
        if scores.is_empty() {
            return Self::none();
        }
        let sum: u32 = scores.iter().map(|s| u32::from(*s)).sum();
        Self {
            average: f64::from(sum) / scores.len() as f64,
            count: scores.len() as u32,
        }
    }
}

/// A book in the catalog.
///
/// Stock and rating are mutated only by the checkout orchestrator and
/// the review rating recomputation respectively; no other writer path
/// exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub categories: Vec<String>,
    pub isbn: Option<String>,
    pub price: Price,
    /// Sellable units on hand. The unsigned type makes negative stock
    /// unrepresentable; the store's conditional decrement keeps it so.
    pub stock: u32,
    pub rating: Rating,
    pub featured: bool,
    pub is_for_sale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Returns true if at least one unit is available.
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn sample_book() -> Book {
        Book {
            id: BookId::new(),
            title: "The Rust Programming Language".to_string(),
            authors: vec!["Steve Klabnik".to_string(), "Carol Nichols".to_string()],
            description: "The official book on Rust".to_string(),
            categories: vec!["Programming".to_string()],
            isbn: Some("978-1718503106".to_string()),
            price: Price::usd(3999),
            stock: 5,
            rating: Rating::none(),
            featured: false,
            is_for_sale: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn in_stock_follows_stock_count() {
        let mut book = sample_book();
        assert!(book.in_stock());

        book.stock = 0;
        assert!(!book.in_stock());
    }

    #[test]
    fn rating_from_no_scores_is_zero() {
        let rating = Rating::from_scores(&[]);
        assert_eq!(rating.average, 0.0);
        assert_eq!(rating.count, 0);
    }

    #[test]
    fn rating_from_scores_averages() {
        let rating = Rating::from_scores(&[5, 4, 3]);
        assert_eq!(rating.average, 4.0);
        assert_eq!(rating.count, 3);

        let rating = Rating::from_scores(&[5, 4]);
        assert_eq!(rating.average, 4.5);
        assert_eq!(rating.count, 2);
    }

    #[test]
    fn book_serialization_roundtrip() {
        let book = sample_book();
        let json = serde_json::to_string(&book).unwrap();
        let deserialized: Book = serde_json::from_str(&json).unwrap();
        assert_eq!(book, deserialized);
        assert_eq!(deserialized.price.amount, Money::from_cents(3999));
    }
}
