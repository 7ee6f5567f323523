//! Review documents.

use chrono::{DateTime, Utc};
use common::{BookId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

/// A user's review of a book.
///
/// At most one review exists per (user, book) pair; the store backends
/// enforce this on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub book_id: BookId,
    /// Star rating, 1 through 5.
    pub rating: u8,
    pub title: String,
    pub comment: String,
    /// Set when the reviewer has a paid order containing the book.
    pub is_verified_purchase: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Creates a new review.
    pub fn new(
        user_id: UserId,
        book_id: BookId,
        rating: u8,
        title: impl Into<String>,
        comment: impl Into<String>,
        is_verified_purchase: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReviewId::new(),
            user_id,
            book_id,
            rating,
            title: title.into(),
            comment: comment.into(),
            is_verified_purchase,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_review_timestamps_match() {
        let review = Review::new(UserId::new(), BookId::new(), 4, "Good", "Worth it", false);
        assert_eq!(review.created_at, review.updated_at);
        assert_eq!(review.rating, 4);
    }

    #[test]
    fn review_serialization_roundtrip() {
        let review = Review::new(UserId::new(), BookId::new(), 5, "Great", "Loved it", true);
        let json = serde_json::to_string(&review).unwrap();
        let deserialized: Review = serde_json::from_str(&json).unwrap();
        assert_eq!(review, deserialized);
    }
}
