//! Review service and rating recomputation.
//!
//! Every rating-affecting write triggers a synchronous recomputation of
//! the book's rating aggregate. The recomputation is not transactional
//! with the review write: a failure is logged and counted, never rolled
//! back into the review operation.

use chrono::Utc;
use common::{BookId, Principal, ReviewId, UserId};
use document_store::{BookStore, OrderStore, Review, ReviewStore, StoreError};

use crate::error::DomainError;

/// Longest accepted review title.
pub const MAX_REVIEW_TITLE_LEN: usize = 100;

/// Longest accepted review comment.
pub const MAX_REVIEW_COMMENT_LEN: usize = 1000;

/// Input for submitting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub rating: u8,
    pub title: String,
    pub comment: String,
}

/// Partial update of an existing review.
#[derive(Debug, Clone, Default)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Service for the review lifecycle.
pub struct ReviewService<S> {
    store: S,
}

impl<S: BookStore + OrderStore + ReviewStore> ReviewService<S> {
    /// Creates a new review service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Submits a review for a book.
    ///
    /// A user gets one review per book; a second submission fails. The
    /// verified-purchase flag is set when the user has a paid order
    /// containing the book.
    #[tracing::instrument(skip(self, new_review))]
    pub async fn create_review(
        &self,
        user_id: UserId,
        book_id: BookId,
        new_review: NewReview,
    ) -> Result<Review, DomainError> {
        validate_rating(new_review.rating)?;
        validate_text("title", &new_review.title, MAX_REVIEW_TITLE_LEN)?;
        validate_text("comment", &new_review.comment, MAX_REVIEW_COMMENT_LEN)?;

        self.store
            .find_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", book_id))?;

        if self
            .store
            .find_review_by_user_and_book(user_id, book_id)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateReview { book_id });
        }

        let is_verified_purchase = self
            .store
            .has_paid_order_containing(user_id, book_id)
            .await?;

        let review = Review::new(
            user_id,
            book_id,
            new_review.rating,
            new_review.title,
            new_review.comment,
            is_verified_purchase,
        );

        // The store's uniqueness backstop catches the race two
        // concurrent submissions can win past the check above.
        match self.store.insert_review(&review).await {
            Ok(()) => {}
            Err(StoreError::DuplicateReview { .. }) => {
                return Err(DomainError::DuplicateReview { book_id });
            }
            Err(e) => return Err(e.into()),
        }

        self.refresh_rating(book_id).await;
        tracing::info!(review_id = %review.id, book_id = %book_id, "review created");
        Ok(review)
    }

    /// Updates a review in place. Owner-or-admin.
    ///
    /// The rating aggregate is recomputed only when the rating value
    /// actually changed; title/comment edits skip it.
    #[tracing::instrument(skip(self, principal, update))]
    pub async fn update_review(
        &self,
        principal: &Principal,
        review_id: ReviewId,
        update: ReviewUpdate,
    ) -> Result<Review, DomainError> {
        let mut review = self
            .store
            .find_review(review_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Review", review_id))?;

        if !principal.can_manage(review.user_id) {
            return Err(DomainError::Forbidden {
                action: "update this review",
            });
        }

        let mut rating_changed = false;
        if let Some(rating) = update.rating {
            validate_rating(rating)?;
            rating_changed = rating != review.rating;
            review.rating = rating;
        }
        if let Some(title) = update.title {
            validate_text("title", &title, MAX_REVIEW_TITLE_LEN)?;
            review.title = title;
        }
        if let Some(comment) = update.comment {
            validate_text("comment", &comment, MAX_REVIEW_COMMENT_LEN)?;
            review.comment = comment;
        }
        review.updated_at = Utc::now();

        self.store.update_review(&review).await?;

        if rating_changed {
            self.refresh_rating(review.book_id).await;
        }
        Ok(review)
    }

    /// Deletes a review. Owner-or-admin.
    #[tracing::instrument(skip(self, principal))]
    pub async fn delete_review(
        &self,
        principal: &Principal,
        review_id: ReviewId,
    ) -> Result<(), DomainError> {
        let review = self
            .store
            .find_review(review_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Review", review_id))?;

        if !principal.can_manage(review.user_id) {
            return Err(DomainError::Forbidden {
                action: "delete this review",
            });
        }

        self.store.delete_review(review_id).await?;
        self.refresh_rating(review.book_id).await;
        tracing::info!(review_id = %review_id, "review deleted");
        Ok(())
    }

    /// Loads a review by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_review(&self, review_id: ReviewId) -> Result<Review, DomainError> {
        self.store
            .find_review(review_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Review", review_id))
    }

    /// Lists a book's reviews, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_reviews(&self, book_id: BookId) -> Result<Vec<Review>, DomainError> {
        self.store
            .find_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", book_id))?;

        Ok(self.store.list_reviews_for_book(book_id).await?)
    }

    /// Recomputes the book's rating aggregate from its reviews.
    ///
    /// Never fails the surrounding review operation: the review write
    /// is already durable, so the failure is logged for reconciliation.
    async fn refresh_rating(&self, book_id: BookId) {
        let outcome = match self.store.rating_summary(book_id).await {
            Ok(rating) => self.store.set_rating(book_id, rating).await.map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            metrics::counter!("rating_recompute_failures_total").increment(1);
            tracing::error!(
                book_id = %book_id,
                error = %e,
                "rating recomputation failed after review write"
            );
        }
    }
}

fn validate_rating(rating: u8) -> Result<(), DomainError> {
    if !(1..=5).contains(&rating) {
        return Err(DomainError::InvalidRating { rating });
    }
    Ok(())
}

fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingField { field });
    }
    if value.chars().count() > max {
        return Err(DomainError::TooLong { field, max });
    }
    Ok(())
}
