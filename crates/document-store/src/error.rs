use thiserror::Error;

use common::{BookId, UserId};

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional stock decrement could not be applied because the
    /// book does not hold enough units. The whole batch is rolled back.
    #[error(
        "Insufficient stock for book {book_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        book_id: BookId,
        requested: u32,
        available: u32,
    },

    /// The (user, book) review uniqueness constraint was violated.
    #[error("Duplicate review by user {user_id} for book {book_id}")]
    DuplicateReview { user_id: UserId, book_id: BookId },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
