//! Domain error types.

use common::BookId;
use document_store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
///
/// Every failure a caller can act on is a distinct variant; the HTTP
/// layer maps them onto status codes without inspecting messages.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced document does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Order placement was attempted on an empty cart.
    #[error("Cart is empty, cannot create order")]
    EmptyCart,

    /// A book cannot cover the requested quantity.
    #[error(
        "{title} is not available in the requested quantity: requested {requested}, available {available}"
    )]
    InsufficientStock {
        book_id: BookId,
        title: String,
        requested: u32,
        available: u32,
    },

    /// The caller already reviewed this book.
    #[error("You have already reviewed this book")]
    DuplicateReview { book_id: BookId },

    /// The caller lacks ownership or the required role.
    #[error("Not authorized to {action}")]
    Forbidden { action: &'static str },

    /// Quantity must be at least 1.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// Rating must be between 1 and 5.
    #[error("Invalid rating: {rating} (must be between 1 and 5)")]
    InvalidRating { rating: u8 },

    /// A required field was empty.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// A text field exceeded its length cap.
    #[error("{field} cannot be more than {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// A money amount that must be non-negative was negative.
    #[error("{field} cannot be negative")]
    NegativeAmount { field: &'static str },

    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Creates a NotFound error for an entity.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for malformed-input failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidQuantity { .. }
                | DomainError::InvalidRating { .. }
                | DomainError::MissingField { .. }
                | DomainError::TooLong { .. }
                | DomainError::NegativeAmount { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_entity_and_id() {
        let err = DomainError::not_found("Book", "abc");
        assert_eq!(err.to_string(), "Book not found: abc");
    }

    #[test]
    fn insufficient_stock_message_names_book_and_amounts() {
        let err = DomainError::InsufficientStock {
            book_id: BookId::new(),
            title: "Dune".to_string(),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "Dune is not available in the requested quantity: requested 3, available 1"
        );
    }

    #[test]
    fn validation_classification() {
        assert!(DomainError::InvalidQuantity { quantity: 0 }.is_validation());
        assert!(DomainError::MissingField { field: "city" }.is_validation());
        assert!(!DomainError::EmptyCart.is_validation());
        assert!(!DomainError::not_found("Order", "x").is_validation());
    }
}
