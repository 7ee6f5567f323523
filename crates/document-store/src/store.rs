use async_trait::async_trait;

use common::{BookId, OrderId, ReviewId, UserId};

use crate::{Book, BookQuery, Cart, Order, Paged, Rating, Result, Review};

/// A stock change for one book, used by the batched decrement and
/// restore operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub book_id: BookId,
    pub quantity: u32,
}

impl StockAdjustment {
    /// Creates a stock adjustment.
    pub fn new(book_id: BookId, quantity: u32) -> Self {
        Self { book_id, quantity }
    }
}

/// Persistence operations for catalog books.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Inserts a new book.
    async fn insert_book(&self, book: &Book) -> Result<()>;

    /// Retrieves a book by ID. Returns None if absent.
    async fn find_book(&self, id: BookId) -> Result<Option<Book>>;

    /// Retrieves the books with the given IDs. Missing IDs are simply
    /// absent from the result; order follows the input where found.
    async fn find_books(&self, ids: &[BookId]) -> Result<Vec<Book>>;

    /// Replaces a stored book document.
    async fn update_book(&self, book: &Book) -> Result<()>;

    /// Deletes a book. Returns false if it did not exist.
    async fn delete_book(&self, id: BookId) -> Result<bool>;

    /// Lists books matching a typed query, paginated.
    async fn list_books(&self, query: BookQuery) -> Result<Paged<Book>>;

    /// Decrements stock for every adjustment, conditionally and as one
    /// batch: each book's stock is reduced only if it holds at least the
    /// requested quantity, and a single shortfall aborts and rolls back
    /// the whole batch with [`StoreError::InsufficientStock`].
    ///
    /// This is the race-safe primitive order placement relies on — two
    /// concurrent placements cannot both take the last units.
    ///
    /// [`StoreError::InsufficientStock`]: crate::StoreError::InsufficientStock
    async fn decrement_stock(&self, adjustments: &[StockAdjustment]) -> Result<()>;

    /// Adds stock back for every adjustment (compensation for a
    /// cancelled order). Unconditional; unknown books are skipped.
    async fn restore_stock(&self, adjustments: &[StockAdjustment]) -> Result<()>;

    /// Writes the derived rating aggregate onto a book. Returns false
    /// if the book does not exist.
    async fn set_rating(&self, id: BookId, rating: Rating) -> Result<bool>;
}

/// Persistence operations for carts.
///
/// A cart is one document; saves replace it atomically.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Retrieves a user's cart. Returns None if the user has none yet.
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Inserts or replaces a user's cart document.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;
}

/// Persistence operations for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Retrieves an order by ID. Returns None if absent.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Replaces a stored order document (status field changes).
    async fn update_order(&self, order: &Order) -> Result<()>;

    /// Lists a user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Returns true if the user has at least one paid order containing
    /// the given book. Backs the verified-purchase review flag.
    async fn has_paid_order_containing(&self, user_id: UserId, book_id: BookId) -> Result<bool>;
}

/// Persistence operations for reviews.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Inserts a new review. Fails with
    /// [`StoreError::DuplicateReview`] if the user already reviewed the
    /// book.
    ///
    /// [`StoreError::DuplicateReview`]: crate::StoreError::DuplicateReview
    async fn insert_review(&self, review: &Review) -> Result<()>;

    /// Retrieves a review by ID. Returns None if absent.
    async fn find_review(&self, id: ReviewId) -> Result<Option<Review>>;

    /// Retrieves the review a user wrote for a book, if any.
    async fn find_review_by_user_and_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<Review>>;

    /// Lists all reviews for a book, newest first.
    async fn list_reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>>;

    /// Replaces a stored review.
    async fn update_review(&self, review: &Review) -> Result<()>;

    /// Deletes a review. Returns false if it did not exist.
    async fn delete_review(&self, id: ReviewId) -> Result<bool>;

    /// Computes the rating aggregate (mean and count) over the book's
    /// current reviews, store-side.
    async fn rating_summary(&self, book_id: BookId) -> Result<Rating>;
}
