use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{BookId, OrderId, ReviewId, UserId};

use crate::{
    Book, BookQuery, BookSort, Cart, Order, Paged, Rating, Result, Review, StoreError,
    store::{BookStore, CartStore, OrderStore, ReviewStore, StockAdjustment},
};

#[derive(Debug, Default)]
struct State {
    books: HashMap<BookId, Book>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    reviews: HashMap<ReviewId, Review>,
}

/// In-memory document store for tests and local runs.
///
/// All documents live behind one write lock, which gives the batched
/// stock operations the same all-or-nothing behavior as the PostgreSQL
/// backend's transactions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all documents.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.books.clear();
        state.carts.clear();
        state.orders.clear();
        state.reviews.clear();
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn matches_query(book: &Book, query: &BookQuery) -> bool {
    if let Some(ref category) = query.category
        && !book.categories.iter().any(|c| c == category)
    {
        return false;
    }
    if let Some(ref author) = query.author
        && !book.authors.iter().any(|a| a == author)
    {
        return false;
    }
    if let Some(min) = query.min_price
        && book.price.amount < min
    {
        return false;
    }
    if let Some(max) = query.max_price
        && book.price.amount > max
    {
        return false;
    }
    if query.in_stock_only && book.stock == 0 {
        return false;
    }
    if let Some(featured) = query.featured
        && book.featured != featured
    {
        return false;
    }
    if query.for_sale_only && !book.is_for_sale {
        return false;
    }
    true
}

fn sort_books(books: &mut [Book], sort: BookSort) {
    match sort {
        BookSort::Newest => books.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        BookSort::TitleAsc => books.sort_by(|a, b| a.title.cmp(&b.title)),
        BookSort::PriceAsc => books.sort_by(|a, b| a.price.amount.cmp(&b.price.amount)),
        BookSort::PriceDesc => books.sort_by(|a, b| b.price.amount.cmp(&a.price.amount)),
        BookSort::RatingDesc => {
            books.sort_by(|a, b| {
                b.rating
                    .average
                    .partial_cmp(&a.rating.average)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }
}

#[async_trait]
impl BookStore for InMemoryStore {
    async fn insert_book(&self, book: &Book) -> Result<()> {
        let mut state = self.state.write().await;
        state.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.get(&id).cloned())
    }

    async fn find_books(&self, ids: &[BookId]) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.books.get(id).cloned())
            .collect())
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        let mut state = self.state.write().await;
        state.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.books.remove(&id).is_some())
    }

    async fn list_books(&self, query: BookQuery) -> Result<Paged<Book>> {
        let state = self.state.read().await;
        let mut matching: Vec<Book> = state
            .books
            .values()
            .filter(|b| matches_query(b, &query))
            .cloned()
            .collect();
        sort_books(&mut matching, query.sort);

        let total = matching.len() as u64;
        let per_page = query.effective_per_page();
        let items: Vec<Book> = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(per_page as usize)
            .collect();

        Ok(Paged {
            items,
            total,
            page: query.page.max(1),
            per_page,
        })
    }

    async fn decrement_stock(&self, adjustments: &[StockAdjustment]) -> Result<()> {
        let mut state = self.state.write().await;

        // Validate the whole batch before touching anything, so a
        // shortfall on the last line leaves the first untouched.
        for adjustment in adjustments {
            let available = state
                .books
                .get(&adjustment.book_id)
                .map(|b| b.stock)
                .unwrap_or(0);
            if available < adjustment.quantity {
                return Err(StoreError::InsufficientStock {
                    book_id: adjustment.book_id,
                    requested: adjustment.quantity,
                    available,
                });
            }
        }

        for adjustment in adjustments {
            if let Some(book) = state.books.get_mut(&adjustment.book_id) {
                book.stock -= adjustment.quantity;
                book.updated_at = chrono::Utc::now();
            }
        }
        Ok(())
    }

    async fn restore_stock(&self, adjustments: &[StockAdjustment]) -> Result<()> {
        let mut state = self.state.write().await;
        for adjustment in adjustments {
            if let Some(book) = state.books.get_mut(&adjustment.book_id) {
                book.stock += adjustment.quantity;
                book.updated_at = chrono::Utc::now();
            }
        }
        Ok(())
    }

    async fn set_rating(&self, id: BookId, rating: Rating) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.books.get_mut(&id) {
            Some(book) => {
                book.rating = rating;
                book.updated_at = chrono::Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let state = self.state.read().await;
        Ok(state.carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut state = self.state.write().await;
        state.carts.insert(cart.user_id(), cart.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn has_paid_order_containing(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.orders.values().any(|o| {
            o.user_id() == user_id
                && o.is_paid()
                && o.lines().iter().any(|l| l.book_id == book_id)
        }))
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        let mut state = self.state.write().await;
        let duplicate = state
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.book_id == review.book_id);
        if duplicate {
            return Err(StoreError::DuplicateReview {
                user_id: review.user_id,
                book_id: review.book_id,
            });
        }
        state.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn find_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let state = self.state.read().await;
        Ok(state.reviews.get(&id).cloned())
    }

    async fn find_review_by_user_and_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .find(|r| r.user_id == user_id && r.book_id == book_id)
            .cloned())
    }

    async fn list_reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn update_review(&self, review: &Review) -> Result<()> {
        let mut state = self.state.write().await;
        state.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.reviews.remove(&id).is_some())
    }

    async fn rating_summary(&self, book_id: BookId) -> Result<Rating> {
        let state = self.state.read().await;
        let scores: Vec<u8> = state
            .reviews
            .values()
            .filter(|r| r.book_id == book_id)
            .map(|r| r.rating)
            .collect();
        Ok(Rating::from_scores(&scores))
    }
}
