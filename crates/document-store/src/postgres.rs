use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{BookId, CurrencyCode, Money, OrderId, Price, ReviewId, UserId};

use crate::{
    Book, BookQuery, BookSort, Cart, Order, Paged, Rating, Result, Review, StoreError,
    store::{BookStore, CartStore, OrderStore, ReviewStore, StockAdjustment},
};

/// PostgreSQL-backed document store.
///
/// Books and reviews map to typed columns; carts and orders are stored
/// whole as JSONB documents next to the columns they are queried by,
/// so a save replaces one row — the document-level atomicity unit.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_book(row: PgRow) -> Result<Book> {
        let currency: String = row.try_get("currency")?;
        let currency: CurrencyCode = currency.parse().map_err(|e: String| {
            StoreError::Serialization(serde_json::Error::io(std::io::Error::other(e)))
        })?;

        Ok(Book {
            id: BookId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            authors: row.try_get("authors")?,
            description: row.try_get("description")?,
            categories: row.try_get("categories")?,
            isbn: row.try_get("isbn")?,
            price: Price::new(Money::from_cents(row.try_get("price_cents")?), currency),
            stock: row.try_get::<i32, _>("stock")? as u32,
            rating: Rating {
                average: row.try_get("rating_average")?,
                count: row.try_get::<i32, _>("rating_count")? as u32,
            },
            featured: row.try_get("featured")?,
            is_for_sale: row.try_get("is_for_sale")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_review(row: PgRow) -> Result<Review> {
        Ok(Review {
            id: ReviewId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
            rating: row.try_get::<i32, _>("rating")? as u8,
            title: row.try_get("title")?,
            comment: row.try_get("comment")?,
            is_verified_purchase: row.try_get("is_verified_purchase")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Appends the WHERE conditions for a book query, numbering bind
/// parameters from 1 in the order `bind_book_filters` applies them.
fn book_filter_sql(query: &BookQuery, sql: &mut String) {
    let mut param_count = 0;

    if query.category.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND ${param_count} = ANY(categories)"));
    }
    if query.author.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND ${param_count} = ANY(authors)"));
    }
    if query.min_price.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND price_cents >= ${param_count}"));
    }
    if query.max_price.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND price_cents <= ${param_count}"));
    }
    if query.featured.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND featured = ${param_count}"));
    }
    if query.in_stock_only {
        sql.push_str(" AND stock > 0");
    }
    if query.for_sale_only {
        sql.push_str(" AND is_for_sale");
    }
}

fn bind_book_filters<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    query: &'q BookQuery,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    if let Some(ref category) = query.category {
        q = q.bind(category);
    }
    if let Some(ref author) = query.author {
        q = q.bind(author);
    }
    if let Some(min) = query.min_price {
        q = q.bind(min.cents());
    }
    if let Some(max) = query.max_price {
        q = q.bind(max.cents());
    }
    if let Some(featured) = query.featured {
        q = q.bind(featured);
    }
    q
}

fn book_order_sql(sort: BookSort) -> &'static str {
    match sort {
        BookSort::Newest => " ORDER BY created_at DESC",
        BookSort::TitleAsc => " ORDER BY title ASC",
        BookSort::PriceAsc => " ORDER BY price_cents ASC",
        BookSort::PriceDesc => " ORDER BY price_cents DESC",
        BookSort::RatingDesc => " ORDER BY rating_average DESC",
    }
}

const BOOK_COLUMNS: &str = "id, title, authors, description, categories, isbn, price_cents, \
     currency, stock, rating_average, rating_count, featured, is_for_sale, created_at, updated_at";

#[async_trait]
impl BookStore for PostgresStore {
    async fn insert_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, authors, description, categories, isbn, price_cents,
                currency, stock, rating_average, rating_count, featured, is_for_sale,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.authors)
        .bind(&book.description)
        .bind(&book.categories)
        .bind(&book.isbn)
        .bind(book.price.amount.cents())
        .bind(book.price.currency.as_str())
        .bind(book.stock as i32)
        .bind(book.rating.average)
        .bind(book.rating.count as i32)
        .bind(book.featured)
        .bind(book.is_for_sale)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_book).transpose()
    }

    async fn find_books(&self, ids: &[BookId]) -> Result<Vec<Book>> {
        let uuids: Vec<Uuid> = ids.iter().map(BookId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id = std::collections::HashMap::new();
        for row in rows {
            let book = Self::row_to_book(row)?;
            by_id.insert(book.id, book);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn update_book(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE books
            SET title = $2, authors = $3, description = $4, categories = $5, isbn = $6,
                price_cents = $7, currency = $8, stock = $9, rating_average = $10,
                rating_count = $11, featured = $12, is_for_sale = $13, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.title)
        .bind(&book.authors)
        .bind(&book.description)
        .bind(&book.categories)
        .bind(&book.isbn)
        .bind(book.price.amount.cents())
        .bind(book.price.currency.as_str())
        .bind(book.stock as i32)
        .bind(book.rating.average)
        .bind(book.rating.count as i32)
        .bind(book.featured)
        .bind(book.is_for_sale)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_books(&self, query: BookQuery) -> Result<Paged<Book>> {
        let mut count_sql = "SELECT COUNT(*) FROM books WHERE TRUE".to_string();
        book_filter_sql(&query, &mut count_sql);

        let total: i64 = bind_book_filters(sqlx::query(&count_sql), &query)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;

        let per_page = query.effective_per_page();
        let mut sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE TRUE");
        book_filter_sql(&query, &mut sql);
        sql.push_str(book_order_sql(query.sort));
        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            per_page,
            query.offset()
        ));

        let rows = bind_book_filters(sqlx::query(&sql), &query)
            .fetch_all(&self.pool)
            .await?;

        let items: Vec<Book> = rows
            .into_iter()
            .map(Self::row_to_book)
            .collect::<Result<_>>()?;

        Ok(Paged {
            items,
            total: total as u64,
            page: query.page.max(1),
            per_page,
        })
    }

    async fn decrement_stock(&self, adjustments: &[StockAdjustment]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for adjustment in adjustments {
            // The condition makes the check-then-decrement race-safe:
            // an update that would take stock below zero affects no rows.
            let result = sqlx::query(
                "UPDATE books SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(adjustment.book_id.as_uuid())
            .bind(adjustment.quantity as i32)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: Option<i32> =
                    sqlx::query_scalar("SELECT stock FROM books WHERE id = $1")
                        .bind(adjustment.book_id.as_uuid())
                        .fetch_optional(&mut *tx)
                        .await?;
                tx.rollback().await?;

                tracing::warn!(
                    book_id = %adjustment.book_id,
                    requested = adjustment.quantity,
                    available = available.unwrap_or(0),
                    "stock decrement refused, batch rolled back"
                );
                return Err(StoreError::InsufficientStock {
                    book_id: adjustment.book_id,
                    requested: adjustment.quantity,
                    available: available.unwrap_or(0).max(0) as u32,
                });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn restore_stock(&self, adjustments: &[StockAdjustment]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for adjustment in adjustments {
            sqlx::query(
                "UPDATE books SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(adjustment.book_id.as_uuid())
            .bind(adjustment.quantity as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn set_rating(&self, id: BookId, rating: Rating) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE books SET rating_average = $2, rating_count = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(rating.average)
        .bind(rating.count as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM carts WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        doc.map(|d| serde_json::from_value(d).map_err(StoreError::Serialization))
            .transpose()
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let doc = serde_json::to_value(cart)?;
        sqlx::query(
            r#"
            INSERT INTO carts (user_id, doc, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
            "#,
        )
        .bind(cart.user_id().as_uuid())
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let doc = serde_json::to_value(order)?;
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, is_paid, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.is_paid())
        .bind(order.created_at())
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let doc: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT doc FROM orders WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        doc.map(|d| serde_json::from_value(d).map_err(StoreError::Serialization))
            .transpose()
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let doc = serde_json::to_value(order)?;
        sqlx::query("UPDATE orders SET status = $2, is_paid = $3, doc = $4 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.is_paid())
            .bind(doc)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let docs: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT doc FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter()
            .map(|d| serde_json::from_value(d).map_err(StoreError::Serialization))
            .collect()
    }

    async fn has_paid_order_containing(&self, user_id: UserId, book_id: BookId) -> Result<bool> {
        let needle = serde_json::json!([{ "book_id": book_id }]);
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM orders \
             WHERE user_id = $1 AND is_paid AND doc -> 'lines' @> $2)",
        )
        .bind(user_id.as_uuid())
        .bind(needle)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ReviewStore for PostgresStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, book_id, rating, title, comment,
                is_verified_purchase, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(review.book_id.as_uuid())
        .bind(i32::from(review.rating))
        .bind(&review.title)
        .bind(&review.comment)
        .bind(review.is_verified_purchase)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_user_book_review")
            {
                return StoreError::DuplicateReview {
                    user_id: review.user_id,
                    book_id: review.book_id,
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn find_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_review).transpose()
    }

    async fn find_review_by_user_and_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE user_id = $1 AND book_id = $2")
            .bind(user_id.as_uuid())
            .bind(book_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_review).transpose()
    }

    async fn list_reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        let rows =
            sqlx::query("SELECT * FROM reviews WHERE book_id = $1 ORDER BY created_at DESC")
                .bind(book_id.as_uuid())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Self::row_to_review).collect()
    }

    async fn update_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            "UPDATE reviews SET rating = $2, title = $3, comment = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(review.id.as_uuid())
        .bind(i32::from(review.rating))
        .bind(&review.title)
        .bind(&review.comment)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rating_summary(&self, book_id: BookId) -> Result<Rating> {
        let row = sqlx::query(
            "SELECT AVG(rating)::DOUBLE PRECISION AS average, COUNT(*) AS count \
             FROM reviews WHERE book_id = $1",
        )
        .bind(book_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let average: Option<f64> = row.try_get("average")?;
        let count: i64 = row.try_get("count")?;

        Ok(Rating {
            average: average.unwrap_or(0.0),
            count: count as u32,
        })
    }
}
