//! Catalog endpoints: public listing and admin CRUD.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{BookId, CurrencyCode, Money, Price};
use document_store::{Book, BookQuery, BookSort};
use domain::{BookUpdate, NewBook};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::{AppState, Store};

// -- Request types --

#[derive(Deserialize)]
pub struct ListBooksParams {
    pub category: Option<String>,
    pub author: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    #[serde(default)]
    pub in_stock: bool,
    pub featured: Option<bool>,
    #[serde(default)]
    pub for_sale: bool,
    pub sort: Option<BookSort>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListBooksParams {
    fn into_query(self) -> BookQuery {
        let mut query = BookQuery::new();
        if let Some(category) = self.category {
            query = query.category(category);
        }
        if let Some(author) = self.author {
            query = query.author(author);
        }
        if let Some(min) = self.min_price_cents {
            query = query.min_price(Money::from_cents(min));
        }
        if let Some(max) = self.max_price_cents {
            query = query.max_price(Money::from_cents(max));
        }
        if self.in_stock {
            query = query.in_stock_only();
        }
        if let Some(featured) = self.featured {
            query = query.featured(featured);
        }
        if self.for_sale {
            query = query.for_sale_only();
        }
        if let Some(sort) = self.sort {
            query = query.sort(sort);
        }
        if let Some(page) = self.page {
            query = query.page(page);
        }
        if let Some(per_page) = self.per_page {
            query = query.per_page(per_page);
        }
        query
    }
}

#[derive(Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub isbn: Option<String>,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub stock: u32,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Deserialize, Default)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub isbn: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub stock: Option<u32>,
    pub featured: Option<bool>,
    pub is_for_sale: Option<bool>,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookResponse {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub categories: Vec<String>,
    pub isbn: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub stock: u32,
    pub rating_average: f64,
    pub rating_count: u32,
    pub featured: bool,
    pub is_for_sale: bool,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title,
            authors: book.authors,
            description: book.description,
            categories: book.categories,
            isbn: book.isbn,
            price_cents: book.price.amount.cents(),
            currency: book.price.currency.to_string(),
            stock: book.stock,
            rating_average: book.rating.average,
            rating_count: book.rating.count,
            featured: book.featured,
            is_for_sale: book.is_for_sale,
        }
    }
}

#[derive(Serialize)]
pub struct BookListResponse {
    pub items: Vec<BookResponse>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}

fn parse_currency(currency: Option<String>) -> Result<CurrencyCode, ApiError> {
    match currency {
        Some(code) => code.parse().map_err(ApiError::BadRequest),
        None => Ok(CurrencyCode::default()),
    }
}

// -- Handlers --

/// GET /books — list books with typed filters.
#[tracing::instrument(skip(state, params))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListBooksParams>,
) -> Result<Json<BookListResponse>, ApiError> {
    let page = state.catalog.list_books(params.into_query()).await?;
    let total_pages = page.total_pages();

    Ok(Json(BookListResponse {
        items: page.items.into_iter().map(BookResponse::from).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages,
    }))
}

/// GET /books/:id — load a single book.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state.catalog.get_book(BookId::from_uuid(id)).await?;
    Ok(Json(book.into()))
}

/// POST /books — create a book (admin).
#[tracing::instrument(skip(state, user, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let currency = parse_currency(req.currency)?;
    let new_book = NewBook {
        title: req.title,
        authors: req.authors,
        description: req.description,
        categories: req.categories,
        isbn: req.isbn,
        price: Price::new(Money::from_cents(req.price_cents), currency),
        stock: req.stock,
        featured: req.featured,
    };

    let book = state.catalog.create_book(&user.0, new_book).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// PUT /books/:id — update a book (admin).
#[tracing::instrument(skip(state, user, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let price = match req.price_cents {
        Some(cents) => Some(Price::new(
            Money::from_cents(cents),
            parse_currency(req.currency)?,
        )),
        None => None,
    };

    let update = BookUpdate {
        title: req.title,
        authors: req.authors,
        description: req.description,
        categories: req.categories,
        isbn: req.isbn,
        price,
        stock: req.stock,
        featured: req.featured,
        is_for_sale: req.is_for_sale,
    };

    let book = state
        .catalog
        .update_book(&user.0, BookId::from_uuid(id), update)
        .await?;
    Ok(Json(book.into()))
}

/// DELETE /books/:id — delete a book (admin).
#[tracing::instrument(skip(state, user))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .delete_book(&user.0, BookId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
