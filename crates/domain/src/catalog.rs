//! Catalog service: book CRUD and typed listing.

use chrono::Utc;
use common::{BookId, Price, Principal};
use document_store::{Book, BookQuery, BookStore, Paged, Rating};

use crate::error::DomainError;

/// Longest accepted book title.
pub const MAX_TITLE_LEN: usize = 200;

/// Input for creating a catalog book.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub categories: Vec<String>,
    pub isbn: Option<String>,
    pub price: Price,
    pub stock: u32,
    pub featured: bool,
}

/// Partial update of a catalog book.
///
/// Deliberately has no rating field: the rating aggregate is derived
/// from reviews and cannot be written by clients.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub isbn: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<u32>,
    pub featured: Option<bool>,
    pub is_for_sale: Option<bool>,
}

/// Service for managing the book catalog.
pub struct CatalogService<S> {
    store: S,
}

impl<S: BookStore> CatalogService<S> {
    /// Creates a new catalog service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a book. Admin-only.
    #[tracing::instrument(skip(self, new_book), fields(title = %new_book.title))]
    pub async fn create_book(
        &self,
        principal: &Principal,
        new_book: NewBook,
    ) -> Result<Book, DomainError> {
        if !principal.is_admin() {
            return Err(DomainError::Forbidden {
                action: "create books",
            });
        }

        let now = Utc::now();
        let book = Book {
            id: BookId::new(),
            title: new_book.title,
            authors: new_book.authors,
            description: new_book.description,
            categories: if new_book.categories.is_empty() {
                vec!["Uncategorized".to_string()]
            } else {
                new_book.categories
            },
            isbn: new_book.isbn,
            price: new_book.price,
            stock: new_book.stock,
            rating: Rating::none(),
            featured: new_book.featured,
            is_for_sale: true,
            created_at: now,
            updated_at: now,
        };
        validate_book(&book)?;

        self.store.insert_book(&book).await?;
        tracing::info!(book_id = %book.id, "book created");
        Ok(book)
    }

    /// Applies a partial update to a book. Admin-only.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_book(
        &self,
        principal: &Principal,
        book_id: BookId,
        update: BookUpdate,
    ) -> Result<Book, DomainError> {
        if !principal.is_admin() {
            return Err(DomainError::Forbidden {
                action: "update books",
            });
        }

        let mut book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", book_id))?;

        if let Some(title) = update.title {
            book.title = title;
        }
        if let Some(authors) = update.authors {
            book.authors = authors;
        }
        if let Some(description) = update.description {
            book.description = description;
        }
        if let Some(categories) = update.categories {
            book.categories = categories;
        }
        if let Some(isbn) = update.isbn {
            book.isbn = Some(isbn);
        }
        if let Some(price) = update.price {
            book.price = price;
        }
        if let Some(stock) = update.stock {
            book.stock = stock;
        }
        if let Some(featured) = update.featured {
            book.featured = featured;
        }
        if let Some(is_for_sale) = update.is_for_sale {
            book.is_for_sale = is_for_sale;
        }
        validate_book(&book)?;

        self.store.update_book(&book).await?;
        Ok(book)
    }

    /// Deletes a book. Admin-only.
    #[tracing::instrument(skip(self))]
    pub async fn delete_book(
        &self,
        principal: &Principal,
        book_id: BookId,
    ) -> Result<(), DomainError> {
        if !principal.is_admin() {
            return Err(DomainError::Forbidden {
                action: "delete books",
            });
        }

        if !self.store.delete_book(book_id).await? {
            return Err(DomainError::not_found("Book", book_id));
        }
        tracing::info!(book_id = %book_id, "book deleted");
        Ok(())
    }

    /// Loads a book by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_book(&self, book_id: BookId) -> Result<Book, DomainError> {
        self.store
            .find_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", book_id))
    }

    /// Lists books matching a typed query.
    #[tracing::instrument(skip(self, query))]
    pub async fn list_books(&self, query: BookQuery) -> Result<Paged<Book>, DomainError> {
        Ok(self.store.list_books(query).await?)
    }
}

fn validate_book(book: &Book) -> Result<(), DomainError> {
    if book.title.trim().is_empty() {
        return Err(DomainError::MissingField { field: "title" });
    }
    if book.title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::TooLong {
            field: "title",
            max: MAX_TITLE_LEN,
        });
    }
    if book.authors.is_empty() || book.authors.iter().all(|a| a.trim().is_empty()) {
        return Err(DomainError::MissingField { field: "authors" });
    }
    if book.description.trim().is_empty() {
        return Err(DomainError::MissingField {
            field: "description",
        });
    }
    if book.price.amount.is_negative() {
        return Err(DomainError::NegativeAmount { field: "price" });
    }
    Ok(())
}
