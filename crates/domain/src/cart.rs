//! Cart service: per-user cart mutations.
//!
//! Every mutation recomputes the cart total inside the aggregate and
//! saves the whole cart document. The stock checks here are an early
//! courtesy to the user; the authoritative check happens at order
//! placement.

use common::{BookId, CartLineId, UserId};
use document_store::{Book, BookStore, Cart, CartStore};

use crate::error::DomainError;

/// Service for managing shopping carts.
pub struct CartService<S> {
    store: S,
}

impl<S: BookStore + CartStore> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one lazily.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart, DomainError> {
        if let Some(cart) = self.store.find_cart(user_id).await? {
            return Ok(cart);
        }
        let cart = Cart::empty(user_id);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Adds a quantity of a book to the user's cart.
    ///
    /// An existing line for the book absorbs the quantity and keeps its
    /// original price snapshot; otherwise a new line is created at the
    /// book's current price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: u32,
    ) -> Result<Cart, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        let book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", book_id))?;
        check_stock(&book, quantity)?;

        let mut cart = match self.store.find_cart(user_id).await? {
            Some(cart) => cart,
            None => Cart::empty(user_id),
        };
        cart.add_line(book_id, quantity, book.price);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Sets the quantity of an existing cart line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<Cart, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }

        let mut cart = self
            .store
            .find_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", user_id))?;
        let book_id = cart
            .line(line_id)
            .map(|line| line.book_id)
            .ok_or_else(|| DomainError::not_found("Cart item", line_id))?;

        let book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Book", book_id))?;
        check_stock(&book, quantity)?;

        cart.set_line_quantity(line_id, quantity);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Removes a line from the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Cart, DomainError> {
        let mut cart = self
            .store
            .find_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", user_id))?;

        if !cart.remove_line(line_id) {
            return Err(DomainError::not_found("Cart item", line_id));
        }
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Empties the user's cart; the total becomes zero.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<Cart, DomainError> {
        let mut cart = self
            .store
            .find_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Cart", user_id))?;

        cart.clear();
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }
}

fn check_stock(book: &Book, quantity: u32) -> Result<(), DomainError> {
    if book.stock < quantity {
        return Err(DomainError::InsufficientStock {
            book_id: book.id,
            title: book.title.clone(),
            requested: quantity,
            available: book.stock,
        });
    }
    Ok(())
}
