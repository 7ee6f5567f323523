//! Order-placement orchestrator.
//!
//! Owns the cart-to-order transition and the order status lifecycle,
//! including the stock movements on both sides: the conditional batched
//! decrement at placement and the compensating restore on cancellation.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use common::{BookId, Money, OrderId, Principal, UserId};
use document_store::{
    Book, BookStore, CartStore, Order, OrderDraft, OrderLine, OrderStatus, OrderStore,
    PaymentMethod, PaymentReceipt, ShippingAddress, StockAdjustment, StoreError,
};

use crate::error::DomainError;

/// Input for placing an order from the caller's cart.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub tax_amount: Money,
    pub shipping_amount: Money,
}

impl PlaceOrder {
    /// Creates a placement request with zero tax and shipping.
    pub fn new(shipping_address: ShippingAddress, payment_method: PaymentMethod) -> Self {
        Self {
            shipping_address,
            payment_method,
            tax_amount: Money::zero(),
            shipping_amount: Money::zero(),
        }
    }

    /// Sets the tax amount.
    pub fn with_tax_amount(mut self, tax_amount: Money) -> Self {
        self.tax_amount = tax_amount;
        self
    }

    /// Sets the shipping amount.
    pub fn with_shipping_amount(mut self, shipping_amount: Money) -> Self {
        self.shipping_amount = shipping_amount;
        self
    }
}

/// Service orchestrating order placement and the order lifecycle.
pub struct CheckoutService<S> {
    store: S,
}

impl<S: BookStore + CartStore + OrderStore> CheckoutService<S> {
    /// Creates a new checkout service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Converts the user's cart into an order.
    ///
    /// The operation is all-or-nothing up to and including the stock
    /// decrement: a validation failure, a vanished book, or any line
    /// short on stock leaves stock, cart, and order store untouched.
    /// The decrement itself is conditional per line inside the store,
    /// so two concurrent placements cannot both take the last units —
    /// the loser surfaces here as `InsufficientStock`.
    #[tracing::instrument(skip(self, request))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: PlaceOrder,
    ) -> Result<Order, DomainError> {
        let started = Instant::now();

        if let Some(field) = request.shipping_address.first_missing_field() {
            return Err(DomainError::MissingField { field });
        }
        if request.tax_amount.is_negative() {
            return Err(DomainError::NegativeAmount {
                field: "tax_amount",
            });
        }
        if request.shipping_amount.is_negative() {
            return Err(DomainError::NegativeAmount {
                field: "shipping_amount",
            });
        }

        let cart = self
            .store
            .find_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(DomainError::EmptyCart)?;

        let book_ids: Vec<BookId> = cart.lines().iter().map(|line| line.book_id).collect();
        let books: HashMap<BookId, Book> = self
            .store
            .find_books(&book_ids)
            .await?
            .into_iter()
            .map(|book| (book.id, book))
            .collect();

        let mut lines = Vec::with_capacity(cart.lines().len());
        let mut adjustments = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            let book = books
                .get(&line.book_id)
                .ok_or_else(|| DomainError::not_found("Book", line.book_id))?;
            if book.stock < line.quantity {
                return Err(DomainError::InsufficientStock {
                    book_id: book.id,
                    title: book.title.clone(),
                    requested: line.quantity,
                    available: book.stock,
                });
            }
            lines.push(OrderLine::new(
                line.book_id,
                book.title.clone(),
                line.quantity,
                line.price,
            ));
            adjustments.push(StockAdjustment::new(line.book_id, line.quantity));
        }

        // The store applies the decrement conditionally per line; a
        // stale read above cannot oversell.
        match self.store.decrement_stock(&adjustments).await {
            Ok(()) => {}
            Err(StoreError::InsufficientStock {
                book_id,
                requested,
                available,
            }) => {
                let title = books
                    .get(&book_id)
                    .map(|book| book.title.clone())
                    .unwrap_or_else(|| book_id.to_string());
                return Err(DomainError::InsufficientStock {
                    book_id,
                    title,
                    requested,
                    available,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let order = Order::create(
            OrderDraft {
                user_id,
                lines,
                currency: cart.currency(),
                shipping_address: request.shipping_address,
                payment_method: request.payment_method,
                tax_amount: request.tax_amount,
                shipping_amount: request.shipping_amount,
            },
            Utc::now(),
        );

        if let Err(e) = self.store.insert_order(&order).await {
            // Give the units back before surfacing the failure.
            if let Err(restore_err) = self.store.restore_stock(&adjustments).await {
                tracing::error!(
                    order_id = %order.id(),
                    error = %restore_err,
                    "failed to restore stock after order persistence failure"
                );
            }
            return Err(e.into());
        }

        let mut cart = cart;
        cart.clear();
        if let Err(e) = self.store.save_cart(&cart).await {
            tracing::error!(
                order_id = %order.id(),
                user_id = %user_id,
                error = %e,
                "order placed but cart could not be cleared; needs reconciliation"
            );
        }

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id(),
            lines = order.lines().len(),
            total_cents = order.total_amount().cents(),
            "order placed"
        );

        Ok(order)
    }

    /// Loads an order. Owner-or-admin.
    #[tracing::instrument(skip(self, principal))]
    pub async fn get_order(
        &self,
        principal: &Principal,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        if !principal.can_manage(order.user_id()) {
            return Err(DomainError::Forbidden {
                action: "access this order",
            });
        }
        Ok(order)
    }

    /// Lists the caller's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Records a payment against an order. Owner-or-admin.
    ///
    /// Sets `is_paid`/`paid_at`, stores the processor receipt, and moves
    /// the order to processing.
    #[tracing::instrument(skip(self, principal, receipt))]
    pub async fn mark_paid(
        &self,
        principal: &Principal,
        order_id: OrderId,
        receipt: PaymentReceipt,
    ) -> Result<Order, DomainError> {
        let mut order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        if !principal.can_manage(order.user_id()) {
            return Err(DomainError::Forbidden {
                action: "update this order",
            });
        }

        order.mark_paid(receipt, Utc::now());
        self.store.update_order(&order).await?;
        tracing::info!(order_id = %order.id(), "order paid");
        Ok(order)
    }

    /// Sets an order's status. Admin-only.
    ///
    /// Moving to delivered records the delivery timestamp. Moving to
    /// cancelled restores every line's quantity to its book's stock —
    /// but only when the order has not been delivered (goods already
    /// shipped stay sold) and was not already cancelled (stock must not
    /// be restored twice).
    #[tracing::instrument(skip(self, principal))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, DomainError> {
        if !principal.is_admin() {
            return Err(DomainError::Forbidden {
                action: "update order status",
            });
        }

        let mut order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;

        let restore = new_status == OrderStatus::Cancelled
            && !order.is_delivered()
            && order.status() != OrderStatus::Cancelled;

        if new_status == OrderStatus::Delivered {
            order.mark_delivered(Utc::now());
        } else {
            order.set_status(new_status);
        }

        if restore {
            let adjustments: Vec<StockAdjustment> = order
                .lines()
                .iter()
                .map(|line| StockAdjustment::new(line.book_id, line.quantity))
                .collect();
            self.store.restore_stock(&adjustments).await?;
            metrics::counter!("orders_cancelled_total").increment(1);
            tracing::info!(order_id = %order.id(), "stock restored for cancelled order");
        }

        self.store.update_order(&order).await?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::{InMemoryStore, Rating};

    fn test_book(title: &str, price_cents: i64, stock: u32) -> Book {
        Book {
            id: BookId::new(),
            title: title.to_string(),
            authors: vec!["Author".to_string()],
            description: "A test book".to_string(),
            categories: vec!["Fiction".to_string()],
            isbn: None,
            price: common::Price::usd(price_cents),
            stock,
            rating: Rating::none(),
            featured: false,
            is_for_sale: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Jane Reader".to_string(),
            street: "1 Library Way".to_string(),
            city: "Booktown".to_string(),
            state: "CA".to_string(),
            zip_code: "90210".to_string(),
            country: "USA".to_string(),
            phone_number: "555-0100".to_string(),
        }
    }

    fn place_request() -> PlaceOrder {
        PlaceOrder::new(test_address(), PaymentMethod::CreditCard)
    }

    fn receipt() -> PaymentReceipt {
        PaymentReceipt {
            id: "PAY-1".to_string(),
            status: "COMPLETED".to_string(),
            update_time: "2024-05-01T10:00:00Z".to_string(),
            email_address: "jane@example.com".to_string(),
        }
    }

    async fn seed_cart(store: &InMemoryStore, user_id: UserId, book: &Book, quantity: u32) {
        let mut cart = match store.find_cart(user_id).await.unwrap() {
            Some(cart) => cart,
            None => document_store::Cart::empty(user_id),
        };
        cart.add_line(book.id, quantity, book.price);
        store.save_cart(&cart).await.unwrap();
    }

    #[tokio::test]
    async fn place_order_on_empty_cart_fails() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();

        let result = service.place_order(user_id, place_request()).await;
        assert!(matches!(result, Err(DomainError::EmptyCart)));
        assert_eq!(store.order_count().await, 0);

        // An existing-but-empty cart behaves the same.
        store
            .save_cart(&document_store::Cart::empty(user_id))
            .await
            .unwrap();
        let result = service.place_order(user_id, place_request()).await;
        assert!(matches!(result, Err(DomainError::EmptyCart)));
    }

    #[tokio::test]
    async fn place_order_validates_address_and_amounts() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();

        let mut request = place_request();
        request.shipping_address.zip_code = String::new();
        let result = service.place_order(user_id, request).await;
        assert!(matches!(
            result,
            Err(DomainError::MissingField { field: "zip_code" })
        ));

        let request = place_request().with_tax_amount(Money::from_cents(-1));
        let result = service.place_order(user_id, request).await;
        assert!(matches!(
            result,
            Err(DomainError::NegativeAmount { field: "tax_amount" })
        ));
    }

    #[tokio::test]
    async fn place_order_moves_cart_into_order_and_decrements_stock() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 2).await;

        let order = service.place_order(user_id, place_request()).await.unwrap();

        assert_eq!(order.total_amount().cents(), 2000);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(!order.is_paid());
        assert_eq!(order.lines().len(), 1);
        assert_eq!(order.lines()[0].title, "Dune");

        // Stock went down by the ordered quantity.
        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().stock, 3);
        // The cart is empty again.
        let cart = store.find_cart(user_id).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[tokio::test]
    async fn place_order_totals_include_tax_and_shipping() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 3).await;

        let order = service
            .place_order(
                user_id,
                place_request().with_tax_amount(Money::from_cents(390)),
            )
            .await
            .unwrap();

        assert_eq!(order.total_amount().cents(), 3000);
        assert_eq!(order.tax_amount().cents(), 390);
        assert_eq!(order.shipping_amount().cents(), 0);
        assert_eq!(order.grand_total().cents(), 3390);
    }

    #[tokio::test]
    async fn place_order_insufficient_stock_leaves_everything_unchanged() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let plenty = test_book("Plenty", 1000, 10);
        let scarce = test_book("Scarce", 1000, 1);
        store.insert_book(&plenty).await.unwrap();
        store.insert_book(&scarce).await.unwrap();
        seed_cart(&store, user_id, &plenty, 2).await;
        seed_cart(&store, user_id, &scarce, 2).await;

        let result = service.place_order(user_id, place_request()).await;

        match result {
            Err(DomainError::InsufficientStock {
                title,
                requested,
                available,
                ..
            }) => {
                assert_eq!(title, "Scarce");
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // No partial order, no stock movement, cart intact.
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.find_book(plenty.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.find_book(scarce.id).await.unwrap().unwrap().stock, 1);
        assert_eq!(store.find_cart(user_id).await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn place_order_fails_when_book_vanished() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Gone", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 1).await;
        store.delete_book(book.id).await.unwrap();

        let result = service.place_order(user_id, place_request()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn get_order_enforces_ownership() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 1).await;

        let order = service.place_order(user_id, place_request()).await.unwrap();

        let owner = Principal::customer(user_id);
        assert!(service.get_order(&owner, order.id()).await.is_ok());

        let stranger = Principal::customer(UserId::new());
        let result = service.get_order(&stranger, order.id()).await;
        assert!(matches!(result, Err(DomainError::Forbidden { .. })));

        let admin = Principal::admin(UserId::new());
        assert!(service.get_order(&admin, order.id()).await.is_ok());

        let result = service.get_order(&owner, OrderId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn mark_paid_sets_payment_state() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 1).await;
        let order = service.place_order(user_id, place_request()).await.unwrap();

        let stranger = Principal::customer(UserId::new());
        let result = service.mark_paid(&stranger, order.id(), receipt()).await;
        assert!(matches!(result, Err(DomainError::Forbidden { .. })));

        let owner = Principal::customer(user_id);
        let paid = service
            .mark_paid(&owner, order.id(), receipt())
            .await
            .unwrap();

        assert!(paid.is_paid());
        assert!(paid.paid_at().is_some());
        assert_eq!(paid.status(), OrderStatus::Processing);

        let stored = store.find_order(order.id()).await.unwrap().unwrap();
        assert!(stored.is_paid());
    }

    #[tokio::test]
    async fn update_status_is_admin_only() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 1).await;
        let order = service.place_order(user_id, place_request()).await.unwrap();

        let owner = Principal::customer(user_id);
        let result = service
            .update_status(&owner, order.id(), OrderStatus::Shipped)
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn cancelling_undelivered_order_restores_stock() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 3).await;
        let order = service.place_order(user_id, place_request()).await.unwrap();
        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().stock, 2);

        let admin = Principal::admin(UserId::new());
        let cancelled = service
            .update_status(&admin, order.id(), OrderStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn cancelling_delivered_order_does_not_restore_stock() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 3).await;
        let order = service.place_order(user_id, place_request()).await.unwrap();

        let admin = Principal::admin(UserId::new());
        let delivered = service
            .update_status(&admin, order.id(), OrderStatus::Delivered)
            .await
            .unwrap();
        assert!(delivered.is_delivered());
        assert!(delivered.delivered_at().is_some());

        let cancelled = service
            .update_status(&admin, order.id(), OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);

        // Goods already shipped stay sold.
        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn cancelling_twice_restores_stock_only_once() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 5);
        store.insert_book(&book).await.unwrap();
        seed_cart(&store, user_id, &book, 3).await;
        let order = service.place_order(user_id, place_request()).await.unwrap();

        let admin = Principal::admin(UserId::new());
        service
            .update_status(&admin, order.id(), OrderStatus::Cancelled)
            .await
            .unwrap();
        service
            .update_status(&admin, order.id(), OrderStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(store.find_book(book.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn list_orders_returns_callers_orders_newest_first() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(store.clone());
        let user_id = UserId::new();
        let book = test_book("Dune", 1000, 10);
        store.insert_book(&book).await.unwrap();

        for _ in 0..3 {
            seed_cart(&store, user_id, &book, 1).await;
            service.place_order(user_id, place_request()).await.unwrap();
        }

        let orders = service.list_orders(user_id).await.unwrap();
        assert_eq!(orders.len(), 3);
        assert!(
            orders
                .windows(2)
                .all(|w| w[0].created_at() >= w[1].created_at())
        );

        let other = service.list_orders(UserId::new()).await.unwrap();
        assert!(other.is_empty());
    }
}
