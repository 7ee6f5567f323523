//! Shopping cart documents.

use chrono::{DateTime, Utc};
use common::{BookId, CartLineId, CurrencyCode, Money, Price, UserId};
use serde::{Deserialize, Serialize};

/// One (book, quantity, price-snapshot) entry in a cart.
///
/// The price is snapshotted when the book is first added and kept even
/// if the catalog price changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub book_id: BookId,
    pub quantity: u32,
    pub price: Price,
}

impl CartLine {
    /// Creates a new cart line with a fresh line ID.
    pub fn new(book_id: BookId, quantity: u32, price: Price) -> Self {
        Self {
            id: CartLineId::new(),
            book_id,
            quantity,
            price,
        }
    }

    /// Returns the total price for this line (quantity × unit price).
    pub fn line_total(&self) -> Money {
        self.price.amount.multiply(self.quantity)
    }
}

/// A user's mutable shopping cart.
///
/// Lines are keyed by book: adding a book that is already present merges
/// into the existing line instead of creating a duplicate. The total is
/// recomputed inside every mutator, so it always equals the sum of the
/// line totals. Fields are private to keep that invariant the only path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    lines: Vec<CartLine>,
    total: Money,
    currency: CurrencyCode,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            total: Money::zero(),
            currency: CurrencyCode::default(),
            updated_at: Utc::now(),
        }
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the cart lines.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the cart total.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the cart currency.
    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Returns when the cart was last mutated.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns a line by its ID.
    pub fn line(&self, line_id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Returns the line holding a given book, if any.
    pub fn line_for_book(&self, book_id: BookId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.book_id == book_id)
    }

    /// Adds a quantity of a book to the cart.
    ///
    /// If a line for the book already exists its quantity is increased
    /// and the original price snapshot kept; otherwise a new line is
    /// appended with the supplied (current catalog) price.
    pub fn add_line(&mut self, book_id: BookId, quantity: u32, price: Price) {
        match self.lines.iter_mut().find(|l| l.book_id == book_id) {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(CartLine::new(book_id, quantity, price)),
        }
        self.recompute();
    }

    /// Sets the quantity of an existing line.
    ///
    /// Returns false if no line with the given ID exists.
    pub fn set_line_quantity(&mut self, line_id: CartLineId, quantity: u32) -> bool {
        let Some(line) = self.lines.iter_mut().find(|l| l.id == line_id) else {
            return false;
        };
        line.quantity = quantity;
        self.recompute();
        true
    }

    /// Removes a line from the cart.
    ///
    /// Returns false if no line with the given ID exists.
    pub fn remove_line(&mut self, line_id: CartLineId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        if self.lines.len() == before {
            return false;
        }
        self.recompute();
        true
    }

    /// Removes all lines; the total becomes zero.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.recompute();
    }

    fn recompute(&mut self) {
        self.total = self.lines.iter().map(CartLine::line_total).sum();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cart_has_zero_total() {
        let cart = Cart::empty(UserId::new());
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn add_line_recomputes_total() {
        let mut cart = Cart::empty(UserId::new());
        cart.add_line(BookId::new(), 2, Price::usd(1000));
        cart.add_line(BookId::new(), 1, Price::usd(500));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total().cents(), 2500);
    }

    #[test]
    fn adding_same_book_merges_into_existing_line() {
        let mut cart = Cart::empty(UserId::new());
        let book_id = BookId::new();

        cart.add_line(book_id, 2, Price::usd(1000));
        // Catalog price changed since the first add; the snapshot wins.
        cart.add_line(book_id, 3, Price::usd(9999));

        assert_eq!(cart.len(), 1);
        let line = cart.line_for_book(book_id).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.price, Price::usd(1000));
        assert_eq!(cart.total().cents(), 5000);
    }

    #[test]
    fn set_line_quantity_recomputes_total() {
        let mut cart = Cart::empty(UserId::new());
        cart.add_line(BookId::new(), 2, Price::usd(1000));
        let line_id = cart.lines()[0].id;

        assert!(cart.set_line_quantity(line_id, 5));
        assert_eq!(cart.total().cents(), 5000);
    }

    #[test]
    fn set_quantity_on_unknown_line_fails() {
        let mut cart = Cart::empty(UserId::new());
        assert!(!cart.set_line_quantity(CartLineId::new(), 3));
    }

    #[test]
    fn remove_line_recomputes_total() {
        let mut cart = Cart::empty(UserId::new());
        cart.add_line(BookId::new(), 2, Price::usd(1000));
        cart.add_line(BookId::new(), 1, Price::usd(500));
        let line_id = cart.lines()[0].id;

        assert!(cart.remove_line(line_id));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total().cents(), 500);

        assert!(!cart.remove_line(line_id));
    }

    #[test]
    fn clear_empties_lines_and_total() {
        let mut cart = Cart::empty(UserId::new());
        cart.add_line(BookId::new(), 4, Price::usd(250));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn total_matches_sum_of_line_totals_after_every_mutation() {
        let mut cart = Cart::empty(UserId::new());
        let a = BookId::new();
        let b = BookId::new();

        cart.add_line(a, 1, Price::usd(199));
        cart.add_line(b, 2, Price::usd(350));
        cart.add_line(a, 2, Price::usd(199));
        let expected: Money = cart.lines().iter().map(CartLine::line_total).sum();
        assert_eq!(cart.total(), expected);

        let line_id = cart.line_for_book(b).unwrap().id;
        cart.set_line_quantity(line_id, 7);
        let expected: Money = cart.lines().iter().map(CartLine::line_total).sum();
        assert_eq!(cart.total(), expected);
    }

    #[test]
    fn cart_serialization_roundtrip() {
        let mut cart = Cart::empty(UserId::new());
        cart.add_line(BookId::new(), 2, Price::usd(1250));

        let json = serde_json::to_string(&cart).unwrap();
        let deserialized: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(cart, deserialized);
    }
}
