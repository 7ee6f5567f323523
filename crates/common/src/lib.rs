//! Shared vocabulary for the bookstore platform: typed identifiers,
//! money, and the caller identity model.

mod money;
mod types;

pub use money::{CurrencyCode, Money, Price};
pub use types::{BookId, CartLineId, OrderId, Principal, ReviewId, Role, UserId};
