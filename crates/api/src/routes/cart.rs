//! Cart endpoints. All routes act on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{BookId, CartLineId};
use document_store::Cart;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::{AppState, Store};

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub book_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub id: String,
    pub book_id: String,
    pub quantity: u32,
    pub price_cents: i64,
    pub currency: String,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub total_cents: i64,
    pub currency: String,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            total_cents: cart.total().cents(),
            currency: cart.currency().to_string(),
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineResponse {
                    id: line.id.to_string(),
                    book_id: line.book_id.to_string(),
                    quantity: line.quantity,
                    price_cents: line.price.amount.cents(),
                    currency: line.price.currency.to_string(),
                    line_total_cents: line.line_total().cents(),
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// GET /cart — the caller's cart, created lazily.
#[tracing::instrument(skip(state, user))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get_cart(user.0.user_id).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/items — add a book to the cart.
#[tracing::instrument(skip(state, user, req))]
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .add_item(user.0.user_id, BookId::from_uuid(req.book_id), req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// PUT /cart/items/:id — set a line's quantity.
#[tracing::instrument(skip(state, user, req))]
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(line_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .update_item(
            user.0.user_id,
            CartLineId::from_uuid(line_id),
            req.quantity,
        )
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/:id — remove a line.
#[tracing::instrument(skip(state, user))]
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(line_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .carts
        .remove_item(user.0.user_id, CartLineId::from_uuid(line_id))
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart — empty the cart.
#[tracing::instrument(skip(state, user))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.clear(user.0.user_id).await?;
    Ok(Json(cart.into()))
}
