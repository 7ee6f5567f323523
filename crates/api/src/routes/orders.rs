//! Order endpoints: placement, reads, payment, and status updates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, OrderId};
use document_store::{Order, PaymentReceipt, ShippingAddress};
use domain::PlaceOrder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::{AppState, Store};

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub tax_amount_cents: i64,
    #[serde(default)]
    pub shipping_amount_cents: i64,
}

#[derive(Deserialize)]
pub struct MarkPaidRequest {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default)]
    pub email_address: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub book_id: String,
    pub title: String,
    pub quantity: u32,
    pub price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    pub lines: Vec<OrderLineResponse>,
    pub total_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub grand_total_cents: i64,
    pub currency: String,
    pub payment_method: String,
    pub is_paid: bool,
    pub paid_at: Option<String>,
    pub is_delivered: bool,
    pub delivered_at: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id().to_string(),
            status: order.status().to_string(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    book_id: line.book_id.to_string(),
                    title: line.title.clone(),
                    quantity: line.quantity,
                    price_cents: line.price.amount.cents(),
                    line_total_cents: line.line_total().cents(),
                })
                .collect(),
            total_cents: order.total_amount().cents(),
            tax_cents: order.tax_amount().cents(),
            shipping_cents: order.shipping_amount().cents(),
            grand_total_cents: order.grand_total().cents(),
            currency: order.currency().to_string(),
            payment_method: order.payment_method().to_string(),
            is_paid: order.is_paid(),
            paid_at: order.paid_at().map(|t| t.to_rfc3339()),
            is_delivered: order.is_delivered(),
            delivered_at: order.delivered_at().map(|t| t.to_rfc3339()),
            tracking_number: order.tracking_number().map(String::from),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — convert the caller's cart into an order.
#[tracing::instrument(skip(state, user, req))]
pub async fn place<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let payment_method = req.payment_method.parse().map_err(ApiError::BadRequest)?;

    let request = PlaceOrder::new(req.shipping_address, payment_method)
        .with_tax_amount(Money::from_cents(req.tax_amount_cents))
        .with_shipping_amount(Money::from_cents(req.shipping_amount_cents));

    let order = state.checkout.place_order(user.0.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — the caller's orders, newest first.
#[tracing::instrument(skip(state, user))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.checkout.list_orders(user.0.user_id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id — load an order (owner or admin).
#[tracing::instrument(skip(state, user))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .checkout
        .get_order(&user.0, OrderId::from_uuid(id))
        .await?;
    Ok(Json(order.into()))
}

/// PUT /orders/:id/pay — record a payment (owner or admin).
#[tracing::instrument(skip(state, user, req))]
pub async fn pay<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<MarkPaidRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let receipt = PaymentReceipt {
        id: req.id,
        status: req.status,
        update_time: req.update_time,
        email_address: req.email_address,
    };

    let order = state
        .checkout
        .mark_paid(&user.0, OrderId::from_uuid(id), receipt)
        .await?;
    Ok(Json(order.into()))
}

/// PUT /orders/:id/status — set the order status (admin).
#[tracing::instrument(skip(state, user, req))]
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status = req.status.parse().map_err(ApiError::BadRequest)?;

    let order = state
        .checkout
        .update_status(&user.0, OrderId::from_uuid(id), status)
        .await?;
    Ok(Json(order.into()))
}
