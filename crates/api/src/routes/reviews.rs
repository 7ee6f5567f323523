//! Review endpoints, nested under books for listing and creation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{BookId, ReviewId};
use document_store::Review;
use domain::{NewReview, ReviewUpdate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::{AppState, Store};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub rating: u8,
    pub title: String,
    pub comment: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateReviewRequest {
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub rating: u8,
    pub title: String,
    pub comment: String,
    pub is_verified_purchase: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id.to_string(),
            user_id: review.user_id.to_string(),
            book_id: review.book_id.to_string(),
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            is_verified_purchase: review.is_verified_purchase,
            created_at: review.created_at.to_rfc3339(),
            updated_at: review.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// GET /books/:id/reviews — a book's reviews, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_book<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let reviews = state
        .reviews
        .list_reviews(BookId::from_uuid(book_id))
        .await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

/// POST /books/:id/reviews — submit a review.
#[tracing::instrument(skip(state, user, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(book_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let review = state
        .reviews
        .create_review(
            user.0.user_id,
            BookId::from_uuid(book_id),
            NewReview {
                rating: req.rating,
                title: req.title,
                comment: req.comment,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}

/// GET /reviews/:id — load a single review.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review = state.reviews.get_review(ReviewId::from_uuid(id)).await?;
    Ok(Json(review.into()))
}

/// PUT /reviews/:id — update a review (owner or admin).
#[tracing::instrument(skip(state, user, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review = state
        .reviews
        .update_review(
            &user.0,
            ReviewId::from_uuid(id),
            ReviewUpdate {
                rating: req.rating,
                title: req.title,
                comment: req.comment,
            },
        )
        .await?;
    Ok(Json(review.into()))
}

/// DELETE /reviews/:id — delete a review (owner or admin).
#[tracing::instrument(skip(state, user))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .reviews
        .delete_review(&user.0, ReviewId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
