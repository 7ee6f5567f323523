//! Caller identity extraction.
//!
//! Token issuance and verification happen upstream; by the time a
//! request reaches this service the gateway has resolved the caller to
//! an id and role, passed along as headers:
//! - `x-user-id` — the caller's UUID (required on private routes)
//! - `x-user-role` — `admin` or `customer` (defaults to customer)

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Principal, Role, UserId};
use uuid::Uuid;

use crate::error::ApiError;

/// Extractor for the authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing x-user-id header".to_string()))?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid x-user-id header: {e}")))?;

        let role = match parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
        {
            Some("admin") => Role::Admin,
            _ => Role::Customer,
        };

        Ok(CurrentUser(Principal {
            user_id: UserId::from_uuid(user_id),
            role,
        }))
    }
}
