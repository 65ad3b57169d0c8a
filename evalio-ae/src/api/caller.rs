//! Caller identity extractor
//!
//! Authentication happens at the gateway, which forwards the authenticated
//! user id in `X-Evalio-User`. Handlers taking `CallerId` reject requests
//! without it.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the authenticated user id
pub const USER_HEADER: &str = "x-evalio-user";

/// Authenticated user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing authenticated user".to_string()))?;

        Ok(CallerId(user_id.to_string()))
    }
}
