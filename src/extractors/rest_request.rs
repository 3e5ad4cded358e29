//! Build a [`RestRequest`] from an axum request.

use crate::error::AppError;
use crate::request::RestRequest;
use async_trait::async_trait;
use axum::extract::{FromRequest, Query, Request};
use serde_json::Value;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[async_trait]
impl<S> FromRequest<S> for RestRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .map_err(|e| AppError::BadRequest(format!("invalid query string: {}", e)))?;

        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| AppError::BadRequest(format!("unreadable body: {}", e)))?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(
                serde_json::from_slice::<Value>(&bytes)
                    .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?,
            )
        };

        Ok(RestRequest::new(parts.method, parts.uri.path())?
            .with_query(query)
            .with_headers(parts.headers)
            .with_body(body))
    }
}
