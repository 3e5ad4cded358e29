//! REST routes: every method on `/<resource_type>[/<identifier>]` goes to the dispatcher.

use crate::error::AppError;
use crate::extractors::MAX_BODY_BYTES;
use crate::request::RestRequest;
use crate::response::RestResponse;
use crate::state::AppState;
use axum::{extract::State, routing::any, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

async fn dispatch(State(state): State<AppState>, request: RestRequest) -> Result<RestResponse, AppError> {
    state.dispatcher.dispatch(request).await
}

/// Catch-all REST router; nest it under a prefix such as `/rest`.
pub fn rest_routes(state: AppState) -> Router {
    Router::new()
        .route("/*path", any(dispatch))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
        .with_state(state)
}
