//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage/rate-provider selection from config
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: query DTOs and response helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockflow_infra::InventoryService;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router around an already wired service.
pub fn build_app(jwt_secret: impl AsRef<[u8]>, service: InventoryService) -> Router {
    let jwt = Arc::new(stockflow_auth::Hs256JwtValidator::new(jwt_secret));
    let auth_state = middleware::AuthState { jwt };

    // Everything except the health check needs a valid bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(service)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
