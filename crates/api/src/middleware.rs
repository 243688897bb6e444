use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use stockflow_auth::JwtValidator;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Rejects requests without a valid bearer token and attaches the caller's
/// [`PrincipalContext`] to the rest.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(message) => return unauthorized(message),
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return unauthorized("Given token not valid for any token type");
        }
    };

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub, claims.roles));

    next.run(req).await
}

fn unauthorized(message: &'static str) -> Response {
    errors::json_error(StatusCode::UNAUTHORIZED, "not_authenticated", message)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, &'static str> {
    const MISSING: &str = "Authentication credentials were not provided.";

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(MISSING)?;

    let header = header.to_str().map_err(|_| MISSING)?;

    let token = header.strip_prefix("Bearer ").ok_or(MISSING)?.trim();
    if token.is_empty() {
        return Err(MISSING);
    }

    Ok(token)
}
