use axum::{Extension, Json, http::StatusCode};

use crate::app::dto::WhoAmIResponse;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        principal_id: principal.principal_id().to_string(),
        roles: principal.roles().iter().map(|r| r.as_str().to_string()).collect(),
    })
}
