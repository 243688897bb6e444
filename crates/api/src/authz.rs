//! Authorization guard for handlers.
//!
//! Handlers call [`require`] before touching the service, so the policy in
//! `stockflow_auth` stays the single source of truth for who may do what.

use axum::http::StatusCode;
use axum::response::Response;

use stockflow_auth::{Action, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

pub fn require(principal: &PrincipalContext, action: Action) -> Result<(), Response> {
    authorize(principal.principal(), action).map_err(|e| {
        tracing::info!(
            principal_id = %principal.principal_id(),
            action = action.as_str(),
            "request denied by policy"
        );
        errors::json_error(StatusCode::FORBIDDEN, "permission_denied", e.to_string())
    })
}
