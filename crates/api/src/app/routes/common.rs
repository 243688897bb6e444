use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use stockflow_core::{DomainError, Resource};
use stockflow_infra::ServiceResult;

use crate::app::errors;

/// Parse an id from the URL. Anything that is not a positive integer cannot
/// name an existing row, so it is reported as not found.
pub fn parse_id<T>(raw: &str, resource: Resource) -> Result<T, Response>
where
    T: FromStr,
{
    raw.parse()
        .map_err(|_| errors::domain_error_to_response(DomainError::not_found(resource)))
}

pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(errors::body_rejection_to_response)
}

pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub fn respond_deleted(result: ServiceResult<()>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
