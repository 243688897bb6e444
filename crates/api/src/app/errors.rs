use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stockflow_core::DomainError;
use stockflow_infra::ServiceError;

/// Map a service failure to its HTTP response.
///
/// Field errors keep the `{"field": ["message"]}` shape; every other failure
/// uses the `{ok, code, message}` envelope.
pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Rate(e) => {
            tracing::error!(error = %e, "exchange rate lookup failed");
            json_error(StatusCode::BAD_GATEWAY, "exchange_rate_unavailable", e.to_string())
        }
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error.",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(fields) => (StatusCode::BAD_REQUEST, Json(fields)).into_response(),
        DomainError::Rule(rule) => json_error(StatusCode::BAD_REQUEST, rule.code(), rule.message()),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(resource) => {
            json_error(StatusCode::NOT_FOUND, "not_found", resource.not_found_message())
        }
    }
}

/// Bodies that are not valid JSON for the expected shape.
pub fn body_rejection_to_response(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "parse_error", rejection.body_text())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "ok": false,
            "code": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
