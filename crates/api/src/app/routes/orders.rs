use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use stockflow_auth::Action;
use stockflow_core::{OrderId, Resource};
use stockflow_infra::InventoryService;
use stockflow_orders::OrderInput;

use crate::app::routes::common::{body, parse_id, respond, respond_deleted};
use crate::authz;
use crate::context::PrincipalContext;

/// Orders are created, read, deleted and moved through their lifecycle;
/// there is no direct update.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order).delete(delete_order))
        .route("/:id/process", post(process_order))
        .route("/:id/cancel", post(cancel_order))
}

pub async fn list_orders(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::ReadOrders) {
        return denied;
    }
    respond(StatusCode::OK, service.list_orders().await)
}

pub async fn create_order(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<OrderInput>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    respond(StatusCode::CREATED, service.create_order(input).await)
}

pub async fn get_order(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::ReadOrders) {
        return denied;
    }
    let id: OrderId = match parse_id(&id, Resource::Order) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.get_order(id).await)
}

pub async fn delete_order(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let id: OrderId = match parse_id(&id, Resource::Order) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond_deleted(service.delete_order(id).await)
}

pub async fn process_order(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let id: OrderId = match parse_id(&id, Resource::Order) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.process_order(id).await)
}

pub async fn cancel_order(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let id: OrderId = match parse_id(&id, Resource::Order) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.cancel_order(id).await)
}
