//! Details nested under their order: `/orders/:id/order-details[/:detail_id]`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::get,
};

use stockflow_auth::Action;
use stockflow_core::{OrderDetailId, OrderId, Resource};
use stockflow_infra::InventoryService;
use stockflow_orders::DetailInput;

use crate::app::routes::common::{body, parse_id, respond, respond_deleted};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/:id/order-details", get(list_details).post(create_detail))
        .route(
            "/:id/order-details/:detail_id",
            get(get_detail)
                .put(replace_detail)
                .patch(patch_detail)
                .delete(delete_detail),
        )
}

fn ids(order_id: &str, detail_id: &str) -> Result<(OrderId, OrderDetailId), Response> {
    Ok((
        parse_id(order_id, Resource::Order)?,
        parse_id(detail_id, Resource::OrderDetail)?,
    ))
}

pub async fn list_details(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(order_id): Path<String>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::ReadOrders) {
        return denied;
    }
    let order_id: OrderId = match parse_id(&order_id, Resource::Order) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.list_details(order_id).await)
}

pub async fn create_detail(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(order_id): Path<String>,
    payload: Result<Json<DetailInput>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let order_id: OrderId = match parse_id(&order_id, Resource::Order) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    respond(StatusCode::CREATED, service.create_detail(order_id, input).await)
}

pub async fn get_detail(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((order_id, detail_id)): Path<(String, String)>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::ReadOrders) {
        return denied;
    }
    let (order_id, detail_id) = match ids(&order_id, &detail_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.get_detail(order_id, detail_id).await)
}

pub async fn replace_detail(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((order_id, detail_id)): Path<(String, String)>,
    payload: Result<Json<DetailInput>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let (order_id, detail_id) = match ids(&order_id, &detail_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        service.replace_detail(order_id, detail_id, input).await,
    )
}

pub async fn patch_detail(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((order_id, detail_id)): Path<(String, String)>,
    payload: Result<Json<DetailInput>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let (order_id, detail_id) = match ids(&order_id, &detail_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        service.patch_detail(order_id, detail_id, input).await,
    )
}

pub async fn delete_detail(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((order_id, detail_id)): Path<(String, String)>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteOrders) {
        return denied;
    }
    let (order_id, detail_id) = match ids(&order_id, &detail_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    respond_deleted(service.delete_detail(order_id, detail_id).await)
}
