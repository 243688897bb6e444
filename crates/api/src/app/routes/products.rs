use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
    routing::get,
};

use stockflow_auth::Action;
use stockflow_core::{ProductId, Resource};
use stockflow_infra::InventoryService;
use stockflow_products::ProductInput;

use crate::app::routes::common::{body, parse_id, respond, respond_deleted};
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product)
                .put(replace_product)
                .patch(patch_product)
                .delete(delete_product),
        )
}

pub async fn list_products(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListProductsQuery>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::ReadProducts) {
        return denied;
    }
    let available = match query.available() {
        Ok(available) => available,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(StatusCode::OK, service.list_products(available).await)
}

pub async fn get_product(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::ReadProducts) {
        return denied;
    }
    let id: ProductId = match parse_id(&id, Resource::Product) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.get_product(id).await)
}

pub async fn create_product(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteProducts) {
        return denied;
    }
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    respond(StatusCode::CREATED, service.create_product(input).await)
}

pub async fn replace_product(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteProducts) {
        return denied;
    }
    let id: ProductId = match parse_id(&id, Resource::Product) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.replace_product(id, input).await)
}

pub async fn patch_product(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteProducts) {
        return denied;
    }
    let id: ProductId = match parse_id(&id, Resource::Product) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let input = match body(payload) {
        Ok(input) => input,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, service.patch_product(id, input).await)
}

pub async fn delete_product(
    Extension(service): Extension<Arc<InventoryService>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authz::require(&principal, Action::WriteProducts) {
        return denied;
    }
    let id: ProductId = match parse_id(&id, Resource::Product) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond_deleted(service.delete_product(id).await)
}
