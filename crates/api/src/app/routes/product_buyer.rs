use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_core::{BuyerId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/products/:buyer_id", get(products_for_buyer))
        .route("/buyers/:product_id", get(buyers_for_product))
        .route("/:buyer_id/products", post(assign_product))
}

/// Products associated with a buyer. An unknown buyer yields an empty list;
/// callers that need to distinguish check `GET /buyers/:id` first.
pub async fn products_for_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(buyer_id): Path<String>,
) -> axum::response::Response {
    let buyer_id: BuyerId = match buyer_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services.associations.products_for_buyer(buyer_id).await {
        Ok(products) => {
            let items = products.iter().map(dto::product_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn buyers_for_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match product_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services.associations.buyers_for_product(product_id).await {
        Ok(buyers) => {
            let items = buyers.iter().map(dto::buyer_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}

/// Assign a single product to a buyer. Idempotent: `created` reports whether
/// a record was actually made.
pub async fn assign_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(buyer_id): Path<String>,
    Json(product_id): Json<i64>,
) -> axum::response::Response {
    let buyer_id: BuyerId = match buyer_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services
        .associations
        .assign_product_to_buyer(buyer_id, ProductId::new(product_id))
        .await
    {
        Ok(created) => {
            (StatusCode::OK, Json(serde_json::json!({ "created": created }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}
