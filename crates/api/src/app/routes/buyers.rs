use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_catalog::NewBuyer;
use storefront_core::{BuyerId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_buyers).post(create_buyer))
        .route("/:id", get(get_buyer).put(update_buyer).delete(delete_buyer))
        .route("/:id/products", post(assign_products))
}

pub async fn list_buyers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.buyers.list_buyers().await {
        Ok(buyers) => {
            let items = buyers.iter().map(dto::buyer_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BuyerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services.buyers.get_buyer(id).await {
        Ok(buyer) => (StatusCode::OK, Json(dto::buyer_to_json(&buyer))).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateBuyerRequest>,
) -> axum::response::Response {
    let new = NewBuyer {
        name: body.name,
        email: body.email,
    };

    match services.buyers.create_buyer(new).await {
        Ok(buyer) => (StatusCode::CREATED, Json(dto::buyer_to_json(&buyer))).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn update_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateBuyerRequest>,
) -> axum::response::Response {
    let id: BuyerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    // Merge here; the repository replaces the record wholesale.
    let mut buyer = match services.buyers.get_buyer(id).await {
        Ok(b) => b,
        Err(e) => return errors::repository_error_to_response(e),
    };
    if let Some(name) = body.name {
        buyer.name = name;
    }
    if let Some(email) = body.email {
        buyer.email = Some(email);
    }

    match services.buyers.update_buyer(&buyer).await {
        Ok(()) => (StatusCode::OK, Json(dto::buyer_to_json(&buyer))).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn delete_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BuyerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services.buyers.delete_buyer(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "buyer not found"),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn assign_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(product_ids): Json<Vec<i64>>,
) -> axum::response::Response {
    let id: BuyerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    let product_ids: Vec<ProductId> = product_ids.into_iter().map(ProductId::new).collect();

    match services
        .buyers
        .assign_buyer_to_products(id, &product_ids)
        .await
    {
        Ok(created) => {
            (StatusCode::OK, Json(serde_json::json!({ "assigned": created }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}
