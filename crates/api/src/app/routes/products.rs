use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_catalog::NewProduct;
use storefront_core::{CategoryId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/categories", get(list_categories).post(assign_categories))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.list_products().await {
        Ok(products) => {
            let items = products.iter().map(dto::product_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services.products.get_product(id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let new = NewProduct {
        name: body.name,
        description: body.description,
        price: body.price,
    };

    match services.products.create_product(new).await {
        Ok(product) => {
            (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    let mut product = match services.products.get_product(id).await {
        Ok(p) => p,
        Err(e) => return errors::repository_error_to_response(e),
    };
    if let Some(name) = body.name {
        product.name = name;
    }
    if let Some(description) = body.description {
        product.description = description;
    }
    if let Some(price) = body.price {
        product.price = price;
    }

    match services.products.update_product(&product).await {
        Ok(()) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services.products.delete_product(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    match services.products.categories_for_product(id).await {
        Ok(categories) => {
            let items = categories.iter().map(|c| c.get()).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn assign_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(category_ids): Json<Vec<i64>>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id_response(e),
    };

    let category_ids: Vec<CategoryId> = category_ids.into_iter().map(CategoryId::new).collect();

    match services
        .products
        .assign_categories_to_product(id, &category_ids)
        .await
    {
        Ok(created) => {
            (StatusCode::OK, Json(serde_json::json!({ "assigned": created }))).into_response()
        }
        Err(e) => errors::repository_error_to_response(e),
    }
}
