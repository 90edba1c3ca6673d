use axum::Router;

pub mod buyers;
pub mod product_buyer;
pub mod products;
pub mod system;

/// Router for all resource endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/buyers", buyers::router())
        .nest("/products", products::router())
        .nest("/product-buyer", product_buyer::router())
}
