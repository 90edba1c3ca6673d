use serde::Deserialize;

use storefront_catalog::{Buyer, Product};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateBuyerRequest {
    pub name: String,
    pub email: Option<String>,
}

/// Partial update: `None` keeps the stored value. The handler merges onto the
/// loaded record and the repository replaces it wholesale.
#[derive(Debug, Deserialize)]
pub struct UpdateBuyerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

// -------------------------
// JSON mapping helpers
// -------------------------
//
// Each field mapping is an explicit statement; the wire shape is decoupled
// from the stored shape on purpose.

pub fn buyer_to_json(buyer: &Buyer) -> serde_json::Value {
    serde_json::json!({
        "id": buyer.id.get(),
        "name": buyer.name,
        "email": buyer.email,
        "created_at": buyer.created_at.to_rfc3339(),
    })
}

pub fn product_to_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id.get(),
        "name": product.name,
        "description": product.description,
        "price": product.price,
        "created_at": product.created_at.to_rfc3339(),
    })
}
