use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId};

/// Catalog entity: Product.
///
/// Association records (categories, buyers) are stored separately and loaded
/// explicitly through the repositories; the entity itself carries only its own
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a product (identity is assigned by the storage layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
}

impl NewProduct {
    /// Structural validation, re-run by the repositories as the last line of
    /// defense behind the transport layer.
    pub fn validate(&self) -> DomainResult<()> {
        validate_fields(&self.name, self.price)
    }
}

impl Product {
    /// Build the stored entity from a validated payload and a fresh identity.
    pub fn from_new(id: ProductId, new: NewProduct, created_at: DateTime<Utc>) -> DomainResult<Self> {
        new.validate()?;
        Ok(Self {
            id,
            name: new.name,
            description: new.description,
            price: new.price,
            created_at,
        })
    }

    /// Structural validation of an existing record (update path).
    pub fn validate(&self) -> DomainResult<()> {
        if !self.id.is_positive() {
            return Err(DomainError::invalid_id(format!(
                "ProductId: must be positive, got {}",
                self.id
            )));
        }
        validate_fields(&self.name, self.price)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_fields(name: &str, price: f64) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if !price.is_finite() {
        return Err(DomainError::validation("price must be a finite number"));
    }
    if price < 0.0 {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(())
}
