//! Join records between catalog entities.
//!
//! An association record is identified by the pair of entity identifiers it
//! references. Only the repositories create these, after checking that the
//! referenced entities exist; the records themselves do not self-validate.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{BuyerId, CategoryId, ProductId};

/// Association record: buyer has/ordered this product.
///
/// At most one record exists per (product_id, buyer_id) pair. Identity is the
/// pair; `assigned_at` is bookkeeping and does not participate in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductBuyer {
    pub product_id: ProductId,
    pub buyer_id: BuyerId,
    pub assigned_at: DateTime<Utc>,
}

impl ProductBuyer {
    pub fn new(product_id: ProductId, buyer_id: BuyerId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            product_id,
            buyer_id,
            assigned_at,
        }
    }

    /// The composite key this record is identified by.
    pub fn key(&self) -> (ProductId, BuyerId) {
        (self.product_id, self.buyer_id)
    }
}

impl PartialEq for ProductBuyer {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ProductBuyer {}

impl Hash for ProductBuyer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Association record: product belongs to this category.
///
/// The category side is an opaque identifier; the category entity itself is
/// managed outside this core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductCategory {
    pub product_id: ProductId,
    pub category_id: CategoryId,
}

impl ProductCategory {
    pub fn new(product_id: ProductId, category_id: CategoryId) -> Self {
        Self {
            product_id,
            category_id,
        }
    }
}
