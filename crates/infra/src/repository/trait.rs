use async_trait::async_trait;
use thiserror::Error;

use storefront_catalog::{Buyer, NewBuyer, NewProduct, Product};
use storefront_core::{BuyerId, CategoryId, DomainError, ProductId};

/// Repository operation error.
///
/// `Validation`, `NotFound`, and `Constraint` are deterministic outcomes the
/// caller is expected to handle; `Storage` covers transient backend failures
/// (connectivity, contention), which are never retried inside this layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DomainError> for RepositoryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound,
            DomainError::ConstraintViolation(msg) => Self::Constraint(msg),
        }
    }
}

/// CRUD + batch assignment over buyers.
///
/// Implementations must make every operation appear atomic to concurrent
/// callers, and must keep `buyer_exists` consistent with `get_buyer` at any
/// single point in time.
#[async_trait]
pub trait BuyerRepository: Send + Sync {
    /// All buyers, ordered by identity (stable). No side effects.
    async fn list_buyers(&self) -> Result<Vec<Buyer>, RepositoryError>;

    /// The buyer with the given identity, or `NotFound`.
    async fn get_buyer(&self, id: BuyerId) -> Result<Buyer, RepositoryError>;

    /// Whether the identity currently refers to a persisted buyer.
    async fn buyer_exists(&self, id: BuyerId) -> Result<bool, RepositoryError>;

    /// Validate, assign a fresh unique identity, persist, and return the
    /// stored entity. Identities are never reused within a process lifetime.
    async fn create_buyer(&self, new: NewBuyer) -> Result<Buyer, RepositoryError>;

    /// Replace the stored record wholesale. Field-by-field merging is the
    /// transport layer's job. `NotFound` if the identity is unknown.
    async fn update_buyer(&self, buyer: &Buyer) -> Result<(), RepositoryError>;

    /// Remove the buyer and (cascade) its association records. `Ok(false)` if
    /// the identity is unknown; never panics.
    async fn delete_buyer(&self, id: BuyerId) -> Result<bool, RepositoryError>;

    /// Create one association record per product that does not already have
    /// one for this buyer; existing pairs are left untouched. Returns the
    /// number of records actually created.
    ///
    /// `NotFound` if the buyer is unknown. `Validation` if the list is empty
    /// or contains a non-positive or unknown product identity — the batch is
    /// all-or-nothing, so a partially invalid input creates zero records.
    async fn assign_buyer_to_products(
        &self,
        buyer_id: BuyerId,
        product_ids: &[ProductId],
    ) -> Result<usize, RepositoryError>;
}

/// CRUD + category assignment over products.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Product, RepositoryError>;

    async fn product_exists(&self, id: ProductId) -> Result<bool, RepositoryError>;

    async fn create_product(&self, new: NewProduct) -> Result<Product, RepositoryError>;

    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError>;

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Category identities this product is associated with, ordered.
    async fn categories_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CategoryId>, RepositoryError>;

    /// Batch category assignment with the same semantics as
    /// [`BuyerRepository::assign_buyer_to_products`]: idempotent,
    /// all-or-nothing, `NotFound` for an unknown product. The category side
    /// is an opaque identity, so only positivity is checked for it.
    async fn assign_categories_to_product(
        &self,
        product_id: ProductId,
        category_ids: &[CategoryId],
    ) -> Result<usize, RepositoryError>;
}

/// Queries and single assignment over the buyer–product join, in both
/// directions.
///
/// An association record is either absent or present; the only transition is
/// absent→present, and re-assigning a present pair is a no-op rather than an
/// error or a duplicate.
#[async_trait]
pub trait ProductBuyerRepository: Send + Sync {
    /// Products associated with the buyer, ordered by identity. Empty for an
    /// unknown buyer as well as for a buyer with no products; callers that
    /// need to tell these apart check existence separately.
    async fn products_for_buyer(
        &self,
        buyer_id: BuyerId,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Buyers associated with the product, ordered by identity.
    async fn buyers_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Buyer>, RepositoryError>;

    /// Create the association if absent. Returns `Ok(true)` when a record was
    /// created, `Ok(false)` when the pair already existed. `NotFound` for an
    /// unknown buyer, `Validation` for a non-positive or unknown product.
    async fn assign_product_to_buyer(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;
}
