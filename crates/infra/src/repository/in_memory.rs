use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use storefront_catalog::{Buyer, NewBuyer, NewProduct, Product, ProductBuyer, ProductCategory};
use storefront_core::{BuyerId, CategoryId, ProductId};

use super::r#trait::{
    BuyerRepository, ProductBuyerRepository, ProductRepository, RepositoryError,
};

#[derive(Debug, Default)]
struct Tables {
    buyers: BTreeMap<BuyerId, Buyer>,
    products: BTreeMap<ProductId, Product>,
    product_buyers: HashMap<(ProductId, BuyerId), ProductBuyer>,
    product_categories: BTreeSet<ProductCategory>,
}

/// In-memory entity store.
///
/// Intended for tests/dev. One lock over all tables: every operation takes it
/// once and releases it before returning, so each operation is atomic with
/// respect to the others and check-then-insert for association records is
/// serialized. Identity sequences only ever move forward, so a deleted
/// identity is never handed out again within the process lifetime.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    next_buyer_id: AtomicI64,
    next_product_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, RepositoryError> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, RepositoryError> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    fn fresh_buyer_id(&self) -> BuyerId {
        BuyerId::new(self.next_buyer_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn fresh_product_id(&self) -> ProductId {
        ProductId::new(self.next_product_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Validate a batch of product identities against the current tables.
///
/// The whole batch is checked before anything is written: a partially invalid
/// input must create zero records.
fn check_product_batch(
    tables: &Tables,
    product_ids: &[ProductId],
) -> Result<(), RepositoryError> {
    if product_ids.is_empty() {
        return Err(RepositoryError::Validation(
            "product id list cannot be empty".to_string(),
        ));
    }
    for (idx, pid) in product_ids.iter().enumerate() {
        if !pid.is_positive() {
            return Err(RepositoryError::Validation(format!(
                "product id must be positive, got {pid} (index {idx})"
            )));
        }
        if !tables.products.contains_key(pid) {
            return Err(RepositoryError::Validation(format!(
                "unknown product id {pid} (index {idx})"
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl BuyerRepository for InMemoryStore {
    async fn list_buyers(&self) -> Result<Vec<Buyer>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables.buyers.values().cloned().collect())
    }

    async fn get_buyer(&self, id: BuyerId) -> Result<Buyer, RepositoryError> {
        let tables = self.read()?;
        tables
            .buyers
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn buyer_exists(&self, id: BuyerId) -> Result<bool, RepositoryError> {
        let tables = self.read()?;
        Ok(tables.buyers.contains_key(&id))
    }

    async fn create_buyer(&self, new: NewBuyer) -> Result<Buyer, RepositoryError> {
        let buyer = Buyer::from_new(self.fresh_buyer_id(), new, Utc::now())?;

        let mut tables = self.write()?;
        tables.buyers.insert(buyer.id, buyer.clone());
        tracing::debug!(buyer_id = %buyer.id, "buyer created");
        Ok(buyer)
    }

    async fn update_buyer(&self, buyer: &Buyer) -> Result<(), RepositoryError> {
        buyer.validate()?;

        let mut tables = self.write()?;
        if !tables.buyers.contains_key(&buyer.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.buyers.insert(buyer.id, buyer.clone());
        Ok(())
    }

    async fn delete_buyer(&self, id: BuyerId) -> Result<bool, RepositoryError> {
        let mut tables = self.write()?;
        if tables.buyers.remove(&id).is_none() {
            return Ok(false);
        }
        // Cascade: association records must not outlive the entity they reference.
        tables.product_buyers.retain(|(_, bid), _| *bid != id);
        tracing::debug!(buyer_id = %id, "buyer deleted");
        Ok(true)
    }

    async fn assign_buyer_to_products(
        &self,
        buyer_id: BuyerId,
        product_ids: &[ProductId],
    ) -> Result<usize, RepositoryError> {
        let mut tables = self.write()?;
        if !tables.buyers.contains_key(&buyer_id) {
            return Err(RepositoryError::NotFound);
        }
        check_product_batch(&tables, product_ids)?;

        let now = Utc::now();
        let mut created = 0;
        for pid in product_ids {
            tables
                .product_buyers
                .entry((*pid, buyer_id))
                .or_insert_with(|| {
                    created += 1;
                    ProductBuyer::new(*pid, buyer_id, now)
                });
        }
        tracing::debug!(buyer_id = %buyer_id, requested = product_ids.len(), created, "buyer assigned to products");
        Ok(created)
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let tables = self.read()?;
        tables
            .products
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn product_exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let tables = self.read()?;
        Ok(tables.products.contains_key(&id))
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, RepositoryError> {
        let product = Product::from_new(self.fresh_product_id(), new, Utc::now())?;

        let mut tables = self.write()?;
        tables.products.insert(product.id, product.clone());
        tracing::debug!(product_id = %product.id, "product created");
        Ok(product)
    }

    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError> {
        product.validate()?;

        let mut tables = self.write()?;
        if !tables.products.contains_key(&product.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.write()?;
        if tables.products.remove(&id).is_none() {
            return Ok(false);
        }
        tables.product_buyers.retain(|(pid, _), _| *pid != id);
        tables.product_categories.retain(|pc| pc.product_id != id);
        tracing::debug!(product_id = %id, "product deleted");
        Ok(true)
    }

    async fn categories_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables
            .product_categories
            .iter()
            .filter(|pc| pc.product_id == product_id)
            .map(|pc| pc.category_id)
            .collect())
    }

    async fn assign_categories_to_product(
        &self,
        product_id: ProductId,
        category_ids: &[CategoryId],
    ) -> Result<usize, RepositoryError> {
        let mut tables = self.write()?;
        if !tables.products.contains_key(&product_id) {
            return Err(RepositoryError::NotFound);
        }
        if category_ids.is_empty() {
            return Err(RepositoryError::Validation(
                "category id list cannot be empty".to_string(),
            ));
        }
        // Categories are opaque identities: positivity is the only check.
        for (idx, cid) in category_ids.iter().enumerate() {
            if !cid.is_positive() {
                return Err(RepositoryError::Validation(format!(
                    "category id must be positive, got {cid} (index {idx})"
                )));
            }
        }

        let mut created = 0;
        for cid in category_ids {
            if tables
                .product_categories
                .insert(ProductCategory::new(product_id, *cid))
            {
                created += 1;
            }
        }
        tracing::debug!(product_id = %product_id, requested = category_ids.len(), created, "product assigned to categories");
        Ok(created)
    }
}

#[async_trait]
impl ProductBuyerRepository for InMemoryStore {
    async fn products_for_buyer(
        &self,
        buyer_id: BuyerId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.read()?;
        let mut ids: Vec<ProductId> = tables
            .product_buyers
            .keys()
            .filter(|(_, bid)| *bid == buyer_id)
            .map(|(pid, _)| *pid)
            .collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .filter_map(|pid| tables.products.get(&pid).cloned())
            .collect())
    }

    async fn buyers_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Buyer>, RepositoryError> {
        let tables = self.read()?;
        let mut ids: Vec<BuyerId> = tables
            .product_buyers
            .keys()
            .filter(|(pid, _)| *pid == product_id)
            .map(|(_, bid)| *bid)
            .collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .filter_map(|bid| tables.buyers.get(&bid).cloned())
            .collect())
    }

    async fn assign_product_to_buyer(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.write()?;
        if !tables.buyers.contains_key(&buyer_id) {
            return Err(RepositoryError::NotFound);
        }
        if !product_id.is_positive() {
            return Err(RepositoryError::Validation(format!(
                "product id must be positive, got {product_id}"
            )));
        }
        if !tables.products.contains_key(&product_id) {
            return Err(RepositoryError::Validation(format!(
                "unknown product id {product_id}"
            )));
        }

        let now = Utc::now();
        let mut created = false;
        tables
            .product_buyers
            .entry((product_id, buyer_id))
            .or_insert_with(|| {
                created = true;
                ProductBuyer::new(product_id, buyer_id, now)
            });
        Ok(created)
    }
}
