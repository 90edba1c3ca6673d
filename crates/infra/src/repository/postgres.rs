//! Postgres-backed entity store implementation.
//!
//! Persists entities and association records in PostgreSQL, enforcing
//! referential integrity and association uniqueness at the database level.
//! The expected schema lives in `crates/infra/schema.sql`: `BIGSERIAL`
//! identities, composite primary keys on the join tables, and
//! `ON DELETE CASCADE` from both join tables to their entities.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `RepositoryError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError | Scenario |
//! |------------|----------------------|-----------------|----------|
//! | Database (unique violation) | `23505` | `Constraint` | Duplicate association insert raced past the conflict clause |
//! | Database (foreign key violation) | `23503` | `Constraint` | Referenced entity deleted concurrently |
//! | Database (check constraint violation) | `23514` | `Validation` | Invalid data (e.g. negative price) |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed / RowNotFound / Other | N/A | `Storage` | Pool closed, network failures, etc. |
//!
//! ## Thread Safety
//!
//! `PostgresStore` is `Send + Sync` and can be shared across tasks. Every
//! mutating operation runs in a single transaction, so each repository call
//! appears atomic to concurrent callers. Concurrent duplicate assignments of
//! the same pair resolve to exactly one row via the composite primary key and
//! `ON CONFLICT DO NOTHING`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use storefront_catalog::{Buyer, NewBuyer, NewProduct, Product};
use storefront_core::{BuyerId, CategoryId, ProductId};

use super::r#trait::{
    BuyerRepository, ProductBuyerRepository, ProductRepository, RepositoryError,
};

/// Postgres-backed repository over buyers, products, and their join tables.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    /// Create a new PostgresStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl BuyerRepository for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_buyers(&self) -> Result<Vec<Buyer>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, created_at
            FROM buyers
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_buyers", e))?;

        rows.iter()
            .map(|row| BuyerRow::from_row(row).map(Buyer::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::Storage(format!("failed to decode buyer row: {e}")))
    }

    #[instrument(skip(self), fields(buyer_id = %id), err)]
    async fn get_buyer(&self, id: BuyerId) -> Result<Buyer, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, created_at
            FROM buyers
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_buyer", e))?;

        match row {
            Some(row) => BuyerRow::from_row(&row)
                .map(Buyer::from)
                .map_err(|e| RepositoryError::Storage(format!("failed to decode buyer row: {e}"))),
            None => Err(RepositoryError::NotFound),
        }
    }

    #[instrument(skip(self), fields(buyer_id = %id), err)]
    async fn buyer_exists(&self, id: BuyerId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM buyers WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("buyer_exists", e))?;

        row.try_get::<bool, _>(0)
            .map_err(|e| RepositoryError::Storage(format!("failed to decode exists row: {e}")))
    }

    #[instrument(skip(self, new), err)]
    async fn create_buyer(&self, new: NewBuyer) -> Result<Buyer, RepositoryError> {
        new.validate()?;

        let row = sqlx::query(
            r#"
            INSERT INTO buyers (name, email)
            VALUES ($1, $2)
            RETURNING id, name, email, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_buyer", e))?;

        let buyer = BuyerRow::from_row(&row)
            .map(Buyer::from)
            .map_err(|e| RepositoryError::Storage(format!("failed to decode buyer row: {e}")))?;
        tracing::debug!(buyer_id = %buyer.id, "buyer created");
        Ok(buyer)
    }

    #[instrument(skip(self, buyer), fields(buyer_id = %buyer.id), err)]
    async fn update_buyer(&self, buyer: &Buyer) -> Result<(), RepositoryError> {
        buyer.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE buyers
            SET name = $2, email = $3
            WHERE id = $1
            "#,
        )
        .bind(buyer.id.get())
        .bind(&buyer.name)
        .bind(&buyer.email)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_buyer", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(buyer_id = %id), err)]
    async fn delete_buyer(&self, id: BuyerId) -> Result<bool, RepositoryError> {
        // Join rows go with the entity via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM buyers WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_buyer", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, product_ids), fields(buyer_id = %buyer_id, batch_size = product_ids.len()), err)]
    async fn assign_buyer_to_products(
        &self,
        buyer_id: BuyerId,
        product_ids: &[ProductId],
    ) -> Result<usize, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if !buyer_exists_tx(&mut tx, buyer_id).await? {
            return Err(RepositoryError::NotFound);
        }

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
        }

        check_products_exist_tx(&mut tx, product_ids).await?;

        let now = Utc::now();
        let mut created = 0usize;
        for pid in product_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO product_buyers (product_id, buyer_id, assigned_at)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(pid.get())
            .bind(buyer_id.get())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("assign_buyer_to_products", e))?;
            created += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        tracing::debug!(buyer_id = %buyer_id, requested = product_ids.len(), created, "buyer assigned to products");
        Ok(created)
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, created_at
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(|row| ProductRow::from_row(row).map(Product::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::Storage(format!("failed to decode product row: {e}")))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        match row {
            Some(row) => ProductRow::from_row(&row)
                .map(Product::from)
                .map_err(|e| {
                    RepositoryError::Storage(format!("failed to decode product row: {e}"))
                }),
            None => Err(RepositoryError::NotFound),
        }
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product_exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))?;

        row.try_get::<bool, _>(0)
            .map_err(|e| RepositoryError::Storage(format!("failed to decode exists row: {e}")))
    }

    #[instrument(skip(self, new), err)]
    async fn create_product(&self, new: NewProduct) -> Result<Product, RepositoryError> {
        new.validate()?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        let product = ProductRow::from_row(&row)
            .map(Product::from)
            .map_err(|e| RepositoryError::Storage(format!("failed to decode product row: {e}")))?;
        tracing::debug!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError> {
        product.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4
            WHERE id = $1
            "#,
        )
        .bind(product.id.get())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn categories_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CategoryId>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT category_id
            FROM product_categories
            WHERE product_id = $1
            ORDER BY category_id ASC
            "#,
        )
        .bind(product_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("categories_for_product", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("category_id")
                    .map(CategoryId::new)
                    .map_err(|e| {
                        RepositoryError::Storage(format!("failed to decode category row: {e}"))
                    })
            })
            .collect()
    }

    #[instrument(skip(self, category_ids), fields(product_id = %product_id, batch_size = category_ids.len()), err)]
    async fn assign_categories_to_product(
        &self,
        product_id: ProductId,
        category_ids: &[CategoryId],
    ) -> Result<usize, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id.get())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("assign_categories_to_product", e))?;
        let exists: bool = row
            .try_get(0)
            .map_err(|e| RepositoryError::Storage(format!("failed to decode exists row: {e}")))?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        if category_ids.is_empty() {
            return Err(RepositoryError::Validation(
                "category id list cannot be empty".to_string(),
            ));
        }
        for (idx, cid) in category_ids.iter().enumerate() {
            if !cid.is_positive() {
                return Err(RepositoryError::Validation(format!(
                    "category id must be positive, got {cid} (index {idx})"
                )));
            }
        }

        let mut created = 0usize;
        for cid in category_ids {
            let result = sqlx::query(
                r#"
                INSERT INTO product_categories (product_id, category_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(product_id.get())
            .bind(cid.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("assign_categories_to_product", e))?;
            created += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(created)
    }
}

#[async_trait]
impl ProductBuyerRepository for PostgresStore {
    #[instrument(skip(self), fields(buyer_id = %buyer_id), err)]
    async fn products_for_buyer(
        &self,
        buyer_id: BuyerId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.description, p.price, p.created_at
            FROM products p
            JOIN product_buyers pb ON pb.product_id = p.id
            WHERE pb.buyer_id = $1
            ORDER BY p.id ASC
            "#,
        )
        .bind(buyer_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_for_buyer", e))?;

        rows.iter()
            .map(|row| ProductRow::from_row(row).map(Product::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::Storage(format!("failed to decode product row: {e}")))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn buyers_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Buyer>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.name, b.email, b.created_at
            FROM buyers b
            JOIN product_buyers pb ON pb.buyer_id = b.id
            WHERE pb.product_id = $1
            ORDER BY b.id ASC
            "#,
        )
        .bind(product_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("buyers_for_product", e))?;

        rows.iter()
            .map(|row| BuyerRow::from_row(row).map(Buyer::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepositoryError::Storage(format!("failed to decode buyer row: {e}")))
    }

    #[instrument(skip(self), fields(buyer_id = %buyer_id, product_id = %product_id), err)]
    async fn assign_product_to_buyer(
        &self,
        buyer_id: BuyerId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        if !buyer_exists_tx(&mut tx, buyer_id).await? {
            return Err(RepositoryError::NotFound);
        }
        if !product_id.is_positive() {
            return Err(RepositoryError::Validation(format!(
                "product id must be positive, got {product_id}"
            )));
        }
        check_products_exist_tx(&mut tx, &[product_id]).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO product_buyers (product_id, buyer_id, assigned_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(product_id.get())
        .bind(buyer_id.get())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("assign_product_to_buyer", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(result.rows_affected() > 0)
    }
}

async fn buyer_exists_tx(
    tx: &mut Transaction<'_, Postgres>,
    buyer_id: BuyerId,
) -> Result<bool, RepositoryError> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM buyers WHERE id = $1)")
        .bind(buyer_id.get())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("buyer_exists", e))?;

    row.try_get::<bool, _>(0)
        .map_err(|e| RepositoryError::Storage(format!("failed to decode exists row: {e}")))
}

/// Verify every product id in the batch refers to a persisted product.
///
/// Runs inside the caller's transaction so validation and insertion see the
/// same snapshot; a failed check aborts the batch before anything is written.
async fn check_products_exist_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_ids: &[ProductId],
) -> Result<(), RepositoryError> {
    let ids: Vec<i64> = product_ids.iter().map(|p| p.get()).collect();
    let rows = sqlx::query("SELECT id FROM products WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("check_products_exist", e))?;

    let existing: HashSet<i64> = rows
        .iter()
        .map(|row| row.try_get::<i64, _>("id"))
        .collect::<Result<_, _>>()
        .map_err(|e| RepositoryError::Storage(format!("failed to decode id row: {e}")))?;

    for (idx, pid) in product_ids.iter().enumerate() {
        if !existing.contains(&pid.get()) {
            return Err(RepositoryError::Validation(format!(
                "unknown product id {pid} (index {idx})"
            )));
        }
    }
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    "23505" => RepositoryError::Constraint(msg),
                    "23503" => RepositoryError::Constraint(msg),
                    "23514" => RepositoryError::Validation(msg),
                    _ => RepositoryError::Storage(msg),
                }
            } else {
                RepositoryError::Storage(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            RepositoryError::Storage(format!("unexpected row not found in {operation}"))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

struct BuyerRow {
    id: i64,
    name: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for BuyerRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(BuyerRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<BuyerRow> for Buyer {
    fn from(row: BuyerRow) -> Self {
        Buyer {
            id: BuyerId::new(row.id),
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price: f64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for ProductRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            created_at: row.created_at,
        }
    }
}
