//! Repository wiring for the HTTP layer.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use storefront_infra::{
    BuyerRepository, InMemoryStore, PostgresStore, ProductBuyerRepository, ProductRepository,
};

/// The repository set handlers work against.
///
/// Handlers never see a concrete backend; both stores implement all three
/// contracts, so the same router serves tests (in-memory) and production
/// (Postgres).
pub struct AppServices {
    pub buyers: Arc<dyn BuyerRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub associations: Arc<dyn ProductBuyerRepository>,
}

impl AppServices {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            buyers: store.clone(),
            products: store.clone(),
            associations: store,
        }
    }

    pub fn postgres(store: PostgresStore) -> Self {
        let store = Arc::new(store);
        Self {
            buyers: store.clone(),
            products: store.clone(),
            associations: store,
        }
    }
}

/// Select the storage backend from the environment.
///
/// `DATABASE_URL` set and reachable → Postgres; otherwise the in-memory
/// store (dev/test), with a logged fallback on connection failure.
pub async fn build_services() -> AppServices {
    match std::env::var("DATABASE_URL") {
        Ok(url) => match PgPoolOptions::new().max_connections(8).connect(&url).await {
            Ok(pool) => {
                tracing::info!("using postgres store");
                AppServices::postgres(PostgresStore::new(pool))
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to connect to postgres; falling back to in-memory store");
                AppServices::in_memory()
            }
        },
        Err(_) => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            AppServices::in_memory()
        }
    }
}
