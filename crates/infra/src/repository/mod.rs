//! Repository boundary over the persisted entity store.
//!
//! This module defines storage-agnostic contracts for entities and their join
//! associations, plus two backends: an in-memory store (tests/dev) and a
//! Postgres store (production). The contracts are where existence, uniqueness,
//! and idempotency rules are enforced; nothing outside this module creates
//! association records.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{
    BuyerRepository, ProductBuyerRepository, ProductRepository, RepositoryError,
};
