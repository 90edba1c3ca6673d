//! Infrastructure layer: repository contracts and storage backends.

pub mod repository;

#[cfg(test)]
mod integration_tests;

pub use repository::{
    BuyerRepository, InMemoryStore, PostgresStore, ProductBuyerRepository, ProductRepository,
    RepositoryError,
};
