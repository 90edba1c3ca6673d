//! Integration tests for the repository layer over the in-memory backend.
//!
//! Exercises the full contract surface: CRUD, existence checks, batch and
//! single assignment, idempotency, all-or-nothing batches, and cascade on
//! entity deletion.

use std::sync::Arc;

use storefront_catalog::{NewBuyer, NewProduct};
use storefront_core::{BuyerId, CategoryId, ProductId};

use crate::repository::in_memory::InMemoryStore;
use crate::repository::r#trait::{
    BuyerRepository, ProductBuyerRepository, ProductRepository, RepositoryError,
};

fn new_buyer(name: &str) -> NewBuyer {
    NewBuyer {
        name: name.to_string(),
        email: None,
    }
}

fn new_product(name: &str, price: f64) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: String::new(),
        price,
    }
}

#[tokio::test]
async fn create_then_get_returns_equal_fields_and_fresh_id() {
    let store = InMemoryStore::new();

    let created = store
        .create_buyer(NewBuyer {
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
        })
        .await
        .unwrap();
    assert!(created.id.is_positive());

    let fetched = store.get_buyer(created.id).await.unwrap();
    assert_eq!(fetched, created);

    let second = store.create_buyer(new_buyer("Grace")).await.unwrap();
    assert_ne!(second.id, created.id);
}

#[tokio::test]
async fn identities_are_not_reused_after_deletion() {
    let store = InMemoryStore::new();

    let first = store.create_buyer(new_buyer("Ada")).await.unwrap();
    assert!(store.delete_buyer(first.id).await.unwrap());

    let second = store.create_buyer(new_buyer("Grace")).await.unwrap();
    assert!(second.id > first.id);
}

#[tokio::test]
async fn exists_is_consistent_with_get() {
    let store = InMemoryStore::new();
    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();

    assert!(store.buyer_exists(buyer.id).await.unwrap());
    assert!(store.get_buyer(buyer.id).await.is_ok());

    assert!(store.delete_buyer(buyer.id).await.unwrap());
    assert!(!store.buyer_exists(buyer.id).await.unwrap());
    assert!(matches!(
        store.get_buyer(buyer.id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn update_replaces_the_record_wholesale() {
    let store = InMemoryStore::new();
    let mut buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();

    buyer.name = "Ada Lovelace".to_string();
    buyer.email = Some("ada@example.com".to_string());
    store.update_buyer(&buyer).await.unwrap();

    let fetched = store.get_buyer(buyer.id).await.unwrap();
    assert_eq!(fetched, buyer);
}

#[tokio::test]
async fn update_of_unknown_buyer_is_not_found() {
    let store = InMemoryStore::new();
    let mut buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();
    store.delete_buyer(buyer.id).await.unwrap();

    buyer.name = "Ghost".to_string();
    assert!(matches!(
        store.update_buyer(&buyer).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
async fn deleting_an_unknown_buyer_returns_false_not_an_error() {
    let store = InMemoryStore::new();
    assert!(!store.delete_buyer(BuyerId::new(999)).await.unwrap());
}

#[tokio::test]
async fn list_buyers_is_ordered_by_id() {
    let store = InMemoryStore::new();
    let a = store.create_buyer(new_buyer("A")).await.unwrap();
    let b = store.create_buyer(new_buyer("B")).await.unwrap();
    let c = store.create_buyer(new_buyer("C")).await.unwrap();

    let ids: Vec<BuyerId> = store
        .list_buyers()
        .await
        .unwrap()
        .into_iter()
        .map(|x| x.id)
        .collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);
}

#[tokio::test]
async fn double_assignment_of_one_pair_yields_exactly_one_record() {
    let store = InMemoryStore::new();
    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();
    let product = store
        .create_product(new_product("Widget", 9.99))
        .await
        .unwrap();

    assert!(store
        .assign_product_to_buyer(buyer.id, product.id)
        .await
        .unwrap());
    // Second call is a no-op, not an error.
    assert!(!store
        .assign_product_to_buyer(buyer.id, product.id)
        .await
        .unwrap());

    let products = store.products_for_buyer(buyer.id).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, product.id);
}

#[tokio::test]
async fn assign_for_unknown_buyer_fails_and_creates_nothing() {
    let store = InMemoryStore::new();
    let product = store
        .create_product(new_product("Widget", 9.99))
        .await
        .unwrap();

    let unknown = BuyerId::new(999);
    assert!(matches!(
        store
            .assign_buyer_to_products(unknown, &[product.id])
            .await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        store.assign_product_to_buyer(unknown, product.id).await,
        Err(RepositoryError::NotFound)
    ));

    assert!(store.products_for_buyer(unknown).await.unwrap().is_empty());
    assert!(store
        .buyers_for_product(product.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn empty_batch_fails_validation_and_creates_nothing() {
    let store = InMemoryStore::new();
    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();

    assert!(matches!(
        store.assign_buyer_to_products(buyer.id, &[]).await,
        Err(RepositoryError::Validation(_))
    ));
    assert!(store.products_for_buyer(buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn partially_invalid_batch_creates_zero_records() {
    let store = InMemoryStore::new();
    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();
    let product = store
        .create_product(new_product("Widget", 9.99))
        .await
        .unwrap();

    // One valid id, one unknown: all-or-nothing means neither is applied.
    let err = store
        .assign_buyer_to_products(buyer.id, &[product.id, ProductId::new(424242)])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation(_)));
    assert!(store.products_for_buyer(buyer.id).await.unwrap().is_empty());

    // Same for a non-positive id.
    let err = store
        .assign_buyer_to_products(buyer.id, &[product.id, ProductId::new(0)])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation(_)));
    assert!(store.products_for_buyer(buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn n_distinct_assignments_round_trip_regardless_of_order() {
    let store = InMemoryStore::new();
    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();

    let mut products = Vec::new();
    for i in 0..5 {
        products.push(
            store
                .create_product(new_product(&format!("P{i}"), i as f64))
                .await
                .unwrap(),
        );
    }

    // Assign in reverse order, one at a time.
    for p in products.iter().rev() {
        assert!(store.assign_product_to_buyer(buyer.id, p.id).await.unwrap());
    }

    let fetched = store.products_for_buyer(buyer.id).await.unwrap();
    assert_eq!(fetched.len(), products.len());
    let expected: Vec<ProductId> = products.iter().map(|p| p.id).collect();
    let got: Vec<ProductId> = fetched.iter().map(|p| p.id).collect();
    assert_eq!(got, expected, "result is ordered by product id");
}

#[tokio::test]
async fn reassigning_a_subset_leaves_existing_associations_untouched() {
    let store = InMemoryStore::new();

    let b1 = store.create_buyer(new_buyer("B1")).await.unwrap();
    let p1 = store.create_product(new_product("P1", 10.0)).await.unwrap();
    let p2 = store.create_product(new_product("P2", 20.0)).await.unwrap();

    let created = store
        .assign_buyer_to_products(b1.id, &[p1.id, p2.id])
        .await
        .unwrap();
    assert_eq!(created, 2);

    let products = store.products_for_buyer(b1.id).await.unwrap();
    assert_eq!(
        products.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![p1.id, p2.id]
    );

    // Re-running with a subset creates nothing and removes nothing.
    let created = store.assign_buyer_to_products(b1.id, &[p1.id]).await.unwrap();
    assert_eq!(created, 0);

    let products = store.products_for_buyer(b1.id).await.unwrap();
    assert_eq!(
        products.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![p1.id, p2.id]
    );
}

#[tokio::test]
async fn association_queries_work_in_both_directions() {
    let store = InMemoryStore::new();

    let b1 = store.create_buyer(new_buyer("B1")).await.unwrap();
    let b2 = store.create_buyer(new_buyer("B2")).await.unwrap();
    let p = store.create_product(new_product("P", 5.0)).await.unwrap();

    store.assign_product_to_buyer(b1.id, p.id).await.unwrap();
    store.assign_product_to_buyer(b2.id, p.id).await.unwrap();

    let buyers = store.buyers_for_product(p.id).await.unwrap();
    assert_eq!(
        buyers.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![b1.id, b2.id]
    );
}

#[tokio::test]
async fn deleting_a_buyer_cascades_to_its_associations() {
    let store = InMemoryStore::new();

    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();
    let product = store.create_product(new_product("P", 1.0)).await.unwrap();
    store
        .assign_product_to_buyer(buyer.id, product.id)
        .await
        .unwrap();

    assert!(store.delete_buyer(buyer.id).await.unwrap());
    assert!(store
        .buyers_for_product(product.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn deleting_a_product_cascades_to_associations_and_categories() {
    let store = InMemoryStore::new();

    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();
    let product = store.create_product(new_product("P", 1.0)).await.unwrap();
    store
        .assign_product_to_buyer(buyer.id, product.id)
        .await
        .unwrap();
    store
        .assign_categories_to_product(product.id, &[CategoryId::new(3)])
        .await
        .unwrap();

    assert!(store.delete_product(product.id).await.unwrap());
    assert!(store.products_for_buyer(buyer.id).await.unwrap().is_empty());
    assert!(store
        .categories_for_product(product.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn category_assignment_is_idempotent_and_all_or_nothing() {
    let store = InMemoryStore::new();
    let product = store.create_product(new_product("P", 1.0)).await.unwrap();

    let created = store
        .assign_categories_to_product(product.id, &[CategoryId::new(1), CategoryId::new(2)])
        .await
        .unwrap();
    assert_eq!(created, 2);

    let created = store
        .assign_categories_to_product(product.id, &[CategoryId::new(1), CategoryId::new(2)])
        .await
        .unwrap();
    assert_eq!(created, 0);

    assert!(matches!(
        store.assign_categories_to_product(product.id, &[]).await,
        Err(RepositoryError::Validation(_))
    ));
    assert!(matches!(
        store
            .assign_categories_to_product(product.id, &[CategoryId::new(2), CategoryId::new(-1)])
            .await,
        Err(RepositoryError::Validation(_))
    ));
    assert!(matches!(
        store
            .assign_categories_to_product(ProductId::new(999), &[CategoryId::new(1)])
            .await,
        Err(RepositoryError::NotFound)
    ));

    let categories = store.categories_for_product(product.id).await.unwrap();
    assert_eq!(categories, vec![CategoryId::new(1), CategoryId::new(2)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_assignments_create_exactly_one_record() {
    let store = Arc::new(InMemoryStore::new());
    let buyer = store.create_buyer(new_buyer("Ada")).await.unwrap();
    let product = store.create_product(new_product("P", 1.0)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let (buyer_id, product_id) = (buyer.id, product.id);
        handles.push(tokio::spawn(async move {
            store.assign_product_to_buyer(buyer_id, product_id).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1, "exactly one task observed the creation");
    assert_eq!(store.products_for_buyer(buyer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn product_crud_mirrors_buyer_crud() {
    let store = InMemoryStore::new();

    let created = store
        .create_product(NewProduct {
            name: "Espresso Machine".to_string(),
            description: "15 bar pump".to_string(),
            price: 249.99,
        })
        .await
        .unwrap();

    let fetched = store.get_product(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert!(store.product_exists(created.id).await.unwrap());

    let mut updated = created.clone();
    updated.price = 199.99;
    store.update_product(&updated).await.unwrap();
    assert_eq!(store.get_product(created.id).await.unwrap().price, 199.99);

    assert!(store.delete_product(created.id).await.unwrap());
    assert!(!store.product_exists(created.id).await.unwrap());
    assert!(!store.delete_product(created.id).await.unwrap());
}

#[tokio::test]
async fn repository_rejects_invalid_payloads() {
    let store = InMemoryStore::new();

    assert!(matches!(
        store.create_buyer(new_buyer("   ")).await,
        Err(RepositoryError::Validation(_))
    ));
    assert!(matches!(
        store.create_product(new_product("P", -1.0)).await,
        Err(RepositoryError::Validation(_))
    ));
    assert!(matches!(
        store.create_product(new_product("P", f64::NAN)).await,
        Err(RepositoryError::Validation(_))
    ));
}
