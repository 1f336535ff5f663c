//! Concurrency test: many tasks race for a small pool of stock.
//!
//! The conditional-write discipline must hand out exactly as many units
//! as exist, with every loser getting a clean `InsufficientStock`.

use rust_decimal::Decimal;
use std::time::Duration;
use store_server::db::DbService;
use store_server::db::models::{ProductCreate, VariantStock};
use store_server::db::repository::ProductRepository;
use store_server::stock::{ReservationEngine, StockError};

const STOCK: i32 = 10;
const TASKS: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reservations_never_oversell() {
    let db = DbService::memory().await.expect("in-memory db").db;
    let repo = ProductRepository::new(db.clone());
    let product = repo
        .create(ProductCreate {
            name: "limited drop".to_string(),
            sku: "DROP-1".to_string(),
            description: None,
            price: Decimal::new(9900, 2),
            quantity: STOCK,
            track_quantity: None,
            low_stock_threshold: None,
            variants: None,
        })
        .await
        .expect("seed product");
    let product_id = product.id_string();

    let engine = ReservationEngine::new(db.clone(), Duration::from_secs(900));

    let mut handles = Vec::with_capacity(TASKS);
    for i in 0..TASKS {
        let engine = engine.clone();
        let product_id = product_id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .reserve(&product_id, 1, None, &format!("user-{i}"), &format!("sess-{i}"))
                .await
        }));
    }

    let mut won = 0usize;
    let mut lost = 0usize;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => won += 1,
            Err(StockError::InsufficientStock { available, .. }) => {
                assert!(available >= 0);
                lost += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(won, STOCK as usize);
    assert_eq!(lost, TASKS - STOCK as usize);

    let after = repo
        .find_by_id(&product_id)
        .await
        .expect("reload")
        .expect("product exists");
    assert_eq!(after.stock.quantity, STOCK);
    assert_eq!(after.stock.reserved, STOCK);
    assert_eq!(after.stock.reservations.len(), STOCK as usize);
    assert!(after.stock.is_consistent());
    assert_eq!(after.stock_version, TASKS as i64 - lost as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_variant_reservations_never_oversell_the_variant() {
    let db = DbService::memory().await.expect("in-memory db").db;
    let repo = ProductRepository::new(db.clone());
    let product = repo
        .create(ProductCreate {
            name: "tee".to_string(),
            sku: "TEE-1".to_string(),
            description: None,
            price: Decimal::new(2500, 2),
            quantity: 10,
            track_quantity: None,
            low_stock_threshold: None,
            variants: Some(vec![VariantStock {
                variant_id: "v-red".to_string(),
                name: "Red".to_string(),
                quantity: 3,
            }]),
        })
        .await
        .expect("seed product");
    let product_id = product.id_string();

    let engine = ReservationEngine::new(db.clone(), Duration::from_secs(900));

    // More buyers than red units, though the product as a whole has room.
    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let product_id = product_id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .reserve(
                    &product_id,
                    1,
                    Some("v-red"),
                    &format!("user-{i}"),
                    &format!("sess-{i}"),
                )
                .await
        }));
    }

    let mut won = 0usize;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => won += 1,
            Err(StockError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 3);

    let after = repo
        .find_by_id(&product_id)
        .await
        .expect("reload")
        .expect("product exists");
    assert_eq!(after.stock.reserved, 3);
    assert_eq!(after.stock.variant_available("v-red"), Some(0));
    assert!(after.stock.is_consistent());
}
