//! End-to-end checkout flows against an in-memory database.
//!
//! Every scenario asserts on the stock ledger afterwards: no path may
//! leave units reserved once the checkout has settled.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use store_server::db::DbService;
use store_server::db::models::{
    OrderCreate, OrderItemInput, OrderStatus, PaymentStatus, Product, ProductCreate,
    ShippingAddress, ShippingMethod, User, UserCreate,
};
use store_server::db::repository::{OrderRepository, ProductRepository, UserRepository};
use store_server::notify::LogNotifier;
use store_server::orders::{OrderError, OrderService};
use store_server::payment::RecordingGateway;
use store_server::stock::ReservationEngine;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

async fn test_db() -> Surreal<Db> {
    DbService::memory().await.expect("in-memory db").db
}

async fn seed_product(db: &Surreal<Db>, name: &str, price: Decimal, quantity: i32) -> Product {
    ProductRepository::new(db.clone())
        .create(ProductCreate {
            name: name.to_string(),
            sku: format!("SKU-{name}"),
            description: None,
            price,
            quantity,
            track_quantity: None,
            low_stock_threshold: None,
            variants: None,
        })
        .await
        .expect("seed product")
}

async fn seed_user(db: &Surreal<Db>) -> User {
    UserRepository::new(db.clone())
        .create(UserCreate {
            email: "shopper@example.com".to_string(),
            name: "Shopper".to_string(),
        })
        .await
        .expect("seed user")
}

fn service(db: &Surreal<Db>, gateway: Arc<RecordingGateway>) -> OrderService {
    let engine = ReservationEngine::new(db.clone(), Duration::from_secs(900));
    OrderService::new(
        db.clone(),
        engine,
        gateway,
        Arc::new(LogNotifier),
        "usd".to_string(),
    )
}

fn order_create(user: &User, items: Vec<OrderItemInput>) -> OrderCreate {
    OrderCreate {
        user_id: user.id_string(),
        items,
        shipping_address: ShippingAddress {
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            state: None,
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        },
        payment_method_id: "pm_card_visa".to_string(),
        shipping_method: ShippingMethod::Standard,
        notes: None,
    }
}

fn line(product: &Product, quantity: i32) -> OrderItemInput {
    OrderItemInput {
        product_id: product.id_string(),
        quantity,
        variant_id: None,
    }
}

async fn reload(db: &Surreal<Db>, product: &Product) -> Product {
    ProductRepository::new(db.clone())
        .find_by_id(&product.id_string())
        .await
        .expect("reload product")
        .expect("product exists")
}

#[tokio::test]
async fn successful_checkout_decrements_stock() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(1999, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway.clone());

    let result = service
        .create_order(order_create(&user, vec![line(&product, 2)]))
        .await
        .expect("checkout succeeds");

    assert_eq!(result.order.status, OrderStatus::Confirmed);
    assert!(result.payment.success);
    assert!(result.order.order_number.starts_with("ORD"));

    let charges = gateway.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, result.order.total);

    let stock = reload(&db, &product).await.stock;
    assert_eq!(stock.quantity, 3);
    assert_eq!(stock.reserved, 0);
    assert!(stock.reservations.is_empty());
    assert!(stock.is_consistent());
}

#[tokio::test]
async fn declined_payment_releases_holds_and_keeps_order() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(999, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::declining());
    let service = service(&db, gateway);

    let err = service
        .create_order(order_create(&user, vec![line(&product, 3)]))
        .await
        .expect_err("declined payment fails the checkout");
    assert!(matches!(err, OrderError::PaymentFailed { .. }));

    // Units are back on the shelf.
    let stock = reload(&db, &product).await.stock;
    assert_eq!(stock.quantity, 5);
    assert_eq!(stock.reserved, 0);
    assert!(stock.is_consistent());

    // The order survives as an audit record.
    let orders = OrderRepository::new(db.clone())
        .find_all(10, 0)
        .await
        .expect("list orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::PaymentFailed);
    assert_eq!(orders[0].payment.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn gateway_transport_error_releases_holds() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(999, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::erroring());
    let service = service(&db, gateway);

    let err = service
        .create_order(order_create(&user, vec![line(&product, 2)]))
        .await
        .expect_err("transport error fails the checkout");
    assert!(matches!(err, OrderError::PaymentFailed { .. }));

    let stock = reload(&db, &product).await.stock;
    assert_eq!(stock.quantity, 5);
    assert_eq!(stock.reserved, 0);
}

#[tokio::test]
async fn cancelling_a_paid_order_restocks_and_refunds() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(2500, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway.clone());

    let result = service
        .create_order(order_create(&user, vec![line(&product, 2)]))
        .await
        .expect("checkout succeeds");
    assert_eq!(reload(&db, &product).await.stock.quantity, 3);

    let outcome = service
        .cancel_order(&result.order.id_string(), Some("support"))
        .await
        .expect("cancellation succeeds");

    assert!(outcome.refund_processed);
    assert!(outcome.stock_restored);
    assert_eq!(outcome.order.status, OrderStatus::Cancelled);
    assert_eq!(outcome.order.payment.status, PaymentStatus::Refunded);
    assert!(outcome.order.payment.refunded_at.is_some());

    let refunds = gateway.refunds();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].0, result.payment.reference.clone().unwrap());

    let stock = reload(&db, &product).await.stock;
    assert_eq!(stock.quantity, 5);
    assert_eq!(stock.reserved, 0);
}

#[tokio::test]
async fn cancelled_order_cannot_be_cancelled_again() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(500, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway);

    let result = service
        .create_order(order_create(&user, vec![line(&product, 1)]))
        .await
        .expect("checkout succeeds");
    service
        .cancel_order(&result.order.id_string(), None)
        .await
        .expect("first cancellation succeeds");

    let err = service
        .cancel_order(&result.order.id_string(), None)
        .await
        .expect_err("second cancellation is rejected");
    assert!(matches!(
        err,
        OrderError::NotCancellable {
            current: OrderStatus::Cancelled
        }
    ));
}

#[tokio::test]
async fn batch_reservation_is_all_or_nothing() {
    let db = test_db().await;
    let plenty = seed_product(&db, "plenty", Decimal::new(1000, 2), 5).await;
    let scarce = seed_product(&db, "scarce", Decimal::new(1000, 2), 1).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway.clone());

    let err = service
        .create_order(order_create(&user, vec![line(&plenty, 2), line(&scarce, 3)]))
        .await
        .expect_err("short line fails the whole batch");

    match err {
        OrderError::ReservationFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].product_id, scarce.id_string());
        }
        other => panic!("unexpected error: {other}"),
    }

    // The successful line was rolled back; nothing was charged.
    let stock = reload(&db, &plenty).await.stock;
    assert_eq!(stock.quantity, 5);
    assert_eq!(stock.reserved, 0);
    assert!(gateway.charges().is_empty());
}

#[tokio::test]
async fn expired_holds_are_swept_exactly_once() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(999, 2), 10).await;

    // Tiny lease so the holds expire immediately.
    let engine = ReservationEngine::new(db.clone(), Duration::from_millis(10));
    engine
        .reserve(&product.id_string(), 3, None, "u1", "s1")
        .await
        .expect("reserve");
    engine
        .reserve(&product.id_string(), 2, None, "u2", "s2")
        .await
        .expect("reserve");
    assert_eq!(reload(&db, &product).await.stock.reserved, 5);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = engine.cleanup_expired().await.expect("sweep");
    assert_eq!(outcome.products_updated, 1);
    assert_eq!(outcome.total_released, 5);

    let second = engine.cleanup_expired().await.expect("second sweep");
    assert_eq!(second.products_updated, 0);
    assert_eq!(second.total_released, 0);

    let stock = reload(&db, &product).await.stock;
    assert_eq!(stock.quantity, 10);
    assert_eq!(stock.reserved, 0);
    assert!(stock.reservations.is_empty());
}

#[tokio::test]
async fn order_numbers_advance_per_order() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(100, 2), 10).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway);

    let first = service
        .create_order(order_create(&user, vec![line(&product, 1)]))
        .await
        .expect("first checkout");
    let second = service
        .create_order(order_create(&user, vec![line(&product, 1)]))
        .await
        .expect("second checkout");

    let a = &first.order.order_number;
    let b = &second.order.order_number;
    assert_eq!(a[..9], b[..9], "same day prefix");
    let a_seq: i64 = a[9..].parse().expect("sequence digits");
    let b_seq: i64 = b[9..].parse().expect("sequence digits");
    assert_eq!(b_seq, a_seq + 1);
}

#[tokio::test]
async fn fulfillment_walk_updates_shipping_info() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(3000, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway);

    let result = service
        .create_order(order_create(&user, vec![line(&product, 1)]))
        .await
        .expect("checkout succeeds");
    let id = result.order.id_string();

    let order = service
        .update_status(&id, OrderStatus::Processing, None, Some("warehouse"))
        .await
        .expect("to processing");
    assert_eq!(order.status, OrderStatus::Processing);

    let order = service
        .update_status(&id, OrderStatus::Shipped, Some("left the dock"), None)
        .await
        .expect("to shipped");
    let tracking = order.shipping.tracking_number.clone().expect("tracking set");
    assert!(tracking.starts_with("TRK"));
    assert_eq!(tracking.len(), 17);
    assert!(order.shipping.shipped_at.is_some());

    let order = service
        .update_status(&id, OrderStatus::Delivered, None, None)
        .await
        .expect("to delivered");
    assert!(order.shipping.delivered_at.is_some());

    // One history entry per transition, plus pending and confirmed.
    assert_eq!(order.status_history.len(), 5);

    let err = service
        .update_status(&id, OrderStatus::Processing, None, None)
        .await
        .expect_err("no going back");
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
}

#[tokio::test]
async fn unknown_user_is_rejected_before_any_hold() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(999, 2), 5).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway.clone());

    let order = OrderCreate {
        user_id: "user:nobody".to_string(),
        items: vec![line(&product, 1)],
        shipping_address: ShippingAddress {
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            state: None,
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        },
        payment_method_id: "pm_card_visa".to_string(),
        shipping_method: ShippingMethod::Pickup,
        notes: None,
    };

    let err = service.create_order(order).await.expect_err("unknown user");
    assert!(matches!(err, OrderError::UserNotFound(_)));
    assert_eq!(reload(&db, &product).await.stock.reserved, 0);
    assert!(gateway.charges().is_empty());
}

#[tokio::test]
async fn bare_user_key_checkout_settles_its_holds() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(1500, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway.clone());

    // Client sends the key without the table prefix.
    let full = user.id_string();
    let bare = full
        .split_once(':')
        .expect("id has table prefix")
        .1
        .trim_matches(|c| c == '⟨' || c == '⟩')
        .to_string();

    let mut order = order_create(&user, vec![line(&product, 2)]);
    order.user_id = bare;
    let result = service.create_order(order).await.expect("checkout succeeds");

    // Everything downstream sees the canonical id.
    assert_eq!(result.order.user.to_string(), full);
    assert_eq!(gateway.charges()[0].customer_ref, full);

    let stock = reload(&db, &product).await.stock;
    assert_eq!(stock.quantity, 3);
    assert_eq!(stock.reserved, 0);
    assert!(stock.reservations.is_empty());
}

#[tokio::test]
async fn cancel_reports_unrestored_stock() {
    let db = test_db().await;
    let product = seed_product(&db, "widget", Decimal::new(2000, 2), 5).await;
    let user = seed_user(&db).await;
    let gateway = Arc::new(RecordingGateway::approving());
    let service = service(&db, gateway.clone());

    let result = service
        .create_order(order_create(&user, vec![line(&product, 2)]))
        .await
        .expect("checkout succeeds");

    // Product vanishes before the cancellation, so the restock has
    // nowhere to land.
    db.query("DELETE product").await.expect("wipe catalog");

    let outcome = service
        .cancel_order(&result.order.id_string(), None)
        .await
        .expect("cancellation still settles the order");

    assert!(!outcome.stock_restored);
    assert!(outcome.refund_processed);
    assert_eq!(outcome.order.status, OrderStatus::Cancelled);
    assert_eq!(outcome.order.payment.status, PaymentStatus::Refunded);
    assert_eq!(gateway.refunds().len(), 1);
}
