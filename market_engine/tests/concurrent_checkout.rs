//! Contention tests: concurrent checkouts racing for the same stock. SQLite has a single
//! writer, so these run against a one-connection pool; the guarded decrement inside the
//! checkout transaction is what keeps the losers honest.
mod common;

use lmp_common::Cents;
use market_engine::{
    db_types::{NewCartLine, PaymentMethod},
    events::EventProducers,
    order_objects::{CheckoutRequest, OrderQueryFilter},
    CartApi,
    InventoryManagement,
    MarketplaceError,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
};

const NUM_BUYERS: u64 = 6;
const UNITS_IN_STOCK: i64 = 4;

async fn seed_racing_buyers(db: &SqliteDatabase, buyers: u64, stock: i64) {
    db.set_stock_level("seller-1", "prod-hot", stock).await.unwrap();
    let carts = CartApi::new(db.clone());
    for i in 0..buyers {
        let buyer = format!("buyer-{i}");
        carts
            .add_item(&buyer, "seller-1", NewCartLine::new("prod-hot", "Last harvest box", Cents::from(3000), 1))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn last_unit_goes_to_exactly_one_buyer() {
    let db = common::prepare_test_env_with(&common::random_db_path(), 1).await;
    seed_racing_buyers(&db, 2, 1).await;

    let mut handles = Vec::new();
    for i in 0..2 {
        let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
        let buyer = format!("buyer-{i}");
        handles.push(tokio::spawn(async move {
            flow.checkout(CheckoutRequest::new(buyer.as_str(), "seller-1", PaymentMethod::Cash, "12 Main Rd")).await
        }));
    }
    let mut wins = 0;
    let mut losses = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(summary) => {
                assert_eq!(summary.order.total_price, Cents::from(3000));
                wins += 1;
            },
            Err(MarketplaceError::InsufficientStock(product_id)) => {
                assert_eq!(product_id, "prod-hot");
                losses += 1;
            },
            Err(other) => panic!("The losing checkout must fail cleanly, but got: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(losses, 1);
    assert_eq!(db.stock_level("seller-1", "prod-hot").await.unwrap().unwrap().available_quantity, 0);
}

#[tokio::test]
async fn burst_of_checkouts_never_oversells() {
    let db = common::prepare_test_env_with(&common::random_db_path(), 1).await;
    seed_racing_buyers(&db, NUM_BUYERS, UNITS_IN_STOCK).await;

    let mut handles = Vec::new();
    for i in 0..NUM_BUYERS {
        let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
        let buyer = format!("buyer-{i}");
        handles.push(tokio::spawn(async move {
            flow.checkout(CheckoutRequest::new(buyer.as_str(), "seller-1", PaymentMethod::Cash, "12 Main Rd")).await
        }));
    }
    let mut orders_created = 0i64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => orders_created += 1,
            Err(MarketplaceError::InsufficientStock(_)) => {},
            Err(other) => panic!("Unexpected checkout failure: {other}"),
        }
    }
    // exactly as many orders as there were units, and the shelf is empty, never negative
    assert_eq!(orders_created, UNITS_IN_STOCK);
    assert_eq!(db.stock_level("seller-1", "prod-hot").await.unwrap().unwrap().available_quantity, 0);
    let orders = db.search_orders(OrderQueryFilter::default().with_seller_id("seller-1".to_string())).await.unwrap();
    assert_eq!(orders.len() as i64, UNITS_IN_STOCK);
}

#[tokio::test]
async fn stale_cart_fails_cleanly_after_depletion() {
    let db = common::prepare_test_env(&common::random_db_path()).await;
    seed_racing_buyers(&db, 2, 1).await;
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());

    // buyer-0 takes the last unit; buyer-1's cart is now stale
    flow.checkout(CheckoutRequest::new("buyer-0", "seller-1", PaymentMethod::Cash, "12 Main Rd")).await.unwrap();
    let err = flow
        .checkout(CheckoutRequest::new("buyer-1", "seller-1", PaymentMethod::Cash, "12 Main Rd"))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::InsufficientStock(_)));

    // the stale cart is intact so the buyer can adjust and retry
    let carts = CartApi::new(db.clone());
    assert!(carts.cart("buyer-1", "seller-1").await.unwrap().is_some());
    assert_eq!(db.stock_level("seller-1", "prod-hot").await.unwrap().unwrap().available_quantity, 0);
}
