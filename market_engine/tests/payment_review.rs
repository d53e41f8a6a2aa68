mod common;

use lmp_common::Cents;
use market_engine::{
    db_types::{NewCartLine, NewRewardsConfig, OrderStatusType, PaymentMethod, PaymentStatusType},
    events::EventProducers,
    order_objects::{CheckoutRequest, CheckoutSummary},
    CartApi,
    InventoryManagement,
    MarketplaceError,
    OrderFlowApi,
    OrderManagement,
    RewardsApi,
    SqliteDatabase,
};

struct Harness {
    db: SqliteDatabase,
    carts: CartApi<SqliteDatabase>,
    flow: OrderFlowApi<SqliteDatabase>,
    rewards: RewardsApi<SqliteDatabase>,
}

async fn setup() -> Harness {
    let db = common::prepare_test_env(&common::random_db_path()).await;
    Harness {
        db: db.clone(),
        carts: CartApi::new(db.clone()),
        flow: OrderFlowApi::new(db.clone(), EventProducers::default()),
        rewards: RewardsApi::new(db),
    }
}

impl Harness {
    async fn transfer_order_of(&self, total: Cents) -> CheckoutSummary {
        self.db.set_stock_level("seller-1", "prod-a", 100).await.unwrap();
        self.carts
            .add_item("buyer-1", "seller-1", NewCartLine::new("prod-a", "Veg box", total, 1))
            .await
            .unwrap();
        self.flow
            .checkout(CheckoutRequest::new("buyer-1", "seller-1", PaymentMethod::Transfer, "12 Main Rd"))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn transfer_checkout_opens_a_pending_payment_and_defers_points() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();
    let summary = h.transfer_order_of(Cents::from_whole(6_500)).await;

    // no points yet: the transfer has not been verified
    assert_eq!(summary.points_awarded, 0);
    assert!(h.rewards.history("buyer-1", "seller-1").await.unwrap().is_empty());

    let payments = h.db.payments_for_order(&summary.order.order_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatusType::Pending);
    assert_eq!(payments[0].amount, summary.order.total_price);
    assert!(payments[0].receipt_url.is_none());
}

#[tokio::test]
async fn unverified_transfer_orders_cannot_be_confirmed() {
    let h = setup().await;
    let summary = h.transfer_order_of(Cents::from_whole(6_500)).await;
    let err = h.flow.confirm_order(&summary.order.order_id, "seller-1").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)));
}

#[tokio::test]
async fn approval_confirms_the_order_and_settles_deferred_points() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();
    let summary = h.transfer_order_of(Cents::from_whole(6_500)).await;
    let oid = summary.order.order_id.clone();

    let payment = h.flow.submit_receipt(&oid, "buyer-1", "https://bank.example/receipt/1").await.unwrap();
    assert_eq!(payment.status, PaymentStatusType::PendingReview);
    assert_eq!(payment.receipt_url.as_deref(), Some("https://bank.example/receipt/1"));

    let order = h.flow.review_payment(payment.id, "seller-1", true, None).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Confirmed);
    assert_eq!(order.payment_status, PaymentStatusType::Approved);
    assert_eq!(order.points_awarded, 6);
    assert_eq!(h.rewards.balance("buyer-1", "seller-1").await.unwrap(), 6);
    assert_eq!(h.rewards.audit_balance("buyer-1", "seller-1").await.unwrap(), 6);

    // reviewing the same payment again is a client error
    let err = h.flow.review_payment(payment.id, "seller-1", true, None).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)));
}

#[tokio::test]
async fn rejection_keeps_the_order_pending_and_awards_nothing() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();
    let summary = h.transfer_order_of(Cents::from_whole(6_500)).await;
    let oid = summary.order.order_id.clone();

    let payment = h.flow.submit_receipt(&oid, "buyer-1", "https://bank.example/receipt/1").await.unwrap();
    let order = h
        .flow
        .review_payment(payment.id, "seller-1", false, Some("amount does not match".to_string()))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatusType::Rejected);
    assert_eq!(order.points_awarded, 0);
    assert!(h.rewards.history("buyer-1", "seller-1").await.unwrap().is_empty());

    // resubmission creates a fresh attempt; the rejected one stays on record
    let second = h.flow.submit_receipt(&oid, "buyer-1", "https://bank.example/receipt/2").await.unwrap();
    assert_ne!(second.id, payment.id);
    assert_eq!(second.status, PaymentStatusType::PendingReview);
    let attempts = h.db.payments_for_order(&oid).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].status, PaymentStatusType::Rejected);
    assert_eq!(attempts[0].review_note.as_deref(), Some("amount does not match"));

    // approving the second attempt settles the points exactly once
    let order = h.flow.review_payment(second.id, "seller-1", true, None).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Confirmed);
    assert_eq!(order.points_awarded, 6);
    assert_eq!(h.rewards.history("buyer-1", "seller-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn only_the_owning_seller_may_review() {
    let h = setup().await;
    let summary = h.transfer_order_of(Cents::from_whole(6_500)).await;
    let payment =
        h.flow.submit_receipt(&summary.order.order_id, "buyer-1", "https://bank.example/receipt/1").await.unwrap();

    for imposter in ["buyer-1", "seller-2"] {
        let err = h.flow.review_payment(payment.id, imposter, true, None).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Forbidden(_)), "{imposter} should be forbidden");
    }
    // the failed attempts changed nothing
    let order = h.db.fetch_order_by_order_id(&summary.order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatusType::PendingReview);
}

#[tokio::test]
async fn receipts_are_guarded() {
    let h = setup().await;
    let summary = h.transfer_order_of(Cents::from_whole(6_500)).await;
    let oid = summary.order.order_id.clone();

    // another buyer cannot submit on this order
    let err = h.flow.submit_receipt(&oid, "buyer-2", "https://bank.example/receipt/1").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)));

    // a submitted receipt cannot be submitted over
    h.flow.submit_receipt(&oid, "buyer-1", "https://bank.example/receipt/1").await.unwrap();
    let err = h.flow.submit_receipt(&oid, "buyer-1", "https://bank.example/receipt/2").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)));
}

#[tokio::test]
async fn cash_orders_have_no_receipt_flow() {
    let h = setup().await;
    h.db.set_stock_level("seller-1", "prod-a", 10).await.unwrap();
    h.carts
        .add_item("buyer-1", "seller-1", NewCartLine::new("prod-a", "Veg box", Cents::from(2000), 1))
        .await
        .unwrap();
    let summary = h
        .flow
        .checkout(CheckoutRequest::new("buyer-1", "seller-1", PaymentMethod::Cash, "12 Main Rd"))
        .await
        .unwrap();
    let err = h
        .flow
        .submit_receipt(&summary.order.order_id, "buyer-1", "https://bank.example/receipt/1")
        .await
        .unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)));
    assert!(h.db.payments_for_order(&summary.order.order_id).await.unwrap().is_empty());
}
