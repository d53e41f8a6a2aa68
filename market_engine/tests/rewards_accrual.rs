mod common;

use lmp_common::Cents;
use market_engine::{
    db_types::{NewCartLine, NewRewardTier, NewRewardsConfig, PaymentMethod},
    events::EventProducers,
    order_objects::CheckoutRequest,
    CartApi,
    InventoryManagement,
    MarketplaceDatabase,
    OrderFlowApi,
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
    /// One-line cash checkout for `buyer-1` at `seller-1` with the given order total.
    async fn cash_order_of(&self, total: Cents) -> market_engine::order_objects::CheckoutSummary {
        self.db.set_stock_level("seller-1", "prod-a", 100).await.unwrap();
        self.carts
            .add_item("buyer-1", "seller-1", NewCartLine::new("prod-a", "Veg box", total, 1))
            .await
            .unwrap();
        self.flow
            .checkout(CheckoutRequest::new("buyer-1", "seller-1", PaymentMethod::Cash, "12 Main Rd"))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn qualifying_order_earns_floored_points() {
    let h = setup().await;
    // 0.001 points per currency unit, qualifying from 500000 cents up
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();
    h.rewards
        .set_tiers("seller-1", vec![NewRewardTier::new(Cents::from_whole(5_000), 1.0)])
        .await
        .unwrap();
    let config = h.rewards.config("seller-1").await.unwrap().unwrap();
    assert!(config.active);
    assert_eq!(config.minimum_purchase, Cents::from_whole(5_000));

    let summary = h.cash_order_of(Cents::from_whole(6_500)).await;
    // floor(650000 × 0.001 / 100) = 6
    assert_eq!(summary.points_awarded, 6);
    assert_eq!(summary.order.points_awarded, 6);
    assert_eq!(h.rewards.balance("buyer-1", "seller-1").await.unwrap(), 6);
    let history = h.rewards.history("buyer-1", "seller-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].order_id, summary.order.order_id);
    assert_eq!(h.rewards.audit_balance("buyer-1", "seller-1").await.unwrap(), 6);
}

#[tokio::test]
async fn threshold_is_inclusive() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();

    // exactly the minimum qualifies
    let summary = h.cash_order_of(Cents::from_whole(5_000)).await;
    assert_eq!(summary.points_awarded, 5);

    // one cent below does not, and leaves no ledger entry behind
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();
    let summary = h.cash_order_of(Cents::from(499_999)).await;
    assert_eq!(summary.points_awarded, 0);
    assert_eq!(summary.order.points_awarded, 0);
    assert!(h.rewards.history("buyer-1", "seller-1").await.unwrap().is_empty());
    assert_eq!(h.rewards.balance("buyer-1", "seller-1").await.unwrap(), 0);
}

#[tokio::test]
async fn highest_satisfied_tier_wins() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(1_000)))
        .await
        .unwrap();
    h.rewards
        .set_tiers("seller-1", vec![
            NewRewardTier::new(Cents::from_whole(5_000), 1.5),
            NewRewardTier::new(Cents::from_whole(10_000), 2.0),
        ])
        .await
        .unwrap();
    let tiers = h.rewards.tiers("seller-1").await.unwrap();
    assert_eq!(tiers.len(), 2);
    assert_eq!(tiers[0].minimum_purchase, Cents::from_whole(5_000));

    // exactly on the upper threshold: the 1000000 tier applies, not the 500000 one
    let summary = h.cash_order_of(Cents::from_whole(10_000)).await;
    // base = floor(1000000 × 0.001 / 100) = 10, × 2.0 = 20
    assert_eq!(summary.points_awarded, 20);
}

#[tokio::test]
async fn below_every_tier_means_multiplier_one() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(1_000)))
        .await
        .unwrap();
    h.rewards
        .set_tiers("seller-1", vec![NewRewardTier::new(Cents::from_whole(5_000), 3.0)])
        .await
        .unwrap();
    let summary = h.cash_order_of(Cents::from_whole(3_000)).await;
    // base = floor(300000 × 0.001 / 100) = 3; no tier reached
    assert_eq!(summary.points_awarded, 3);
}

#[tokio::test]
async fn no_program_or_inactive_program_earns_nothing() {
    let h = setup().await;
    let summary = h.cash_order_of(Cents::from_whole(6_500)).await;
    assert_eq!(summary.points_awarded, 0);

    let h = setup().await;
    let mut config = NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(1_000));
    config.active = false;
    h.rewards.set_config(config).await.unwrap();
    let summary = h.cash_order_of(Cents::from_whole(6_500)).await;
    assert_eq!(summary.points_awarded, 0);
    assert!(h.rewards.history("buyer-1", "seller-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn accrual_is_idempotent_per_order() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();
    let summary = h.cash_order_of(Cents::from_whole(6_500)).await;
    assert_eq!(summary.points_awarded, 6);

    // hammering accrue again must neither error nor double the balance
    let repeat = h.db.accrue_points(&summary.order).await.unwrap();
    assert_eq!(repeat, 6);
    let repeat = h.db.accrue_points(&summary.order).await.unwrap();
    assert_eq!(repeat, 6);

    assert_eq!(h.rewards.balance("buyer-1", "seller-1").await.unwrap(), 6);
    assert_eq!(h.rewards.history("buyer-1", "seller-1").await.unwrap().len(), 1);
    assert_eq!(h.rewards.audit_balance("buyer-1", "seller-1").await.unwrap(), 6);
}

#[tokio::test]
async fn balance_accumulates_across_orders() {
    let h = setup().await;
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(1_000)))
        .await
        .unwrap();
    for _ in 0..3 {
        let summary = h.cash_order_of(Cents::from_whole(2_000)).await;
        assert_eq!(summary.points_awarded, 2);
    }
    assert_eq!(h.rewards.balance("buyer-1", "seller-1").await.unwrap(), 6);
    assert_eq!(h.rewards.history("buyer-1", "seller-1").await.unwrap().len(), 3);
    assert_eq!(h.rewards.audit_balance("buyer-1", "seller-1").await.unwrap(), 6);
}

#[tokio::test]
async fn accrual_reads_the_policy_as_it_stands() {
    let h = setup().await;
    // no program at checkout time, so the cash order accrues nothing...
    let summary = h.cash_order_of(Cents::from_whole(6_500)).await;
    assert_eq!(summary.points_awarded, 0);

    // ...but the program introduced afterwards applies to a later accrual call for the same
    // (still unawarded) order: rewards reflect current seller policy, not a snapshot.
    h.rewards
        .set_config(NewRewardsConfig::new("seller-1", 0.001, Cents::from_whole(5_000)))
        .await
        .unwrap();
    let points = h.db.accrue_points(&summary.order).await.unwrap();
    assert_eq!(points, 6);
    assert_eq!(h.rewards.balance("buyer-1", "seller-1").await.unwrap(), 6);
}
