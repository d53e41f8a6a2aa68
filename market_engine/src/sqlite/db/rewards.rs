use lmp_common::Cents;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewRewardTier, NewRewardsConfig, Order, OrderId, PointsLedgerEntry, RewardTier, RewardsConfig},
    traits::MarketplaceError,
};

/// Points before tier scaling: `floor(total_cents × rate / 100)`. The floor is deliberate;
/// fractional remainders are dropped, never rounded up.
fn base_points(total: Cents, points_per_currency_unit: f64) -> i64 {
    ((total.value() as f64) * points_per_currency_unit / 100.0).floor() as i64
}

/// Awards points for the order under the seller's policy as it stands right now.
///
/// This is the single accrual operation; both the cash-checkout path and the
/// payment-approval path run through it. The ledger's UNIQUE order_id column makes a repeat
/// call a no-op that returns the already-awarded value, so invoking it twice for one order
/// is harmless regardless of which path fired first.
pub async fn accrue(order: &Order, conn: &mut SqliteConnection) -> Result<i64, MarketplaceError> {
    if let Some(existing) = fetch_ledger_entry(&order.order_id, &mut *conn).await? {
        debug!(
            "🎁️ Order {} already has a ledger entry of {} points. No action to take",
            order.order_id, existing.points_earned
        );
        return Ok(existing.points_earned);
    }
    let config = match fetch_config(&order.seller_id, &mut *conn).await? {
        Some(c) if c.active => c,
        _ => {
            trace!("🎁️ Seller {} has no active rewards program. No points for order {}", order.seller_id, order.order_id);
            return Ok(0);
        },
    };
    if order.total_price < config.minimum_purchase {
        trace!(
            "🎁️ Order {} total {} is below the minimum of {}. No points.",
            order.order_id,
            order.total_price,
            config.minimum_purchase
        );
        return Ok(0);
    }
    let base = base_points(order.total_price, config.points_per_currency_unit);
    let multiplier = applicable_multiplier(&order.seller_id, order.total_price, &mut *conn).await?;
    let points = ((base as f64) * multiplier).floor() as i64;
    if points <= 0 {
        return Ok(0);
    }
    if !insert_ledger_entry(order, points, &mut *conn).await? {
        // lost a race against another accrual for the same order
        let existing = fetch_ledger_entry(&order.order_id, conn).await?.map(|e| e.points_earned).unwrap_or(0);
        return Ok(existing);
    }
    add_to_balance(&order.buyer_id, &order.seller_id, points, conn).await?;
    debug!(
        "🎁️ Awarded {points} points to buyer {} at seller {} for order {}",
        order.buyer_id, order.seller_id, order.order_id
    );
    Ok(points)
}

pub async fn fetch_config(seller_id: &str, conn: &mut SqliteConnection) -> Result<Option<RewardsConfig>, sqlx::Error> {
    let config = sqlx::query_as("SELECT * FROM rewards_configs WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_optional(conn)
        .await?;
    Ok(config)
}

pub async fn upsert_config(
    config: NewRewardsConfig,
    conn: &mut SqliteConnection,
) -> Result<RewardsConfig, sqlx::Error> {
    let config = sqlx::query_as(
        r#"
            INSERT INTO rewards_configs (seller_id, active, points_per_currency_unit, minimum_purchase)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (seller_id)
            DO UPDATE SET active = excluded.active,
                          points_per_currency_unit = excluded.points_per_currency_unit,
                          minimum_purchase = excluded.minimum_purchase,
                          updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(config.seller_id)
    .bind(config.active)
    .bind(config.points_per_currency_unit)
    .bind(config.minimum_purchase)
    .fetch_one(conn)
    .await?;
    Ok(config)
}

/// The seller's tiers, lowest threshold first.
pub async fn fetch_tiers(seller_id: &str, conn: &mut SqliteConnection) -> Result<Vec<RewardTier>, sqlx::Error> {
    let tiers = sqlx::query_as("SELECT * FROM reward_tiers WHERE seller_id = $1 ORDER BY minimum_purchase ASC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(tiers)
}

/// Replaces the seller's tier table wholesale.
pub async fn replace_tiers(
    seller_id: &str,
    tiers: Vec<NewRewardTier>,
    conn: &mut SqliteConnection,
) -> Result<Vec<RewardTier>, sqlx::Error> {
    sqlx::query("DELETE FROM reward_tiers WHERE seller_id = $1").bind(seller_id).execute(&mut *conn).await?;
    let mut result = Vec::with_capacity(tiers.len());
    for tier in tiers {
        let row = sqlx::query_as(
            "INSERT INTO reward_tiers (seller_id, minimum_purchase, multiplier) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(seller_id)
        .bind(tier.minimum_purchase)
        .bind(tier.multiplier)
        .fetch_one(&mut *conn)
        .await?;
        result.push(row);
    }
    Ok(result)
}

/// The multiplier of the highest tier the total meets or exceeds, or 1.0 when none match.
/// Ties between satisfied tiers resolve to the highest threshold, not the first match.
pub async fn applicable_multiplier(
    seller_id: &str,
    total: Cents,
    conn: &mut SqliteConnection,
) -> Result<f64, sqlx::Error> {
    let tier: Option<RewardTier> = sqlx::query_as(
        "SELECT * FROM reward_tiers WHERE seller_id = $1 AND minimum_purchase <= $2 \
         ORDER BY minimum_purchase DESC LIMIT 1",
    )
    .bind(seller_id)
    .bind(total)
    .fetch_optional(conn)
    .await?;
    Ok(tier.map(|t| t.multiplier).unwrap_or(1.0))
}

pub async fn fetch_ledger_entry(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PointsLedgerEntry>, sqlx::Error> {
    let entry = sqlx::query_as("SELECT * FROM points_ledger WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

/// Appends the ledger entry for the order. Returns `false` when an entry for the order id
/// already exists; the UNIQUE column enforces award-exactly-once independently of the caller.
async fn insert_ledger_entry(order: &Order, points: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "INSERT INTO points_ledger (buyer_id, seller_id, order_id, points_earned) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (order_id) DO NOTHING",
    )
    .bind(&order.buyer_id)
    .bind(&order.seller_id)
    .bind(order.order_id.as_str())
    .bind(points)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

async fn add_to_balance(
    buyer_id: &str,
    seller_id: &str,
    points: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO points_balances (buyer_id, seller_id, total_points)
            VALUES ($1, $2, $3)
            ON CONFLICT (buyer_id, seller_id)
            DO UPDATE SET total_points = total_points + excluded.total_points, updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(buyer_id)
    .bind(seller_id)
    .bind(points)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn balance(buyer_id: &str, seller_id: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(total_points, 0) FROM points_balances WHERE buyer_id = $1 AND seller_id = $2",
    )
    .bind(buyer_id)
    .bind(seller_id)
    .fetch_optional(conn)
    .await?
    .unwrap_or(0);
    Ok(total)
}

pub async fn ledger_entries(
    buyer_id: &str,
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PointsLedgerEntry>, sqlx::Error> {
    let entries =
        sqlx::query_as("SELECT * FROM points_ledger WHERE buyer_id = $1 AND seller_id = $2 ORDER BY id ASC")
            .bind(buyer_id)
            .bind(seller_id)
            .fetch_all(conn)
            .await?;
    Ok(entries)
}
