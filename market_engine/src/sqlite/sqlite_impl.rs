//! `SqliteDatabase` is a concrete implementation of a market engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module. Every multi-step operation runs inside a single sqlx transaction;
//! an early error return drops the transaction, which rolls everything back.
use std::fmt::Debug;

use lmp_common::Cents;
use log::*;
use sqlx::SqlitePool;

use super::db::{carts, db_url, new_pool, orders, payments, rewards, stock};
use crate::{
    db_types::{
        CartLine,
        NewCartLine,
        NewOrder,
        NewRewardTier,
        NewRewardsConfig,
        Order,
        OrderId,
        OrderLine,
        OrderStatusType,
        Payment,
        PaymentMethod,
        PaymentStatusType,
        PointsLedgerEntry,
        RewardTier,
        RewardsConfig,
        StockRecord,
        TransitionActor,
    },
    order_objects::{CartContents, CheckoutRequest, CheckoutSummary, OrderQueryFilter},
    traits::{
        CartManagement,
        InventoryManagement,
        MarketplaceDatabase,
        MarketplaceError,
        OrderManagement,
        RewardsManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutSummary, MarketplaceError> {
        let CheckoutRequest { buyer_id, seller_id, payment_method, delivery_address } = request;
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart(&buyer_id, &seller_id, &mut tx).await?.ok_or(MarketplaceError::EmptyCart)?;
        let lines = carts::fetch_cart_lines(cart.id, &mut tx).await?;
        let total: Cents = lines.iter().map(CartLine::line_total).sum();
        if lines.is_empty() || total == Cents::from(0) {
            debug!("🗃️ Buyer {buyer_id} tried to check out an empty cart at seller {seller_id}");
            return Err(MarketplaceError::EmptyCart);
        }
        for line in &lines {
            let taken = stock::take_stock(&seller_id, &line.product_id, line.quantity, &mut tx).await?;
            if !taken {
                debug!(
                    "🗃️ Checkout for buyer {buyer_id} failed: seller {seller_id} has fewer than {} of {}",
                    line.quantity, line.product_id
                );
                return Err(MarketplaceError::InsufficientStock(line.product_id.clone()));
            }
        }
        let new_order = NewOrder::new(buyer_id, seller_id, total, payment_method, delivery_address);
        let order = orders::insert_order(new_order, &mut tx).await?;
        let order_lines = orders::insert_order_lines(order.id, &lines, &mut tx).await?;
        let line_total = orders::order_line_total(order.id, &mut tx).await?;
        if line_total != order.total_price {
            error!(
                "🗃️ Order {} lines sum to {line_total} but the order total is {}. Aborting the checkout.",
                order.order_id, order.total_price
            );
            return Err(MarketplaceError::ConsistencyViolation(format!(
                "order {} line sum {line_total} != total {}",
                order.order_id, order.total_price
            )));
        }
        carts::delete_cart(cart.id, &mut tx).await?;
        let (order, points_awarded) = match order.payment_method {
            PaymentMethod::Cash => {
                let points = rewards::accrue(&order, &mut tx).await?;
                let order =
                    if points > 0 { orders::set_points_awarded(order.id, points, &mut tx).await? } else { order };
                (order, points)
            },
            PaymentMethod::Transfer => {
                // accrual is deferred until the seller approves the transfer
                payments::insert_payment(&order.order_id, order.total_price, PaymentStatusType::Pending, None, &mut tx)
                    .await?;
                (order, 0)
            },
        };
        tx.commit().await?;
        debug!("🗃️ Order {} of {} checked out for buyer {}", order.order_id, order.total_price, order.buyer_id);
        Ok(CheckoutSummary { order, lines: order_lines, points_awarded })
    }

    async fn submit_receipt(
        &self,
        order_id: &OrderId,
        buyer_id: &str,
        receipt_url: &str,
    ) -> Result<Payment, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if order.buyer_id != buyer_id {
            return Err(MarketplaceError::Forbidden(format!("Order {order_id} does not belong to buyer {buyer_id}")));
        }
        if order.payment_method != PaymentMethod::Transfer {
            return Err(MarketplaceError::InvalidState(format!("Order {order_id} is not paid by bank transfer")));
        }
        if order.status != OrderStatusType::Pending {
            return Err(MarketplaceError::InvalidState(format!(
                "Order {order_id} is {}; receipts can no longer be submitted",
                order.status
            )));
        }
        let latest = payments::latest_payment_for_order(order_id, &mut tx).await?;
        let payment = match latest {
            Some(p) if p.status == PaymentStatusType::Pending => {
                payments::set_receipt(p.id, receipt_url, &mut tx).await?
            },
            Some(p) if p.status == PaymentStatusType::Rejected => {
                // a rejected attempt is never reopened; a fresh row keeps the audit trail
                payments::insert_payment(
                    order_id,
                    order.total_price,
                    PaymentStatusType::PendingReview,
                    Some(receipt_url),
                    &mut tx,
                )
                .await?
            },
            Some(p) => {
                return Err(MarketplaceError::InvalidState(format!(
                    "Payment for order {order_id} is {}; a receipt cannot be submitted",
                    p.status
                )))
            },
            None => {
                return Err(MarketplaceError::InvalidState(format!(
                    "Order {order_id} has no payment awaiting a receipt"
                )))
            },
        };
        orders::set_payment_status(order.id, PaymentStatusType::PendingReview, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Receipt for order {order_id} submitted; payment #{} awaits review", payment.id);
        Ok(payment)
    }

    async fn review_payment(
        &self,
        payment_id: i64,
        reviewer_id: &str,
        approved: bool,
        reason: Option<&str>,
    ) -> Result<(Order, i64), MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_id(payment_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::PaymentNotFound(payment_id))?;
        let order = orders::fetch_order_by_order_id(&payment.order_id, &mut tx).await?.ok_or_else(|| {
            error!("🗃️ Payment #{payment_id} references order {} which does not exist", payment.order_id);
            MarketplaceError::ConsistencyViolation(format!("payment #{payment_id} references a missing order"))
        })?;
        if order.seller_id != reviewer_id {
            return Err(MarketplaceError::Forbidden(format!(
                "Only the seller of order {} may review its payments",
                order.order_id
            )));
        }
        if payment.status != PaymentStatusType::PendingReview {
            return Err(MarketplaceError::InvalidState(format!(
                "Payment #{payment_id} is {}; only a payment under review can be decided",
                payment.status
            )));
        }
        if order.status != OrderStatusType::Pending {
            return Err(MarketplaceError::InvalidState(format!(
                "Order {} is {}; its payment can no longer be reviewed",
                order.order_id, order.status
            )));
        }
        if approved {
            payments::record_review(payment_id, PaymentStatusType::Approved, reviewer_id, None, &mut tx).await?;
            let order = orders::set_payment_status(order.id, PaymentStatusType::Approved, &mut tx).await?;
            let order = orders::update_order_status(order.id, OrderStatusType::Confirmed, &mut tx).await?;
            let points = rewards::accrue(&order, &mut tx).await?;
            let order =
                if points > 0 { orders::set_points_awarded(order.id, points, &mut tx).await? } else { order };
            tx.commit().await?;
            debug!("🗃️ Payment #{payment_id} approved. Order {} is confirmed; {points} points awarded", order.order_id);
            Ok((order, points))
        } else {
            payments::record_review(payment_id, PaymentStatusType::Rejected, reviewer_id, reason, &mut tx).await?;
            let order = orders::set_payment_status(order.id, PaymentStatusType::Rejected, &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Payment #{payment_id} rejected. Order {} stays {}", order.order_id, order.status);
            Ok((order, 0))
        }
    }

    async fn advance_order_status(
        &self,
        order_id: &OrderId,
        actor_id: &str,
        new_status: OrderStatusType,
    ) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        let actor = order.status.transition_actor(new_status).ok_or_else(|| {
            MarketplaceError::InvalidState(format!(
                "Order {order_id} cannot move from {} to {new_status}",
                order.status
            ))
        })?;
        let authorized = match actor {
            TransitionActor::Seller => actor_id == order.seller_id,
            TransitionActor::Buyer => actor_id == order.buyer_id,
            TransitionActor::Either => actor_id == order.buyer_id || actor_id == order.seller_id,
        };
        if !authorized {
            return Err(MarketplaceError::Forbidden(format!(
                "Actor {actor_id} may not move order {order_id} to {new_status}"
            )));
        }
        if new_status == OrderStatusType::Confirmed
            && order.payment_method == PaymentMethod::Transfer
            && order.payment_status != PaymentStatusType::Approved
        {
            return Err(MarketplaceError::InvalidState(format!(
                "Order {order_id} awaits payment approval before it can be confirmed"
            )));
        }
        if new_status == OrderStatusType::Cancelled {
            let lines = orders::fetch_order_lines(order.id, &mut tx).await?;
            for line in &lines {
                stock::return_stock(&order.seller_id, &line.product_id, line.quantity, &mut tx).await?;
            }
            debug!("🗃️ Returned stock for {} lines of cancelled order {order_id}", lines.len());
        }
        let order = orders::update_order_status(order.id, new_status, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} is now {new_status}");
        Ok(order)
    }

    async fn accrue_points(&self, order: &Order) -> Result<i64, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let points = rewards::accrue(order, &mut tx).await?;
        if points > 0 {
            orders::set_points_awarded(order.id, points, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(points)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CartManagement for SqliteDatabase {
    async fn upsert_cart_line(
        &self,
        buyer_id: &str,
        seller_id: &str,
        line: NewCartLine,
    ) -> Result<CartLine, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_or_create_cart(buyer_id, seller_id, &mut tx).await?;
        let line = carts::upsert_line(cart.id, line, &mut tx).await?;
        tx.commit().await?;
        Ok(line)
    }

    async fn fetch_cart(&self, buyer_id: &str, seller_id: &str) -> Result<Option<CartContents>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let cart = match carts::fetch_cart(buyer_id, seller_id, &mut conn).await? {
            Some(cart) => cart,
            None => return Ok(None),
        };
        let lines = carts::fetch_cart_lines(cart.id, &mut conn).await?;
        Ok(Some(CartContents { cart, lines }))
    }

    async fn remove_cart_line(
        &self,
        buyer_id: &str,
        seller_id: &str,
        product_id: &str,
    ) -> Result<bool, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart(buyer_id, seller_id, &mut tx).await?.ok_or_else(|| {
            MarketplaceError::CartNotFound { buyer_id: buyer_id.to_string(), seller_id: seller_id.to_string() }
        })?;
        let removed = carts::remove_line(cart.id, product_id, &mut tx).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn abandon_cart(&self, buyer_id: &str, seller_id: &str) -> Result<(), MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_cart(buyer_id, seller_id, &mut tx).await?.ok_or_else(|| {
            MarketplaceError::CartNotFound { buyer_id: buyer_id.to_string(), seller_id: seller_id.to_string() }
        })?;
        carts::delete_cart(cart.id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn set_stock_level(
        &self,
        seller_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<StockRecord, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let record = stock::set_level(seller_id, product_id, quantity, &mut conn).await?;
        Ok(record)
    }

    async fn stock_level(&self, seller_id: &str, product_id: &str) -> Result<Option<StockRecord>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let record = stock::fetch_record(seller_id, product_id, &mut conn).await?;
        Ok(record)
    }
}

impl RewardsManagement for SqliteDatabase {
    async fn upsert_rewards_config(&self, config: NewRewardsConfig) -> Result<RewardsConfig, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let config = rewards::upsert_config(config, &mut conn).await?;
        Ok(config)
    }

    async fn replace_reward_tiers(
        &self,
        seller_id: &str,
        tiers: Vec<NewRewardTier>,
    ) -> Result<Vec<RewardTier>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let tiers = rewards::replace_tiers(seller_id, tiers, &mut tx).await?;
        tx.commit().await?;
        Ok(tiers)
    }

    async fn fetch_rewards_config(&self, seller_id: &str) -> Result<Option<RewardsConfig>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let config = rewards::fetch_config(seller_id, &mut conn).await?;
        Ok(config)
    }

    async fn reward_tiers(&self, seller_id: &str) -> Result<Vec<RewardTier>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let tiers = rewards::fetch_tiers(seller_id, &mut conn).await?;
        Ok(tiers)
    }

    async fn points_balance(&self, buyer_id: &str, seller_id: &str) -> Result<i64, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let total = rewards::balance(buyer_id, seller_id, &mut conn).await?;
        Ok(total)
    }

    async fn ledger_entries(
        &self,
        buyer_id: &str,
        seller_id: &str,
    ) -> Result<Vec<PointsLedgerEntry>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let entries = rewards::ledger_entries(buyer_id, seller_id, &mut conn).await?;
        Ok(entries)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_lines(&self, order_id: &OrderId) -> Result<Vec<OrderLine>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        let lines = orders::fetch_order_lines(order.id, &mut conn).await?;
        Ok(lines)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::payments_for_order(order_id, &mut conn).await?;
        Ok(payments)
    }
}
