use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lmp_common::Cents;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------       OrderId       ---------------------------------------------------------
/// Public identifier for an order. Opaque to callers; the engine generates one per checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn random() -> Self {
        Self(format!("ord-{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been checked out and awaits the seller.
    Pending,
    /// The seller has accepted the order. Transfer orders require an approved payment first.
    Confirmed,
    /// The seller has handed the goods over for delivery.
    Delivered,
    /// The buyer has confirmed receipt. Terminal.
    Completed,
    /// The order was called off by the buyer or the seller before delivery.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Delivered" => Ok(Self::Delivered),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

/// The party entitled to drive a given lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionActor {
    Seller,
    Buyer,
    Either,
}

impl OrderStatusType {
    /// Returns who may move an order from `self` to `next`, or `None` when the lifecycle does
    /// not permit the transition at all. No transition may skip a state, and `Completed` is
    /// terminal.
    pub fn transition_actor(self, next: OrderStatusType) -> Option<TransitionActor> {
        use OrderStatusType::*;
        match (self, next) {
            (Pending, Confirmed) | (Confirmed, Delivered) => Some(TransitionActor::Seller),
            (Delivered, Completed) => Some(TransitionActor::Buyer),
            (Pending | Confirmed, Cancelled) => Some(TransitionActor::Either),
            (_, _) => None,
        }
    }
}

//--------------------------------------   PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Settled in person on delivery.
    Cash,
    /// Manual bank transfer, verified by the seller from the buyer's receipt.
    Transfer,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Transfer => write!(f, "Transfer"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(Self::Cash),
            "Transfer" => Ok(Self::Transfer),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------  PaymentStatusType  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// Awaiting the buyer's proof of payment (or settlement on delivery for cash orders).
    Pending,
    /// A receipt has been submitted and awaits the seller's verdict.
    PendingReview,
    /// The seller verified the transfer.
    Approved,
    /// The seller rejected the submitted receipt. The buyer may submit a new one.
    Rejected,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::PendingReview => write!(f, "PendingReview"),
            PaymentStatusType::Approved => write!(f, "Approved"),
            PaymentStatusType::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "PendingReview" => Ok(Self::PendingReview),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------        Cart        ----------------------------------------------------------
/// A buyer's open cart at one seller. At most one exists per (buyer, seller) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cart {
    pub id: i64,
    pub buyer_id: String,
    pub seller_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      CartLine      ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: String,
    /// Title as it read when the line was added.
    pub title: String,
    /// Unit price snapshotted at add-time. Catalog price changes never alter an open cart.
    pub unit_price: Cents,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

//--------------------------------------     NewCartLine    ----------------------------------------------------------
/// Input for adding a product to a cart. Title and unit price are the catalog values at the
/// moment of the add; the engine stores them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCartLine {
    pub product_id: String,
    pub title: String,
    pub unit_price: Cents,
    pub quantity: i64,
}

impl NewCartLine {
    pub fn new<S: Into<String>>(product_id: S, title: S, unit_price: Cents, quantity: i64) -> Self {
        Self { product_id: product_id.into(), title: title.into(), unit_price, quantity }
    }
}

//--------------------------------------        Order       ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    /// Fixed at checkout from the cart snapshot. Never edited in place.
    pub total_price: Cents,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatusType,
    /// Points credited for this order. Non-zero at most once; the ledger enforces it.
    pub points_awarded: i64,
    pub delivery_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder      ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub total_price: Cents,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
}

impl NewOrder {
    pub fn new(
        buyer_id: String,
        seller_id: String,
        total_price: Cents,
        payment_method: PaymentMethod,
        delivery_address: String,
    ) -> Self {
        Self { order_id: OrderId::random(), buyer_id, seller_id, total_price, payment_method, delivery_address }
    }
}

//--------------------------------------      OrderLine     ----------------------------------------------------------
/// Snapshot copy of a cart line at checkout. The sum of `unit_price × quantity` over an
/// order's lines always equals the order total.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub title: String,
    pub unit_price: Cents,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

//--------------------------------------     StockRecord    ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: i64,
    pub seller_id: String,
    pub product_id: String,
    pub available_quantity: i64,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    RewardsConfig   ----------------------------------------------------------
/// A seller's loyalty policy. Read-only to checkout; accrual reads it as it stands at accrual
/// time, not as it stood when the cart was built.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RewardsConfig {
    pub seller_id: String,
    pub active: bool,
    /// Points issued per whole currency unit of order value, before tier scaling.
    pub points_per_currency_unit: f64,
    /// Order totals below this never earn points.
    pub minimum_purchase: Cents,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  NewRewardsConfig  ----------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRewardsConfig {
    pub seller_id: String,
    pub active: bool,
    pub points_per_currency_unit: f64,
    pub minimum_purchase: Cents,
}

impl NewRewardsConfig {
    pub fn new<S: Into<String>>(seller_id: S, points_per_currency_unit: f64, minimum_purchase: Cents) -> Self {
        Self { seller_id: seller_id.into(), active: true, points_per_currency_unit, minimum_purchase }
    }
}

//--------------------------------------     RewardTier     ----------------------------------------------------------
/// A purchase threshold scaling the points for orders that reach it. When several tiers are
/// satisfied, the one with the highest threshold applies.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RewardTier {
    pub id: i64,
    pub seller_id: String,
    pub minimum_purchase: Cents,
    pub multiplier: f64,
}

//--------------------------------------   NewRewardTier    ----------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewRewardTier {
    pub minimum_purchase: Cents,
    pub multiplier: f64,
}

impl NewRewardTier {
    pub fn new(minimum_purchase: Cents, multiplier: f64) -> Self {
        Self { minimum_purchase, multiplier }
    }
}

//-------------------------------------- PointsLedgerEntry  ----------------------------------------------------------
/// Append-only record of points earned for one order. `order_id` is unique within the ledger,
/// which is what makes double-award impossible.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PointsLedgerEntry {
    pub id: i64,
    pub buyer_id: String,
    pub seller_id: String,
    pub order_id: OrderId,
    pub points_earned: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   PointsBalance    ----------------------------------------------------------
/// Denormalized running total per (buyer, seller). Always equals the sum of that pair's
/// ledger entries.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PointsBalance {
    pub buyer_id: String,
    pub seller_id: String,
    pub total_points: i64,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Payment       ----------------------------------------------------------
/// One manual-transfer payment attempt for an order. A rejected attempt is never mutated;
/// resubmission creates a fresh row so the audit trail survives.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: OrderId,
    pub amount: Cents,
    pub status: PaymentStatusType,
    pub receipt_url: Option<String>,
    pub reviewer_id: Option<String>,
    pub review_note: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatusType::Pending,
            OrderStatusType::Confirmed,
            OrderStatusType::Delivered,
            OrderStatusType::Completed,
            OrderStatusType::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        for status in [
            PaymentStatusType::Pending,
            PaymentStatusType::PendingReview,
            PaymentStatusType::Approved,
            PaymentStatusType::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<PaymentStatusType>().unwrap(), status);
        }
    }

    #[test]
    fn lifecycle_permits_no_skips() {
        use OrderStatusType::*;
        assert_eq!(Pending.transition_actor(Confirmed), Some(TransitionActor::Seller));
        assert_eq!(Confirmed.transition_actor(Delivered), Some(TransitionActor::Seller));
        assert_eq!(Delivered.transition_actor(Completed), Some(TransitionActor::Buyer));
        assert_eq!(Pending.transition_actor(Cancelled), Some(TransitionActor::Either));
        assert_eq!(Confirmed.transition_actor(Cancelled), Some(TransitionActor::Either));
        // skips and reversals
        assert_eq!(Pending.transition_actor(Delivered), None);
        assert_eq!(Pending.transition_actor(Completed), None);
        assert_eq!(Confirmed.transition_actor(Completed), None);
        assert_eq!(Delivered.transition_actor(Cancelled), None);
        assert_eq!(Confirmed.transition_actor(Pending), None);
        // Completed is terminal
        for next in [Pending, Confirmed, Delivered, Cancelled] {
            assert_eq!(Completed.transition_actor(next), None);
        }
        // Cancelled is a dead end too
        for next in [Pending, Confirmed, Delivered, Completed] {
            assert_eq!(Cancelled.transition_actor(next), None);
        }
    }

    #[test]
    fn same_status_is_not_a_transition() {
        use OrderStatusType::*;
        for s in [Pending, Confirmed, Delivered, Completed, Cancelled] {
            assert_eq!(s.transition_actor(s), None);
        }
    }
}
