use thiserror::Error;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, Payment},
    order_objects::{CheckoutRequest, CheckoutSummary},
    traits::OrderManagement,
};

/// This trait defines the highest level of behaviour for backends supporting the market engine.
///
/// This behaviour includes:
/// * Turning a buyer's cart into an order atomically, consuming stock as part of the same unit.
/// * The manual payment-receipt review flow for bank transfers.
/// * The buyer/seller-visible order lifecycle.
/// * Points accrual, idempotent per order.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Converts the buyer's open cart at the seller into an order, in a single atomic
    /// transaction:
    ///
    /// * The total is recomputed from the snapshotted cart lines; the live catalog is never
    ///   consulted.
    /// * Stock is decremented per line; any shortfall fails the whole transaction with
    ///   [`MarketplaceError::InsufficientStock`], leaving the cart intact for the buyer to
    ///   adjust.
    /// * The order and its lines are inserted and the cart is deleted.
    /// * Cash orders accrue points immediately. Transfer orders get an initial `Pending`
    ///   payment row instead; accrual waits for the seller's approval.
    ///
    /// A cart with no lines (or a zero total) fails with [`MarketplaceError::EmptyCart`].
    async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutSummary, MarketplaceError>;

    /// Attaches the buyer's proof of payment to the order's open payment.
    ///
    /// The payment must be `Pending`, or `Rejected` from an earlier attempt — in the latter
    /// case a fresh payment row is created so the rejected one survives as an audit record.
    /// Any other state is an [`MarketplaceError::InvalidState`] error.
    async fn submit_receipt(
        &self,
        order_id: &OrderId,
        buyer_id: &str,
        receipt_url: &str,
    ) -> Result<Payment, MarketplaceError>;

    /// Records the seller's verdict on a payment under review.
    ///
    /// Only the seller who owns the order may review it ([`MarketplaceError::Forbidden`]
    /// otherwise), and only a `PendingReview` payment can be decided.
    ///
    /// On approval the order moves to `Confirmed` and deferred points accrue in the same
    /// transaction. On rejection the order stays `Pending` and no points are ever awarded
    /// for the rejected attempt.
    ///
    /// Returns the updated order and the points awarded (0 on rejection).
    async fn review_payment(
        &self,
        payment_id: i64,
        reviewer_id: &str,
        approved: bool,
        reason: Option<&str>,
    ) -> Result<(Order, i64), MarketplaceError>;

    /// Moves an order one step along its lifecycle on behalf of `actor_id`.
    ///
    /// The lifecycle is `Pending → Confirmed → Delivered → Completed`, with `Cancelled`
    /// reachable from `Pending` or `Confirmed`. The seller confirms and delivers, the buyer
    /// completes, and either party may cancel. Skipping a state is
    /// [`MarketplaceError::InvalidState`]; an actor outside their role is
    /// [`MarketplaceError::Forbidden`].
    ///
    /// Confirming a transfer order requires an approved payment. Cancelling returns the
    /// order's stock in the same transaction.
    async fn advance_order_status(
        &self,
        order_id: &OrderId,
        actor_id: &str,
        new_status: OrderStatusType,
    ) -> Result<Order, MarketplaceError>;

    /// Awards points for the order under the seller's rewards policy as it stands right now.
    ///
    /// Idempotent per order id: the ledger's uniqueness constraint makes a repeat call a
    /// no-op that returns the already-awarded value, regardless of caller discipline. Both
    /// the immediate (cash checkout) and deferred (payment approval) paths call through
    /// here, so firing both for one order is harmless by construction.
    async fn accrue_points(&self, order: &Order) -> Result<i64, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("The cart has nothing to purchase")]
    EmptyCart,
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(String),
    #[error("The operation is not permitted in the current state. {0}")]
    InvalidState(String),
    #[error("Forbidden. {0}")]
    Forbidden(String),
    #[error("Internal consistency violation. {0}")]
    ConsistencyViolation(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested payment (id {0}) does not exist")]
    PaymentNotFound(i64),
    #[error("No open cart for buyer {buyer_id} at seller {seller_id}")]
    CartNotFound { buyer_id: String, seller_id: String },
    #[error("Quantity must be at least 1, but got {0}")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}
