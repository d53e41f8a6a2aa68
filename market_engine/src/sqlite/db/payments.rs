use lmp_common::Cents;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, Payment, PaymentStatusType},
    traits::MarketplaceError,
};

/// Inserts a payment attempt for the order. Checkout creates the initial `Pending` row for
/// transfer orders; resubmission after a rejection creates a `PendingReview` row directly.
pub async fn insert_payment(
    order_id: &OrderId,
    amount: Cents,
    status: PaymentStatusType,
    receipt_url: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Payment, sqlx::Error> {
    let payment: Payment = sqlx::query_as(
        "INSERT INTO payments (order_id, amount, status, receipt_url) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_id.as_str())
    .bind(amount)
    .bind(status.to_string())
    .bind(receipt_url)
    .fetch_one(conn)
    .await?;
    debug!("💰️ Payment #{} ({}) recorded for order {}", payment.id, payment.status, payment.order_id);
    Ok(payment)
}

pub async fn fetch_payment_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payment)
}

/// The most recent payment attempt for the order, if any.
pub async fn latest_payment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Every attempt for the order, oldest first. Rejected attempts stay on record.
pub async fn payments_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

/// Attaches the buyer's receipt to a pending payment and moves it under review.
pub async fn set_receipt(
    payment_id: i64,
    receipt_url: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, MarketplaceError> {
    let result: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET receipt_url = $1, status = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $3 RETURNING *",
    )
    .bind(receipt_url)
    .bind(PaymentStatusType::PendingReview.to_string())
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(MarketplaceError::PaymentNotFound(payment_id))
}

/// Stamps the seller's verdict onto the payment.
pub async fn record_review(
    payment_id: i64,
    status: PaymentStatusType,
    reviewer_id: &str,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Payment, MarketplaceError> {
    let result: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET status = $1, reviewer_id = $2, review_note = $3, \
         reviewed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE id = $4 RETURNING *",
    )
    .bind(status.to_string())
    .bind(reviewer_id)
    .bind(note)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(MarketplaceError::PaymentNotFound(payment_id))
}
