use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Emitted after the transaction confirming an order has committed. A notifier downstream may
/// tell the buyer; if it can't, nothing here is rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmedEvent {
    pub order: Order,
}

impl OrderConfirmedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }

    /// JSON form for hand-off to the notification boundary.
    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Emitted after a seller approves a bank-transfer payment. Carries the points settled by the
/// deferred accrual, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentApprovedEvent {
    pub order: Order,
    pub points_awarded: i64,
}

impl PaymentApprovedEvent {
    pub fn new(order: Order, points_awarded: i64) -> Self {
        Self { order, points_awarded }
    }

    /// JSON form for hand-off to the notification boundary.
    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
