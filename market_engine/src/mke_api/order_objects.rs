use chrono::{DateTime, Utc};
use lmp_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::{Cart, CartLine, Order, OrderId, OrderLine, OrderStatusType, PaymentMethod};

//--------------------------------------  CheckoutRequest   ----------------------------------------------------------
/// Everything checkout needs from the boundary layer. The buyer identity arrives verified
/// from upstream; the engine never authenticates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub buyer_id: String,
    pub seller_id: String,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
}

impl CheckoutRequest {
    pub fn new<S: Into<String>>(buyer_id: S, seller_id: S, payment_method: PaymentMethod, delivery_address: S) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            payment_method,
            delivery_address: delivery_address.into(),
        }
    }
}

//--------------------------------------  CheckoutSummary   ----------------------------------------------------------
/// The result of a successful checkout: the created order, its line snapshot, and the points
/// credited (0 when accrual was deferred to payment approval, or the order did not qualify).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub points_awarded: i64,
}

//--------------------------------------    CartContents    ----------------------------------------------------------
/// A cart with its lines, as the buyer sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartContents {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartContents {
    /// Current cart value, from the snapshotted line prices.
    pub fn total(&self) -> Cents {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

//--------------------------------------  OrderQueryFilter  ----------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_buyer_id(mut self, buyer_id: String) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn with_seller_id(mut self, seller_id: String) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none()
            && self.buyer_id.is_none()
            && self.seller_id.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_filter_reports_empty() {
        assert!(OrderQueryFilter::default().is_empty());
        let filter = OrderQueryFilter::default().with_seller_id("seller-1".to_string());
        assert!(!filter.is_empty());
        let filter = OrderQueryFilter::default().with_status(OrderStatusType::Pending);
        assert!(!filter.is_empty());
    }

    #[test]
    fn checkout_request_serializes_for_the_boundary() {
        let req = CheckoutRequest::new("buyer-1", "seller-1", PaymentMethod::Transfer, "12 Main Rd");
        let json = serde_json::to_string(&req).unwrap();
        let back: CheckoutRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.payment_method, PaymentMethod::Transfer);
        assert_eq!(back.delivery_address, "12 Main Rd");
    }
}
