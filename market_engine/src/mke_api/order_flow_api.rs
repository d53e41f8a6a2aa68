use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, Payment},
    events::{EventProducers, OrderConfirmedEvent, PaymentApprovedEvent},
    order_objects::{CheckoutRequest, CheckoutSummary},
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// `OrderFlowApi` is the primary API for the checkout transaction, the payment-receipt review
/// flow, and the buyer/seller-visible order lifecycle.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Checks out the buyer's open cart at the seller.
    ///
    /// The entire operation is atomic: order creation, stock decrements, cart deletion, and
    /// (for cash orders) points accrual all commit together or not at all. See
    /// [`MarketplaceDatabase::checkout`] for the failure modes.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutSummary, MarketplaceError> {
        let summary = self.db.checkout(request).await?;
        debug!(
            "🔄️📦️ Checkout complete. Order {} of {} created; {} points awarded",
            summary.order.order_id, summary.order.total_price, summary.points_awarded
        );
        Ok(summary)
    }

    /// Submits the buyer's bank-transfer receipt for seller review.
    pub async fn submit_receipt(
        &self,
        order_id: &OrderId,
        buyer_id: &str,
        receipt_url: &str,
    ) -> Result<Payment, MarketplaceError> {
        let payment = self.db.submit_receipt(order_id, buyer_id, receipt_url).await?;
        debug!("🔄️💰️ Payment #{} for order {order_id} is under review", payment.id);
        Ok(payment)
    }

    /// Records the seller's verdict on a payment under review.
    ///
    /// Approval confirms the order and settles any deferred points in the same transaction,
    /// then notifies the payment-approved and order-confirmed hook subscribers. Rejection
    /// leaves the order pending; the buyer may submit a new receipt.
    pub async fn review_payment(
        &self,
        payment_id: i64,
        reviewer_id: &str,
        approved: bool,
        reason: Option<String>,
    ) -> Result<Order, MarketplaceError> {
        let (order, points) = self.db.review_payment(payment_id, reviewer_id, approved, reason.as_deref()).await?;
        if approved {
            self.call_payment_approved_hook(&order, points).await;
            self.call_order_confirmed_hook(&order).await;
        }
        Ok(order)
    }

    /// The seller accepts the order. Transfer orders must have an approved payment first.
    pub async fn confirm_order(&self, order_id: &OrderId, seller_id: &str) -> Result<Order, MarketplaceError> {
        let order = self.db.advance_order_status(order_id, seller_id, OrderStatusType::Confirmed).await?;
        self.call_order_confirmed_hook(&order).await;
        Ok(order)
    }

    /// The seller hands the goods over for delivery.
    pub async fn mark_delivered(&self, order_id: &OrderId, seller_id: &str) -> Result<Order, MarketplaceError> {
        self.db.advance_order_status(order_id, seller_id, OrderStatusType::Delivered).await
    }

    /// The buyer confirms receipt, closing out the order.
    pub async fn complete_order(&self, order_id: &OrderId, buyer_id: &str) -> Result<Order, MarketplaceError> {
        self.db.advance_order_status(order_id, buyer_id, OrderStatusType::Completed).await
    }

    /// Either party calls the order off. Only pending and confirmed orders can be cancelled;
    /// the order's stock goes back on the shelf.
    pub async fn cancel_order(&self, order_id: &OrderId, actor_id: &str) -> Result<Order, MarketplaceError> {
        self.db.advance_order_status(order_id, actor_id, OrderStatusType::Cancelled).await
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    async fn call_order_confirmed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_confirmed_producer {
            debug!("🔄️📦️ Notifying order confirmed hook subscribers");
            let event = OrderConfirmedEvent::new(order.clone());
            trace!("🔄️📦️ {}", event.payload());
            emitter.publish_event(event).await;
        }
    }

    async fn call_payment_approved_hook(&self, order: &Order, points_awarded: i64) {
        for emitter in &self.producers.payment_approved_producer {
            debug!("🔄️💰️ Notifying payment approved hook subscribers");
            let event = PaymentApprovedEvent::new(order.clone(), points_awarded);
            trace!("🔄️💰️ {}", event.payload());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
