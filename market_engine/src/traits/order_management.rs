use crate::{
    db_types::{Order, OrderId, OrderLine, Payment},
    order_objects::OrderQueryFilter,
    traits::MarketplaceError,
};

/// Read-only order access for dashboards and the review surface.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Fetches the order for the given public order id, or `None`.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError>;

    /// The order's line snapshot, in insertion order.
    async fn fetch_order_lines(&self, order_id: &OrderId) -> Result<Vec<OrderLine>, MarketplaceError>;

    /// Fetches orders according to the criteria in the filter, ordered by `created_at`
    /// ascending.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError>;

    /// Every payment attempt recorded against the order, oldest first.
    async fn payments_for_order(&self, order_id: &OrderId) -> Result<Vec<Payment>, MarketplaceError>;
}
