use crate::{db_types::StockRecord, traits::MarketplaceError};

/// The stock interface the engine shares with the catalog.
///
/// The catalog owns absolute stock levels; the engine only ever decrements them inside a
/// checkout transaction (and returns them on cancellation). [`set_stock_level`] is the
/// catalog's write point, exposed here so deployments and tests can seed inventory.
///
/// [`set_stock_level`]: InventoryManagement::set_stock_level
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    /// Sets the absolute available quantity for a seller's product, creating the record if
    /// needed.
    async fn set_stock_level(
        &self,
        seller_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<StockRecord, MarketplaceError>;

    /// The current stock record, or `None` if the seller has never stocked the product.
    async fn stock_level(&self, seller_id: &str, product_id: &str) -> Result<Option<StockRecord>, MarketplaceError>;
}
