use std::fmt::Debug;

use log::trace;

use crate::{
    db_types::{CartLine, NewCartLine},
    order_objects::CartContents,
    traits::{CartManagement, MarketplaceError},
};

/// The `CartApi` maintains a buyer's per-seller carts ahead of checkout.
pub struct CartApi<B> {
    db: B,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Puts a product in the buyer's cart at the seller, opening the cart on the first add.
    /// The catalog title and price supplied here are snapshotted; later catalog edits do not
    /// reach the cart.
    pub async fn add_item(
        &self,
        buyer_id: &str,
        seller_id: &str,
        line: NewCartLine,
    ) -> Result<CartLine, MarketplaceError> {
        let line = self.db.upsert_cart_line(buyer_id, seller_id, line).await?;
        trace!("🛒️ Cart line {} x{} saved for buyer {buyer_id}", line.product_id, line.quantity);
        Ok(line)
    }

    /// The buyer's cart at the seller, or `None` when nothing has been added yet.
    pub async fn cart(&self, buyer_id: &str, seller_id: &str) -> Result<Option<CartContents>, MarketplaceError> {
        self.db.fetch_cart(buyer_id, seller_id).await
    }

    /// Takes one product out of the cart. Returns `false` when it wasn't in the cart.
    pub async fn remove_item(
        &self,
        buyer_id: &str,
        seller_id: &str,
        product_id: &str,
    ) -> Result<bool, MarketplaceError> {
        self.db.remove_cart_line(buyer_id, seller_id, product_id).await
    }

    /// Throws the whole cart away.
    pub async fn abandon(&self, buyer_id: &str, seller_id: &str) -> Result<(), MarketplaceError> {
        self.db.abandon_cart(buyer_id, seller_id).await
    }
}
