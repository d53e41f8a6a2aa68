use crate::{
    db_types::{CartLine, NewCartLine},
    order_objects::CartContents,
    traits::MarketplaceError,
};

/// Cart maintenance on behalf of a buyer. A cart is keyed by the (buyer, seller) pair and is
/// created lazily on the first add; it disappears on checkout or explicit abandonment.
#[allow(async_fn_in_trait)]
pub trait CartManagement: Clone {
    /// Puts the product in the buyer's cart at the seller, creating the cart if this is the
    /// first add. If the product is already in the cart, the quantity is replaced with the
    /// new value; the add-time title/price snapshot stands.
    ///
    /// Quantities below 1 are rejected with [`MarketplaceError::InvalidQuantity`].
    async fn upsert_cart_line(
        &self,
        buyer_id: &str,
        seller_id: &str,
        line: NewCartLine,
    ) -> Result<CartLine, MarketplaceError>;

    /// The buyer's open cart at the seller, with its lines, or `None` if there isn't one.
    async fn fetch_cart(&self, buyer_id: &str, seller_id: &str) -> Result<Option<CartContents>, MarketplaceError>;

    /// Takes one product out of the cart. Returns `false` when the product was not in the
    /// cart to begin with.
    async fn remove_cart_line(
        &self,
        buyer_id: &str,
        seller_id: &str,
        product_id: &str,
    ) -> Result<bool, MarketplaceError>;

    /// Deletes the cart and all of its lines.
    async fn abandon_cart(&self, buyer_id: &str, seller_id: &str) -> Result<(), MarketplaceError>;
}
