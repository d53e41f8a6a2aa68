use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, CartLine, NewCartLine},
    traits::MarketplaceError,
};

/// Fetches the open cart for the (buyer, seller) pair, if any.
pub async fn fetch_cart(
    buyer_id: &str,
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Cart>, sqlx::Error> {
    let cart = sqlx::query_as("SELECT * FROM carts WHERE buyer_id = $1 AND seller_id = $2")
        .bind(buyer_id)
        .bind(seller_id)
        .fetch_optional(conn)
        .await?;
    Ok(cart)
}

/// Fetches the pair's cart, opening one when this is the buyer's first add at the seller.
pub async fn fetch_or_create_cart(
    buyer_id: &str,
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Cart, sqlx::Error> {
    if let Some(cart) = fetch_cart(buyer_id, seller_id, &mut *conn).await? {
        return Ok(cart);
    }
    let cart: Cart = sqlx::query_as("INSERT INTO carts (buyer_id, seller_id) VALUES ($1, $2) RETURNING *")
        .bind(buyer_id)
        .bind(seller_id)
        .fetch_one(conn)
        .await?;
    debug!("🛒️ Opened cart #{} for buyer {buyer_id} at seller {seller_id}", cart.id);
    Ok(cart)
}

/// Puts the product into the cart, replacing the quantity when the product is already there.
/// The add-time title/price snapshot stands; only the quantity moves on a repeat add.
pub async fn upsert_line(
    cart_id: i64,
    line: NewCartLine,
    conn: &mut SqliteConnection,
) -> Result<CartLine, MarketplaceError> {
    if line.quantity < 1 {
        return Err(MarketplaceError::InvalidQuantity(line.quantity));
    }
    let row = sqlx::query_as(
        r#"
            INSERT INTO cart_lines (cart_id, product_id, title, unit_price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = excluded.quantity, updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(cart_id)
    .bind(line.product_id)
    .bind(line.title)
    .bind(line.unit_price)
    .bind(line.quantity)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Returns the cart's lines in the order they were added.
pub async fn fetch_cart_lines(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM cart_lines WHERE cart_id = $1 ORDER BY id ASC")
        .bind(cart_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// Removes one product from the cart. Returns `false` when it wasn't there.
pub async fn remove_line(cart_id: i64, product_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Deletes the cart and its lines. Called on successful checkout and on abandonment.
pub async fn delete_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1").bind(cart_id).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM carts WHERE id = $1").bind(cart_id).execute(conn).await?;
    debug!("🛒️ Cart #{cart_id} deleted");
    Ok(())
}
