use sqlx::SqliteConnection;

use crate::db_types::StockRecord;

/// Atomically takes `quantity` units from the stock record, returning `false` when the record
/// is missing or holds fewer units than requested. The guard lives in the WHERE clause, so a
/// losing concurrent checkout observes a failed update rather than a negative level.
pub async fn take_stock(
    seller_id: &str,
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE stock_records SET available_quantity = available_quantity - $1, updated_at = CURRENT_TIMESTAMP \
         WHERE seller_id = $2 AND product_id = $3 AND available_quantity >= $1",
    )
    .bind(quantity)
    .bind(seller_id)
    .bind(product_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Returns units to the stock record on order cancellation. Creates the record when the
/// catalog entry has since disappeared.
pub async fn return_stock(
    seller_id: &str,
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO stock_records (seller_id, product_id, available_quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (seller_id, product_id)
            DO UPDATE SET available_quantity = available_quantity + excluded.available_quantity,
                          updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(seller_id)
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// Sets the absolute stock level. This is the catalog's write point; the engine itself only
/// decrements via [`take_stock`] and restores via [`return_stock`].
pub async fn set_level(
    seller_id: &str,
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<StockRecord, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
            INSERT INTO stock_records (seller_id, product_id, available_quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (seller_id, product_id)
            DO UPDATE SET available_quantity = excluded.available_quantity, updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_record(
    seller_id: &str,
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<StockRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM stock_records WHERE seller_id = $1 AND product_id = $2")
        .bind(seller_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(record)
}
