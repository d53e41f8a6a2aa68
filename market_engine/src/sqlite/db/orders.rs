use lmp_common::Cents;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{CartLine, NewOrder, Order, OrderId, OrderLine, OrderStatusType, PaymentStatusType},
    order_objects::OrderQueryFilter,
    traits::MarketplaceError,
};

/// Inserts a new order into the database using the given connection. This is not atomic on
/// its own; embed the call inside a transaction and pass `&mut tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, MarketplaceError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                buyer_id,
                seller_id,
                total_price,
                payment_method,
                delivery_address
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.total_price)
    .bind(order.payment_method.to_string())
    .bind(order.delivery_address)
    .fetch_one(conn)
    .await?;
    debug!("📦️ Order {} inserted with id {}", order.order_id, order.id);
    Ok(order)
}

/// Copies the cart lines into the order's line snapshot.
pub async fn insert_order_lines(
    order_pk: i64,
    lines: &[CartLine],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLine>, sqlx::Error> {
    let mut result = Vec::with_capacity(lines.len());
    for line in lines {
        let row = sqlx::query_as(
            "INSERT INTO order_lines (order_id, product_id, title, unit_price, quantity) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(order_pk)
        .bind(&line.product_id)
        .bind(&line.title)
        .bind(line.unit_price)
        .bind(line.quantity)
        .fetch_one(&mut *conn)
        .await?;
        result.push(row);
    }
    Ok(result)
}

/// Sum of `unit_price × quantity` over the order's lines, straight from the database. Used to
/// verify the order total before the checkout transaction commits.
pub async fn order_line_total(order_pk: i64, conn: &mut SqliteConnection) -> Result<Cents, sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(unit_price * quantity), 0) FROM order_lines WHERE order_id = $1")
            .bind(order_pk)
            .fetch_one(conn)
            .await?;
    Ok(Cents::from(total))
}

/// Returns the entry in the orders table for the corresponding `order_id`
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_lines(order_pk: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_pk)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

pub(crate) async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceError> {
    let status = status.to_string();
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_optional(conn)
            .await?;
    result.ok_or_else(|| MarketplaceError::DatabaseError(format!("Order with internal id {id} has vanished")))
}

pub(crate) async fn set_payment_status(
    id: i64,
    status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceError> {
    let status = status.to_string();
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| MarketplaceError::DatabaseError(format!("Order with internal id {id} has vanished")))
}

pub(crate) async fn set_points_awarded(
    id: i64,
    points: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET points_awarded = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(points)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or_else(|| MarketplaceError::DatabaseError(format!("Order with internal id {id} has vanished")))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.0);
    }
    if let Some(buyer_id) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer_id);
    }
    if let Some(seller_id) = query.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let mut statuses = vec![];
        query.status.as_ref().unwrap().iter().for_each(|s| {
            statuses.push(format!("'{s}'"));
        });
        let status_clause = statuses.join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("📦️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📦️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}
