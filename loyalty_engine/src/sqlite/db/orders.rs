use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType, Points},
    traits::OrderStoreError,
};

/// Inserts a new order in the NEW state. If the number is already taken, the existing owner determines which error is
/// returned.
///
/// The uniqueness check is the `UNIQUE` constraint on `number`, so two concurrent uploads of the same number cannot
/// both succeed.
pub async fn insert_order(
    number: &OrderNumber,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    let inserted: Option<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (number, user_id) VALUES ($1, $2)
            ON CONFLICT (number) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(number.as_str())
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(order) = inserted {
        debug!("🗃️ Order {number} inserted with id {} for user {user_id}", order.id);
        return Ok(order);
    }
    match fetch_order_by_number(number, conn).await? {
        Some(existing) if existing.user_id == user_id => {
            Err(OrderStoreError::AlreadyUploadedBySelf(Box::new(existing)))
        },
        Some(_) => Err(OrderStoreError::UploadedByOther(number.clone())),
        // Only possible if the row vanished between the two statements, and orders are never deleted
        None => Err(OrderStoreError::DatabaseError(format!("Order {number} conflicted but could not be found"))),
    }
}

/// Sets the status and accrual of a non-terminal order. Returns `None` if the order does not exist or is already
/// PROCESSED or INVALID.
pub async fn update_non_terminal_order(
    order_id: i64,
    status: OrderStatusType,
    accrual: Points,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, accrual = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status NOT IN ('PROCESSED', 'INVALID')
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(accrual)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Verdict {status} for order id {order_id}. Updated: {}", order.is_some());
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_pending_orders(limit: u32, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY created_at ASC, id ASC
            LIMIT $1;
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}
