use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{BalanceOperation, BalanceSummary, OrderNumber, Points},
    traits::LedgerError,
};

/// Inserts an ACCRUAL row. Returns `None` if an ACCRUAL for `order_ref` already exists, in which case nothing is
/// written.
pub async fn insert_accrual(
    user_id: i64,
    amount: Points,
    order_ref: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<BalanceOperation>, sqlx::Error> {
    let op: Option<BalanceOperation> = sqlx::query_as(
        r#"
            INSERT INTO balance_operations (user_id, kind, amount, order_reference)
            VALUES ($1, 'ACCRUAL', $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(order_ref.as_str())
    .fetch_optional(conn)
    .await?;
    match &op {
        Some(op) => debug!("🗃️ Credited {} to user {user_id} for order {order_ref} (op #{})", op.amount, op.id),
        None => debug!("🗃️ Order {order_ref} has already been credited. Skipping"),
    }
    Ok(op)
}

/// Inserts a WITHDRAWAL row if, and only if, the user's available balance covers `amount`.
///
/// The balance is computed and checked inside the same `INSERT` statement. SQLite takes the database write lock before
/// evaluating the statement, so concurrent debits are serialized and none of them can see a stale balance.
pub async fn insert_withdrawal(
    user_id: i64,
    amount: Points,
    order_ref: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<BalanceOperation, LedgerError> {
    let op: Option<BalanceOperation> = sqlx::query_as(
        r#"
            INSERT INTO balance_operations (user_id, kind, amount, order_reference)
            SELECT $1, 'WITHDRAWAL', $2, $3
            WHERE (
                SELECT COALESCE(SUM(CASE kind WHEN 'ACCRUAL' THEN amount ELSE -amount END), 0)
                FROM balance_operations WHERE user_id = $1
            ) >= $2
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(order_ref.as_str())
    .fetch_optional(conn)
    .await?;
    match op {
        Some(op) => {
            debug!("🗃️ Debited {amount} from user {user_id} for withdrawal {order_ref} (op #{})", op.id);
            Ok(op)
        },
        None => {
            debug!("🗃️ User {user_id} cannot cover a withdrawal of {amount}");
            Err(LedgerError::InsufficientFunds { requested: amount })
        },
    }
}

pub async fn fetch_operations_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<BalanceOperation>, sqlx::Error> {
    let ops = sqlx::query_as("SELECT * FROM balance_operations WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(ops)
}

pub async fn fetch_balance_summary(user_id: i64, conn: &mut SqliteConnection) -> Result<BalanceSummary, sqlx::Error> {
    let (current, withdrawn): (i64, i64) = sqlx::query_as(
        r#"
            SELECT
                COALESCE(SUM(CASE kind WHEN 'ACCRUAL' THEN amount ELSE -amount END), 0),
                COALESCE(SUM(CASE kind WHEN 'WITHDRAWAL' THEN amount ELSE 0 END), 0)
            FROM balance_operations WHERE user_id = $1;
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(BalanceSummary { current: Points::from(current), withdrawn: Points::from(withdrawn) })
}
