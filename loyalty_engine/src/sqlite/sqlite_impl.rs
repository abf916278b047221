//! `SqliteDatabase` is the SQLite implementation of the loyalty engine storage traits.
//!
//! It implements every trait in the [`crate::traits`] module. Low-level queries live in [`super::db`]; this module
//! only decides which connection or transaction they run on.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{balances, db_url, new_pool, orders};
use crate::{
    db_types::{BalanceOperation, BalanceSummary, Order, OrderNumber, OrderStatusType, Points},
    traits::{
        AccrualSettlement,
        BalanceLedger,
        CreditResult,
        LedgerError,
        OrderManagement,
        OrderStoreError,
        Settlement,
        SettlementError,
        VerdictOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `LPS_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date with the migrations embedded in this crate.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_pending_orders(&self, limit: u32) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders(limit, &mut conn).await?;
        Ok(orders)
    }

    async fn create_order(&self, number: &OrderNumber, user_id: i64) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(number, user_id, &mut conn).await
    }

    async fn apply_verdict(
        &self,
        order_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<VerdictOutcome, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        if let Some(order) = orders::update_non_terminal_order(order_id, status, accrual, &mut conn).await? {
            return Ok(VerdictOutcome::Applied(order));
        }
        match orders::fetch_order_by_id(order_id, &mut conn).await? {
            Some(order) => Ok(VerdictOutcome::AlreadyTerminal(order)),
            None => Err(OrderStoreError::OrderNotFound(order_id)),
        }
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }
}

impl BalanceLedger for SqliteDatabase {
    async fn history(&self, user_id: i64) -> Result<Vec<BalanceOperation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let ops = balances::fetch_operations_for_user(user_id, &mut conn).await?;
        if ops.is_empty() {
            return Err(LedgerError::NoOperations(user_id));
        }
        Ok(ops)
    }

    async fn credit(&self, user_id: i64, amount: Points, order_ref: &OrderNumber) -> Result<CreditResult, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut conn = self.pool.acquire().await?;
        let result = match balances::insert_accrual(user_id, amount, order_ref, &mut conn).await? {
            Some(op) => CreditResult::Credited(op),
            None => CreditResult::AlreadyCredited,
        };
        Ok(result)
    }

    async fn debit(&self, user_id: i64, amount: Points, order_ref: &OrderNumber) -> Result<BalanceOperation, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut conn = self.pool.acquire().await?;
        balances::insert_withdrawal(user_id, amount, order_ref, &mut conn).await
    }

    async fn balance_summary(&self, user_id: i64) -> Result<BalanceSummary, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let summary = balances::fetch_balance_summary(user_id, &mut conn).await?;
        Ok(summary)
    }
}

impl AccrualSettlement for SqliteDatabase {
    /// The status update and the credit share one transaction, so a PROCESSED order always has its accrual row and
    /// vice versa.
    async fn settle_processed(&self, order: &Order, accrual: Points) -> Result<Settlement, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let updated =
            match orders::update_non_terminal_order(order.id, OrderStatusType::Processed, accrual, &mut tx).await? {
                Some(o) => o,
                None => {
                    let current = orders::fetch_order_by_id(order.id, &mut tx).await?;
                    tx.rollback().await?;
                    return match current {
                        Some(o) => Ok(Settlement::AlreadyTerminal(o)),
                        None => Err(OrderStoreError::OrderNotFound(order.id).into()),
                    };
                },
            };
        if !accrual.is_positive() {
            tx.commit().await?;
            return Ok(Settlement::NothingToCredit(updated));
        }
        let settlement = match balances::insert_accrual(updated.user_id, accrual, &updated.number, &mut tx).await? {
            Some(operation) => Settlement::Credited { order: updated, operation },
            None => Settlement::AlreadyCredited(updated),
        };
        tx.commit().await?;
        Ok(settlement)
    }
}
