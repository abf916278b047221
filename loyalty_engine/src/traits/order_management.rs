use std::future::Future;

use thiserror::Error;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType, Points},
    traits::VerdictOutcome,
};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Order {} has already been uploaded by this user", .0.number)]
    AlreadyUploadedBySelf(Box<Order>),
    #[error("Order {0} has already been uploaded by another user")]
    UploadedByOther(OrderNumber),
    #[error("Order with id {0} does not exist")]
    OrderNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// The durable store of uploaded orders.
pub trait OrderManagement: Clone {
    /// Fetches up to `limit` orders that are still awaiting a verdict (NEW or PROCESSING), oldest first.
    ///
    /// This is called afresh on every scan, so an order that is dropped by a worker will simply show up again.
    fn fetch_pending_orders(&self, limit: u32) -> impl Future<Output = Result<Vec<Order>, OrderStoreError>> + Send;

    /// Stores a new order in the NEW state and returns it.
    ///
    /// The insert must be atomic with respect to concurrent uploads of the same number. If the number already exists,
    /// the call fails with [`OrderStoreError::AlreadyUploadedBySelf`] when `user_id` is the existing owner, and
    /// [`OrderStoreError::UploadedByOther`] otherwise. No second row is ever created.
    fn create_order(
        &self,
        number: &OrderNumber,
        user_id: i64,
    ) -> impl Future<Output = Result<Order, OrderStoreError>> + Send;

    /// Moves the order to `status` and sets its accrual, unless it is already PROCESSED or INVALID.
    ///
    /// A terminal order is left untouched and [`VerdictOutcome::AlreadyTerminal`] is returned. This is not an error:
    /// duplicate verdicts are expected.
    fn apply_verdict(
        &self,
        order_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> impl Future<Output = Result<VerdictOutcome, OrderStoreError>> + Send;

    fn fetch_order_by_number(
        &self,
        number: &OrderNumber,
    ) -> impl Future<Output = Result<Option<Order>, OrderStoreError>> + Send;

    /// All orders uploaded by the user, newest first.
    fn fetch_orders_for_user(&self, user_id: i64) -> impl Future<Output = Result<Vec<Order>, OrderStoreError>> + Send;
}
