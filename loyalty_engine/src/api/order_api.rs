//! Order uploads.
use std::fmt::Debug;

use log::*;
use tokio::sync::mpsc;

use crate::{
    accrual::try_enqueue,
    api::errors::OrderApiError,
    db_types::{Order, OrderNumber},
    traits::{OrderManagement, OrderStoreError},
};

/// The result of a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadResult {
    /// The order is new, and has been stored in the NEW state.
    Accepted(Order),
    /// This user had already uploaded the order. Nothing changed.
    AlreadyUploaded(Order),
}

impl UploadResult {
    pub fn order(&self) -> &Order {
        match self {
            Self::Accepted(o) | Self::AlreadyUploaded(o) => o,
        }
    }
}

pub struct OrderApi<B> {
    db: B,
    jobs: Option<mpsc::Sender<Order>>,
}

impl<B: Debug> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi ({:?})", self.db)
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db, jobs: None }
    }

    /// Newly accepted orders are also pushed onto this queue so that the accrual workers see them before the next
    /// scan. If the queue is full, the scanner picks them up as usual.
    pub fn with_job_queue(mut self, jobs: mpsc::Sender<Order>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Validates `raw_number` and records it as an order belonging to `user_id`.
    ///
    /// Re-uploading one's own order is a successful no-op. Uploading someone else's order is an error.
    pub async fn upload_order(&self, user_id: i64, raw_number: &str) -> Result<UploadResult, OrderApiError> {
        let number = OrderNumber::parse(raw_number)?;
        match self.db.create_order(&number, user_id).await {
            Ok(order) => {
                info!("💻️ User {user_id} uploaded order {number}");
                if let Some(jobs) = &self.jobs {
                    try_enqueue(jobs, order.clone());
                }
                Ok(UploadResult::Accepted(order))
            },
            Err(OrderStoreError::AlreadyUploadedBySelf(order)) => {
                debug!("💻️ User {user_id} re-uploaded order {number}");
                Ok(UploadResult::AlreadyUploaded(*order))
            },
            Err(e) => {
                debug!("💻️ Upload of order {number} by user {user_id} rejected. {e}");
                Err(e.into())
            },
        }
    }

    /// All orders uploaded by the user, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        trace!("💻️ User {user_id} has {} orders", orders.len());
        Ok(orders)
    }
}
