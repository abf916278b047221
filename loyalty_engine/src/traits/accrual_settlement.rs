use std::future::Future;

use thiserror::Error;

use crate::{
    db_types::{Order, Points},
    traits::{BalanceLedger, LedgerError, OrderManagement, OrderStoreError, Settlement},
};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("{0}")]
    OrderStore(#[from] OrderStoreError),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

/// Applies a PROCESSED verdict.
pub trait AccrualSettlement: OrderManagement + BalanceLedger {
    /// In a single atomic step, moves `order` to PROCESSED with the given accrual and, if and only if the order
    /// actually transitioned, credits `accrual` to its owner.
    ///
    /// A zero accrual transitions the order without writing to the ledger, since ledger amounts are always positive.
    fn settle_processed(
        &self,
        order: &Order,
        accrual: Points,
    ) -> impl Future<Output = Result<Settlement, SettlementError>> + Send;
}
