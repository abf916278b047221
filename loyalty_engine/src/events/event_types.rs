use serde::Serialize;

use crate::db_types::{BalanceOperation, Order};

/// Emitted when the accrual service moves an order into a terminal state (PROCESSED or INVALID).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderResolvedEvent {
    pub order: Order,
    /// The ledger entry written for the order, if any
    pub credit: Option<BalanceOperation>,
}

impl OrderResolvedEvent {
    pub fn new(order: Order, credit: Option<BalanceOperation>) -> Self {
        Self { order, credit }
    }
}

/// Emitted after a withdrawal has been committed to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalEvent {
    pub operation: BalanceOperation,
}

impl WithdrawalEvent {
    pub fn new(operation: BalanceOperation) -> Self {
        Self { operation }
    }
}
