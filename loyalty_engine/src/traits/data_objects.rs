use crate::db_types::{BalanceOperation, Order};

/// Result of [`crate::traits::OrderManagement::apply_verdict`].
#[derive(Debug, Clone, PartialEq)]
pub enum VerdictOutcome {
    /// The order was not terminal and now carries the new status. Contains the updated order.
    Applied(Order),
    /// The order was already PROCESSED or INVALID and has not been touched. Contains the order as stored.
    AlreadyTerminal(Order),
}

impl VerdictOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn order(&self) -> &Order {
        match self {
            Self::Applied(o) | Self::AlreadyTerminal(o) => o,
        }
    }
}

/// Result of [`crate::traits::BalanceLedger::credit`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreditResult {
    Credited(BalanceOperation),
    /// An ACCRUAL for this order reference already exists. Nothing was written.
    AlreadyCredited,
}

/// Result of [`crate::traits::AccrualSettlement::settle_processed`].
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The order moved to PROCESSED and its accrual was credited to the owner.
    Credited { order: Order, operation: BalanceOperation },
    /// The order moved to PROCESSED with a zero accrual. There is nothing to credit.
    NothingToCredit(Order),
    /// The order moved to PROCESSED, but the ledger already held an accrual for it.
    AlreadyCredited(Order),
    /// The order was already terminal. Neither the order nor the ledger changed.
    AlreadyTerminal(Order),
}
