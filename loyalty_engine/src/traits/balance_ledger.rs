use std::future::Future;

use thiserror::Error;

use crate::{
    db_types::{BalanceOperation, BalanceSummary, OrderNumber, Points},
    traits::CreditResult,
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("User {0} has no balance operations")]
    NoOperations(i64),
    #[error("Insufficient funds. Requested {requested}")]
    InsufficientFunds { requested: Points },
    #[error("Amount must be positive, but was {0}")]
    InvalidAmount(Points),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// An append-only, per-user ledger of ACCRUAL and WITHDRAWAL operations.
///
/// The available balance is never stored. It is always computed from the full history as
/// `Σ ACCRUAL − Σ WITHDRAWAL`.
pub trait BalanceLedger: Clone {
    /// All operations for the user, newest first. Fails with [`LedgerError::NoOperations`] if there are none.
    fn history(&self, user_id: i64) -> impl Future<Output = Result<Vec<BalanceOperation>, LedgerError>> + Send;

    /// Records an ACCRUAL of `amount` for `order_ref`.
    ///
    /// At most one ACCRUAL may ever exist per order reference. If one does, this is a no-op that returns
    /// [`CreditResult::AlreadyCredited`].
    fn credit(
        &self,
        user_id: i64,
        amount: Points,
        order_ref: &OrderNumber,
    ) -> impl Future<Output = Result<CreditResult, LedgerError>> + Send;

    /// Records a WITHDRAWAL of `amount`, provided the user's available balance covers it.
    ///
    /// The balance check and the insert are a single atomic step, serialized against every other debit for the same
    /// user. A debit that would take the balance below zero fails with [`LedgerError::InsufficientFunds`] and writes
    /// nothing.
    fn debit(
        &self,
        user_id: i64,
        amount: Points,
        order_ref: &OrderNumber,
    ) -> impl Future<Output = Result<BalanceOperation, LedgerError>> + Send;

    /// The current balance and the total withdrawn to date. A user with no history has a zero balance.
    fn balance_summary(&self, user_id: i64) -> impl Future<Output = Result<BalanceSummary, LedgerError>> + Send;
}
