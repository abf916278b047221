//! Read access to user balances and the ledger.
use std::fmt::Debug;

use crate::{
    db_types::{BalanceOperation, BalanceSummary, OperationKind},
    traits::{BalanceLedger, LedgerError},
};

pub struct BalanceApi<B> {
    db: B,
}

impl<B: Debug> Debug for BalanceApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BalanceApi ({:?})", self.db)
    }
}

impl<B> BalanceApi<B>
where B: BalanceLedger
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn balance(&self, user_id: i64) -> Result<BalanceSummary, LedgerError> {
        self.db.balance_summary(user_id).await
    }

    /// Every ledger entry for the user, newest first.
    pub async fn history(&self, user_id: i64) -> Result<Vec<BalanceOperation>, LedgerError> {
        self.db.history(user_id).await
    }

    /// The user's withdrawals, newest first. Fails with [`LedgerError::NoOperations`] if there are none.
    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<BalanceOperation>, LedgerError> {
        let withdrawals = self
            .db
            .history(user_id)
            .await?
            .into_iter()
            .filter(|op| op.kind == OperationKind::Withdrawal)
            .collect::<Vec<BalanceOperation>>();
        if withdrawals.is_empty() {
            return Err(LedgerError::NoOperations(user_id));
        }
        Ok(withdrawals)
    }
}
